// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! SSRF-safe URL validation
//!
//! Pure checks on the parsed URL: scheme, credentials, literal IP ranges,
//! well-known internal host names, and the configured allow/deny lists.
//! Host names are never resolved here; the fetcher re-checks resolved
//! addresses with [`UrlValidator::check_ip`] right before connecting.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use thiserror::Error;
use tracing::warn;
use url::{Host, Url};

use super::config::ValidatorConfig;

/// Host names that always point inside the deployment
const INTERNAL_HOSTNAMES: &[&str] = &[
    "localhost",
    "metadata",
    "metadata.google.internal",
    "instance-data",
];

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("Host not allowed: {0}")]
    DisallowedHost(String),
    #[error("Private network address blocked: {0}")]
    PrivateNetworkBlocked(String),
}

/// A URL that passed validation. Only the validator can construct one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedUrl(Url);

impl ValidatedUrl {
    /// Wrap a URL without checks, for fetcher tests against local servers
    #[cfg(test)]
    pub(crate) fn trusted(url: &str) -> Self {
        Self(Url::parse(url).unwrap())
    }

    pub fn as_url(&self) -> &Url {
        &self.0
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn into_url(self) -> Url {
        self.0
    }
}

impl fmt::Display for ValidatedUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Validates candidate URLs against the SSRF policy
#[derive(Debug, Clone)]
pub struct UrlValidator {
    allowed: Vec<String>,
    denied: Vec<String>,
    allow_private_networks: bool,
}

impl UrlValidator {
    pub fn new(config: ValidatorConfig) -> Self {
        if config.allow_private_networks {
            warn!("Private network addresses are allowed for fetching; do not use outside local development");
        }
        Self {
            allowed: config
                .allowed_domains
                .iter()
                .map(|d| normalize_pattern(d))
                .filter(|d| !d.is_empty())
                .collect(),
            denied: config
                .denied_suffixes
                .iter()
                .map(|d| normalize_pattern(d))
                .filter(|d| !d.is_empty())
                .collect(),
            allow_private_networks: config.allow_private_networks,
        }
    }

    pub fn allows_private_networks(&self) -> bool {
        self.allow_private_networks
    }

    /// Validate a raw URL string
    pub fn validate(&self, raw: &str) -> Result<ValidatedUrl, ValidationError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::InvalidUrl("empty URL".to_string()));
        }
        let url = Url::parse(trimmed).map_err(|e| ValidationError::InvalidUrl(e.to_string()))?;
        self.validate_parsed(url)
    }

    /// Validate an already parsed URL (used for redirect targets)
    pub fn validate_parsed(&self, url: Url) -> Result<ValidatedUrl, ValidationError> {
        match url.scheme() {
            "http" | "https" => {}
            other => {
                return Err(ValidationError::InvalidUrl(format!(
                    "unsupported scheme '{}'",
                    other
                )))
            }
        }

        if !url.username().is_empty() || url.password().is_some() {
            return Err(ValidationError::InvalidUrl(
                "credentials in URL are not allowed".to_string(),
            ));
        }

        let host_label = match url.host() {
            None => return Err(ValidationError::InvalidUrl("missing host".to_string())),
            Some(Host::Ipv4(ip)) => {
                self.check_ip(IpAddr::V4(ip))?;
                ip.to_string()
            }
            Some(Host::Ipv6(ip)) => {
                self.check_ip(IpAddr::V6(ip))?;
                ip.to_string()
            }
            Some(Host::Domain(name)) => {
                let host = name.trim_end_matches('.').to_ascii_lowercase();
                if host.is_empty() {
                    return Err(ValidationError::InvalidUrl("missing host".to_string()));
                }
                if !self.allow_private_networks && is_internal_hostname(&host) {
                    return Err(ValidationError::PrivateNetworkBlocked(host));
                }
                if self.denied.iter().any(|suffix| matches_suffix(&host, suffix)) {
                    return Err(ValidationError::DisallowedHost(host));
                }
                host
            }
        };

        if !self.allowed.is_empty()
            && !self
                .allowed
                .iter()
                .any(|domain| matches_suffix(&host_label, domain))
        {
            return Err(ValidationError::DisallowedHost(host_label));
        }

        Ok(ValidatedUrl(url))
    }

    /// Reject addresses outside the public internet
    pub fn check_ip(&self, ip: IpAddr) -> Result<(), ValidationError> {
        if !self.allow_private_networks && is_blocked_ip(ip) {
            return Err(ValidationError::PrivateNetworkBlocked(ip.to_string()));
        }
        Ok(())
    }
}

/// "*.internal", ".internal" and "internal" all mean the same suffix
fn normalize_pattern(pattern: &str) -> String {
    pattern
        .trim()
        .trim_start_matches("*.")
        .trim_start_matches('.')
        .trim_end_matches('.')
        .to_ascii_lowercase()
}

fn matches_suffix(host: &str, suffix: &str) -> bool {
    host == suffix
        || (host.len() > suffix.len()
            && host.ends_with(suffix)
            && host.as_bytes()[host.len() - suffix.len() - 1] == b'.')
}

fn is_internal_hostname(host: &str) -> bool {
    INTERNAL_HOSTNAMES.contains(&host) || host.ends_with(".localhost")
}

pub(crate) fn is_blocked_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_blocked_ipv4(v4),
        IpAddr::V6(v6) => is_blocked_ipv6(v6),
    }
}

fn is_blocked_ipv4(ip: Ipv4Addr) -> bool {
    let [a, b, c, _] = ip.octets();
    ip.is_private()
        || ip.is_loopback()
        || ip.is_link_local()
        || ip.is_unspecified()
        || ip.is_broadcast()
        || ip.is_documentation()
        || ip.is_multicast()
        // 0.0.0.0/8 "this network"
        || a == 0
        // 100.64.0.0/10 carrier-grade NAT
        || (a == 100 && (b & 0xc0) == 64)
        // 192.0.0.0/24 IETF protocol assignments
        || (a == 192 && b == 0 && c == 0)
        // 198.18.0.0/15 benchmarking
        || (a == 198 && (b & 0xfe) == 18)
        // 240.0.0.0/4 reserved
        || a >= 240
}

fn is_blocked_ipv6(ip: Ipv6Addr) -> bool {
    if let Some(v4) = ip.to_ipv4_mapped() {
        return is_blocked_ipv4(v4);
    }
    let segments = ip.segments();
    // 64:ff9b::/96 NAT64 embeds an IPv4 address in the low 32 bits
    if segments[0] == 0x64 && segments[1] == 0xff9b && segments[2..6].iter().all(|s| *s == 0) {
        let embedded = Ipv4Addr::new(
            (segments[6] >> 8) as u8,
            segments[6] as u8,
            (segments[7] >> 8) as u8,
            segments[7] as u8,
        );
        return is_blocked_ipv4(embedded);
    }
    ip.is_loopback()
        || ip.is_unspecified()
        || ip.is_multicast()
        // fc00::/7 unique local
        || (segments[0] & 0xfe00) == 0xfc00
        // fe80::/10 link local
        || (segments[0] & 0xffc0) == 0xfe80
        // 2001:db8::/32 documentation
        || (segments[0] == 0x2001 && segments[1] == 0x0db8)
}
