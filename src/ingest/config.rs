//! Configuration for URL validation, fetching, and extraction
//!
//! Defines settings for SSRF policy, HTTP limits, retries, and body size.

use serde::{Deserialize, Serialize};

use crate::config::{env_flag, env_list, env_or};

/// Default deny-list: suffixes that never leave the local network
pub const DEFAULT_DENIED_SUFFIXES: &[&str] = &["internal", "local", "lan", "intranet"];

/// Host policy for the SSRF validator
#[derive(Debug, Clone)]
pub struct ValidatorConfig {
    /// Hosts (and their subdomains) that may be fetched. Empty allows any public host.
    pub allowed_domains: Vec<String>,
    /// Host suffixes that are always rejected, even when allow-listed
    pub denied_suffixes: Vec<String>,
    /// Disable private/loopback checks (local development only)
    pub allow_private_networks: bool,
}

impl ValidatorConfig {
    pub fn from_env() -> Self {
        Self {
            allowed_domains: env_list("URL_ALLOWED_DOMAINS", &[]),
            denied_suffixes: env_list("URL_DENIED_SUFFIXES", DEFAULT_DENIED_SUFFIXES),
            allow_private_networks: env_flag("URL_ALLOW_PRIVATE_NETWORKS", false),
        }
    }
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            allowed_domains: Vec::new(),
            denied_suffixes: DEFAULT_DENIED_SUFFIXES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            allow_private_networks: false,
        }
    }
}

/// Certificate verification mode for outbound fetches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TlsMode {
    /// Full certificate verification
    Strict,
    /// Accept invalid certificates. Explicit opt-in, logged on every fetch.
    Relaxed,
}

impl TlsMode {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "strict" => Some(Self::Strict),
            "relaxed" => Some(Self::Relaxed),
            _ => None,
        }
    }
}

/// Configuration for the HTTP content fetcher
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// TCP/TLS connect timeout in seconds (default: 30)
    pub connect_timeout_secs: u64,
    /// Total per-attempt timeout in seconds (default: 60)
    pub timeout_secs: u64,
    /// Maximum redirects followed (default: 3)
    pub max_redirects: usize,
    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: u64,
    /// Retries after the first attempt for transient failures (default: 3)
    pub max_retries: u32,
    /// First backoff delay in milliseconds, doubled per retry (default: 1000)
    pub backoff_base_ms: u64,
    pub tls_mode: TlsMode,
    pub user_agent: String,
    pub accept_language: String,
}

impl FetchConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            connect_timeout_secs: env_or("FETCH_CONNECT_TIMEOUT_SECS", defaults.connect_timeout_secs),
            timeout_secs: env_or("FETCH_TIMEOUT_SECS", defaults.timeout_secs),
            max_redirects: env_or("FETCH_MAX_REDIRECTS", defaults.max_redirects),
            max_bytes: env_or("FETCH_MAX_BYTES", defaults.max_bytes),
            max_retries: env_or("FETCH_MAX_RETRIES", defaults.max_retries),
            backoff_base_ms: env_or("FETCH_BACKOFF_BASE_MS", defaults.backoff_base_ms),
            tls_mode: std::env::var("FETCH_TLS_MODE")
                .ok()
                .and_then(|v| TlsMode::parse(&v))
                .unwrap_or(TlsMode::Strict),
            user_agent: std::env::var("FETCH_USER_AGENT").unwrap_or(defaults.user_agent),
            accept_language: defaults.accept_language,
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        if self.connect_timeout_secs == 0 || self.timeout_secs == 0 {
            return Err("timeouts must be at least 1 second".to_string());
        }
        if self.connect_timeout_secs > self.timeout_secs {
            return Err("connect timeout cannot exceed total timeout".to_string());
        }
        if self.max_bytes == 0 {
            return Err("max_bytes must be greater than 0".to_string());
        }
        if self.max_redirects > 10 {
            return Err("max_redirects must be 10 or fewer".to_string());
        }
        if self.max_retries > 5 {
            return Err("max_retries must be 5 or fewer".to_string());
        }
        Ok(())
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 30,
            timeout_secs: 60,
            max_redirects: 3,
            max_bytes: 5 * 1024 * 1024,
            max_retries: 3,
            backoff_base_ms: 1000,
            tls_mode: TlsMode::Strict,
            user_agent: "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36".to_string(),
            accept_language: "en-US,en;q=0.9".to_string(),
        }
    }
}

/// Configuration for content extraction
#[derive(Debug, Clone)]
pub struct ExtractConfig {
    /// Maximum characters of body text kept (default: 20000)
    pub max_body_chars: usize,
}

impl ExtractConfig {
    pub fn from_env() -> Self {
        Self {
            max_body_chars: env_or("EXTRACT_MAX_BODY_CHARS", 20_000),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.max_body_chars < 100 {
            return Err("max_body_chars must be at least 100".to_string());
        }
        Ok(())
    }
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            max_body_chars: 20_000,
        }
    }
}
