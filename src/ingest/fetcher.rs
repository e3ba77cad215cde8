// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! HTTP content fetching with redirect re-validation, size caps, and retries
//!
//! Fetches the page behind a validated URL. Redirects are followed by hand so
//! that each hop goes back through the [`UrlValidator`], and every host is
//! resolved and checked against the private-network policy right before the
//! request is sent.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE, LOCATION};
use reqwest::{Client, Response};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};
use url::{Host, Url};

use super::config::{FetchConfig, TlsMode};
use super::validator::{UrlValidator, ValidatedUrl, ValidationError};

const ACCEPT_HEADER: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,text/plain;q=0.8,*/*;q=0.5";

/// Raw response of a successful fetch
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// URL after redirects
    pub final_url: Url,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Content fetch error types
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FetchError {
    /// Request timed out
    #[error("Timeout fetching: {0}")]
    Timeout(String),
    /// Connection could not be established or was reset
    #[error("Connection failed: {0}")]
    Refused(String),
    /// Body exceeds the configured cap
    #[error("Response exceeds {limit_bytes} bytes")]
    TooLarge { limit_bytes: u64 },
    /// HTTP non-success status
    #[error("HTTP {0}")]
    HttpStatus(u16),
    #[error("More than {0} redirects")]
    TooManyRedirects(usize),
    /// A redirect target or resolved address failed validation
    #[error("Blocked: {0}")]
    Blocked(ValidationError),
    /// Local HTTP client failure
    #[error("HTTP client error: {0}")]
    Client(String),
}

impl FetchError {
    /// Whether another attempt may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout(_) | Self::Refused(_) => true,
            Self::HttpStatus(status) => matches!(status, 429 | 502 | 503 | 504),
            _ => false,
        }
    }
}

/// Fetches page content for a validated URL
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &ValidatedUrl) -> Result<FetchedPage, FetchError>;
}

/// reqwest-backed fetcher
pub struct HttpFetcher {
    client: Client,
    validator: Arc<UrlValidator>,
    config: FetchConfig,
}

impl HttpFetcher {
    /// Create a new fetcher; fails only if the TLS backend cannot initialize
    pub fn new(config: FetchConfig, validator: Arc<UrlValidator>) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_HEADER));
        let language = HeaderValue::from_str(&config.accept_language)
            .map_err(|e| FetchError::Client(format!("accept-language: {}", e)))?;
        headers.insert(ACCEPT_LANGUAGE, language);

        let mut builder = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::none());

        if config.tls_mode == TlsMode::Relaxed {
            warn!("Content fetcher running in RELAXED TLS mode: certificate verification is disabled");
            builder = builder.danger_accept_invalid_certs(true);
        }

        let client = builder
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;

        Ok(Self {
            client,
            validator,
            config,
        })
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    fn backoff(&self, retry: u32) -> Duration {
        Duration::from_millis(self.config.backoff_base_ms.saturating_mul(1u64 << retry.min(16)))
    }

    async fn fetch_once(&self, url: &ValidatedUrl) -> Result<FetchedPage, FetchError> {
        let max_redirects = self.config.max_redirects;
        let mut current = url.as_url().clone();

        for hop in 0..=max_redirects {
            self.guard_resolved(&current).await?;
            if self.config.tls_mode == TlsMode::Relaxed {
                warn!("Fetching {} without certificate verification", current);
            }

            let response = self
                .client
                .get(current.clone())
                .send()
                .await
                .map_err(|e| classify(e, &current))?;

            let status = response.status();
            if status.is_redirection() {
                if hop == max_redirects {
                    return Err(FetchError::TooManyRedirects(max_redirects));
                }
                current = self.redirect_target(&current, &response)?;
                debug!("Following redirect {} -> {}", hop + 1, current);
                continue;
            }

            if !status.is_success() {
                return Err(FetchError::HttpStatus(status.as_u16()));
            }

            let content_type = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(|v| v.to_string());
            let bytes = self.read_capped(response, &current).await?;

            return Ok(FetchedPage {
                final_url: current,
                content_type,
                bytes,
            });
        }

        Err(FetchError::TooManyRedirects(max_redirects))
    }

    fn redirect_target(&self, current: &Url, response: &Response) -> Result<Url, FetchError> {
        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(FetchError::HttpStatus(response.status().as_u16()))?;
        let next = current.join(location).map_err(|e| {
            FetchError::Blocked(ValidationError::InvalidUrl(format!(
                "bad redirect target: {}",
                e
            )))
        })?;
        let validated = self
            .validator
            .validate_parsed(next)
            .map_err(FetchError::Blocked)?;
        Ok(validated.into_url())
    }

    /// Resolve the host and reject it if any address is private
    async fn guard_resolved(&self, url: &Url) -> Result<(), FetchError> {
        if self.validator.allows_private_networks() {
            return Ok(());
        }
        let domain = match url.host() {
            Some(Host::Domain(domain)) => domain.to_string(),
            // Literal addresses were checked by the validator
            _ => return Ok(()),
        };
        let port = url.port_or_known_default().unwrap_or(80);
        let lookup = tokio::time::timeout(
            Duration::from_secs(self.config.connect_timeout_secs),
            tokio::net::lookup_host((domain.as_str(), port)),
        )
        .await
        .map_err(|_| FetchError::Timeout(url.to_string()))?
        .map_err(|e| FetchError::Refused(format!("dns lookup for {}: {}", domain, e)))?;

        for addr in lookup {
            self.validator
                .check_ip(addr.ip())
                .map_err(FetchError::Blocked)?;
        }
        Ok(())
    }

    async fn read_capped(&self, mut response: Response, url: &Url) -> Result<Vec<u8>, FetchError> {
        let limit = self.config.max_bytes;
        if let Some(declared) = response.content_length() {
            if declared > limit {
                return Err(FetchError::TooLarge { limit_bytes: limit });
            }
        }

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| classify(e, url))? {
            if (body.len() + chunk.len()) as u64 > limit {
                warn!("Aborting fetch of {}: body exceeds {} bytes", url, limit);
                return Err(FetchError::TooLarge { limit_bytes: limit });
            }
            body.extend_from_slice(&chunk);
        }
        Ok(body)
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &ValidatedUrl) -> Result<FetchedPage, FetchError> {
        let mut retry = 0;
        loop {
            match self.fetch_once(url).await {
                Ok(page) => {
                    info!("Fetched {} bytes from: {}", page.bytes.len(), page.final_url);
                    return Ok(page);
                }
                Err(e) if e.is_transient() && retry < self.config.max_retries => {
                    let delay = self.backoff(retry);
                    retry += 1;
                    warn!(
                        "Fetch of {} failed ({}), retry {}/{} in {:?}",
                        url, e, retry, self.config.max_retries, delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn classify(err: reqwest::Error, url: &Url) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout(url.to_string())
    } else if err.is_connect() || err.is_request() || err.is_body() {
        FetchError::Refused(err.to_string())
    } else {
        FetchError::Client(err.to_string())
    }
}
