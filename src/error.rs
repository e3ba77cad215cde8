// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Caller-facing error taxonomy
//!
//! Every module keeps its own error enum; they all funnel into [`ThreadError`]
//! at the admission boundary. `to_response` is the only representation that
//! leaves the crate, and it never carries upstream bodies or store internals.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ingest::extractor::ExtractError;
use crate::ingest::fetcher::FetchError;
use crate::ingest::validator::ValidationError;
use crate::storage::StoreError;
use crate::thread::generator::GeneratorError;
use crate::thread::segmenter::SegmentError;

/// Broad error class, used for retry decisions and metrics labels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// Bad request input, reported directly and never retried
    Input,
    /// Transient infrastructure failure, retried internally before surfacing
    Transient,
    /// Quota rejection, carries a retry-after
    Quota,
    /// Concurrent write conflict that exhausted its retries
    Integrity,
    /// Unexpected failure isolated to one request
    Fatal,
}

/// Errors returned by `submit` and `usage_status`
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ThreadError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Host not allowed: {0}")]
    DisallowedHost(String),

    #[error("Private network address blocked: {0}")]
    PrivateNetworkBlocked(String),

    #[error("No content to build a thread from")]
    EmptyInput,

    #[error("Could not extract readable text: {0}")]
    UnparsableContent(String),

    #[error("Timed out fetching content")]
    FetchTimeout,

    #[error("Connection refused by remote host")]
    FetchRefused,

    #[error("Content larger than {limit_bytes} bytes")]
    ContentTooLarge { limit_bytes: u64 },

    #[error("Remote host answered HTTP {status}")]
    HttpError { status: u16 },

    #[error("Rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimitExceeded { retry_after_secs: u64 },

    #[error("Usage store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Request deadline exceeded")]
    DeadlineExceeded,

    #[error("Write conflict: {0}")]
    Conflict(String),

    #[error("Service error: {0}")]
    Service(String),
}

/// Serializable error body handed to the calling layer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
}

impl ThreadError {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidUrl(_) => "invalid_url",
            Self::DisallowedHost(_) => "disallowed_host",
            Self::PrivateNetworkBlocked(_) => "private_network_blocked",
            Self::EmptyInput => "empty_input",
            Self::UnparsableContent(_) => "unparsable_content",
            Self::FetchTimeout => "fetch_timeout",
            Self::FetchRefused => "fetch_refused",
            Self::ContentTooLarge { .. } => "content_too_large",
            Self::HttpError { .. } => "http_error",
            Self::RateLimitExceeded { .. } => "rate_limit_exceeded",
            Self::StoreUnavailable(_) => "store_unavailable",
            Self::DeadlineExceeded => "deadline_exceeded",
            Self::Conflict(_) => "conflict",
            Self::Service(_) => "service_error",
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            Self::InvalidUrl(_)
            | Self::DisallowedHost(_)
            | Self::PrivateNetworkBlocked(_)
            | Self::EmptyInput
            | Self::UnparsableContent(_)
            | Self::ContentTooLarge { .. } => ErrorClass::Input,
            Self::HttpError { status } if *status < 500 => ErrorClass::Input,
            Self::HttpError { .. }
            | Self::FetchTimeout
            | Self::FetchRefused
            | Self::StoreUnavailable(_) => ErrorClass::Transient,
            Self::RateLimitExceeded { .. } => ErrorClass::Quota,
            Self::Conflict(_) => ErrorClass::Integrity,
            Self::DeadlineExceeded | Self::Service(_) => ErrorClass::Fatal,
        }
    }

    /// Seconds the caller should wait before retrying, if meaningful
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            Self::RateLimitExceeded { retry_after_secs } => Some(*retry_after_secs),
            _ => None,
        }
    }

    /// Caller-safe message. Internal detail stays in the logs.
    pub fn public_message(&self) -> String {
        match self {
            Self::InvalidUrl(reason) => format!("The URL is not valid: {}", reason),
            Self::DisallowedHost(host) => format!("Fetching from '{}' is not allowed", host),
            Self::PrivateNetworkBlocked(_) => {
                "The URL points to a private or internal network address".to_string()
            }
            Self::EmptyInput => "There is no text to turn into a thread".to_string(),
            Self::UnparsableContent(_) => {
                "No readable text could be extracted from the content".to_string()
            }
            Self::FetchTimeout => "The page took too long to respond".to_string(),
            Self::FetchRefused => "The page could not be reached".to_string(),
            Self::ContentTooLarge { limit_bytes } => {
                format!("The page is larger than the {} byte limit", limit_bytes)
            }
            Self::HttpError { status } => format!("The page returned HTTP {}", status),
            Self::RateLimitExceeded { retry_after_secs } => format!(
                "Usage limit reached, try again in {} seconds",
                retry_after_secs
            ),
            Self::StoreUnavailable(_) => {
                "Usage tracking is temporarily unavailable".to_string()
            }
            Self::DeadlineExceeded => "The request took too long to complete".to_string(),
            Self::Conflict(_) | Self::Service(_) => "An internal error occurred".to_string(),
        }
    }

    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            code: self.code().to_string(),
            message: self.public_message(),
            retry_after_secs: self.retry_after_secs(),
        }
    }
}

impl From<ValidationError> for ThreadError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::InvalidUrl(reason) => Self::InvalidUrl(reason),
            ValidationError::DisallowedHost(host) => Self::DisallowedHost(host),
            ValidationError::PrivateNetworkBlocked(host) => Self::PrivateNetworkBlocked(host),
        }
    }
}

impl From<FetchError> for ThreadError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Timeout(_) => Self::FetchTimeout,
            FetchError::Refused(_) => Self::FetchRefused,
            FetchError::TooLarge { limit_bytes } => Self::ContentTooLarge { limit_bytes },
            FetchError::HttpStatus(status) => Self::HttpError { status },
            FetchError::TooManyRedirects(max) => {
                Self::InvalidUrl(format!("more than {} redirects", max))
            }
            FetchError::Blocked(inner) => inner.into(),
            FetchError::Client(msg) => Self::Service(msg),
        }
    }
}

impl From<ExtractError> for ThreadError {
    fn from(err: ExtractError) -> Self {
        match err {
            ExtractError::UnparsableContent(reason) => Self::UnparsableContent(reason),
        }
    }
}

impl From<SegmentError> for ThreadError {
    fn from(err: SegmentError) -> Self {
        match err {
            SegmentError::EmptyInput => Self::EmptyInput,
            other => Self::Service(other.to_string()),
        }
    }
}

impl From<GeneratorError> for ThreadError {
    fn from(err: GeneratorError) -> Self {
        Self::Service(err.to_string())
    }
}

impl From<StoreError> for ThreadError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(msg) => Self::StoreUnavailable(msg),
            StoreError::Conflict(msg) => Self::Conflict(msg),
            StoreError::Serialization(msg) => Self::Service(msg),
        }
    }
}
