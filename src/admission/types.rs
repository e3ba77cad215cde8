// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Request and result types of the admission controller

use serde::{Deserialize, Serialize};

use crate::cache::Fingerprint;
use crate::thread::{GenerationMode, Tweet};

/// What the caller wants turned into a thread
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Source {
    Url(String),
    Text(String),
}

/// Where a result came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServedBy {
    /// This request ran the generation and was charged for it
    Generated,
    Cache,
    /// Another in-flight request generated it; not charged
    SharedFlight,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadResult {
    pub fingerprint: Fingerprint,
    pub title: Option<String>,
    pub tweets: Vec<Tweet>,
    pub cached: bool,
    pub served_by: ServedBy,
    pub generation_mode: GenerationMode,
    /// False when any store read or write went to the local fallback
    pub authoritative: bool,
}

/// Lifecycle of one `submit` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionState {
    Received,
    Fingerprinted,
    CacheHit,
    QuotaCheck,
    Admitted,
    Rejected,
    ServedFromCache,
    Generated,
    Done,
}

impl AdmissionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Received => "RECEIVED",
            Self::Fingerprinted => "FINGERPRINTED",
            Self::CacheHit => "CACHE_HIT",
            Self::QuotaCheck => "QUOTA_CHECK",
            Self::Admitted => "ADMITTED",
            Self::Rejected => "REJECTED",
            Self::ServedFromCache => "SERVED_FROM_CACHE",
            Self::Generated => "GENERATED",
            Self::Done => "DONE",
        }
    }
}
