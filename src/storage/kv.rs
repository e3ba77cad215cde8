// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Key-value store abstraction shared by the usage ledger and thread cache

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum StoreError {
    /// Backend unreachable or timed out
    #[error("Store unavailable: {0}")]
    Unavailable(String),
    /// Concurrent modification that could not be resolved
    #[error("Store conflict: {0}")]
    Conflict(String),
    /// Stored value has an unexpected shape
    #[error("Store serialization error: {0}")]
    Serialization(String),
}

/// Namespace of cached threads; the memory store evicts these separately
pub const CACHE_KEY_PREFIX: &str = "cache:";

/// Minimal string store with expiry and atomic counters
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Backend name for logs
    fn name(&self) -> &'static str;

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Set `key` to `value`, expiring after `ttl`
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError>;

    /// Atomically increment the counter at `key` and return the new value.
    /// `ttl` is applied when the key has no expiry yet.
    async fn incr_ex(&self, key: &str, ttl: Duration) -> Result<u64, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}
