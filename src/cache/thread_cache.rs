// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! TTL-based thread caching in the shared store

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use super::fingerprint::Fingerprint;
use crate::storage::{StoreError, Tiered, TieredStore, CACHE_KEY_PREFIX};
use crate::thread::{GenerationMode, Tweet};

/// A generated thread, immutable once written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedThread {
    pub fingerprint: Fingerprint,
    pub tweets: Vec<Tweet>,
    pub title: Option<String>,
    pub generated_at: DateTime<Utc>,
    pub ttl_secs: u64,
    pub generation_mode: GenerationMode,
}

impl CachedThread {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        let ttl = ChronoDuration::seconds(self.ttl_secs.min(i64::MAX as u64) as i64);
        now >= self.generated_at + ttl
    }
}

pub struct ThreadCache {
    store: Arc<TieredStore>,
    ttl: Duration,
}

impl ThreadCache {
    pub fn new(store: Arc<TieredStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn key(fingerprint: &Fingerprint) -> String {
        format!("{}{}", CACHE_KEY_PREFIX, fingerprint)
    }

    /// Look up a live entry; unreadable entries count as misses
    pub async fn get(
        &self,
        fingerprint: &Fingerprint,
    ) -> Result<Tiered<Option<CachedThread>>, StoreError> {
        let raw = self.store.get(&Self::key(fingerprint)).await?;
        Ok(raw.map(|value| {
            let value = value?;
            match serde_json::from_str::<CachedThread>(&value) {
                Ok(entry) if entry.is_expired(Utc::now()) => None,
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!("Ignoring unreadable cache entry {}: {}", fingerprint, e);
                    None
                }
            }
        }))
    }

    pub async fn put(&self, entry: &CachedThread) -> Result<Tiered<()>, StoreError> {
        let json =
            serde_json::to_string(entry).map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.store
            .set_ex(&Self::key(&entry.fingerprint), &json, self.ttl)
            .await
    }
}
