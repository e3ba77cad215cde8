// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! In-process store used as the local fallback

use async_trait::async_trait;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use super::kv::{KvStore, StoreError};

#[derive(Debug, Clone)]
struct MemoryEntry {
    value: String,
    expires_at: Option<Instant>,
}

impl MemoryEntry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| at > now)
    }
}

type Partition = Mutex<LruCache<String, MemoryEntry>>;

/// LRU-bounded map with per-key expiry
///
/// All operations take one lock per partition, which makes `incr_ex` atomic per
/// process. Keys under an evictable prefix can be given their own partition so
/// that a flood of them never evicts the other keys.
pub struct MemoryStore {
    entries: Partition,
    evictable: Option<(String, Partition)>,
    available: AtomicBool,
}

fn partition(capacity: usize) -> Partition {
    let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
    Mutex::new(LruCache::new(capacity))
}

impl MemoryStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: partition(capacity),
            evictable: None,
            available: AtomicBool::new(true),
        }
    }

    /// Keys starting with `prefix` live in a separate LRU of `prefix_capacity`
    pub fn partitioned(capacity: usize, prefix: &str, prefix_capacity: usize) -> Self {
        Self {
            entries: partition(capacity),
            evictable: Some((prefix.to_string(), partition(prefix_capacity))),
            available: AtomicBool::new(true),
        }
    }

    /// Simulate an outage; every operation fails with `Unavailable` while off
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        let count = |p: &Partition| p.lock().map(|e| e.len()).unwrap_or(0);
        count(&self.entries) + self.evictable.as_ref().map_or(0, |(_, p)| count(p))
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("memory store offline".to_string()))
        }
    }

    fn lock(
        &self,
        key: &str,
    ) -> Result<std::sync::MutexGuard<'_, LruCache<String, MemoryEntry>>, StoreError> {
        let target = match &self.evictable {
            Some((prefix, bulk)) if key.starts_with(prefix.as_str()) => bulk,
            _ => &self.entries,
        };
        target
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.check_available()?;
        let mut entries = self.lock(key)?;
        let now = Instant::now();
        let found = entries
            .get(key)
            .map(|entry| (entry.is_live(now), entry.value.clone()));
        match found {
            Some((true, value)) => Ok(Some(value)),
            Some((false, _)) => {
                entries.pop(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        self.check_available()?;
        let mut entries = self.lock(key)?;
        entries.put(
            key.to_string(),
            MemoryEntry {
                value: value.to_string(),
                expires_at: Some(Instant::now() + ttl),
            },
        );
        Ok(())
    }

    async fn incr_ex(&self, key: &str, ttl: Duration) -> Result<u64, StoreError> {
        self.check_available()?;
        let mut entries = self.lock(key)?;
        let now = Instant::now();

        let current = match entries.get(key) {
            Some(entry) if entry.is_live(now) => Some(entry.clone()),
            _ => None,
        };

        let (count, expires_at) = match current {
            Some(entry) => {
                let count: u64 = entry.value.parse().map_err(|_| {
                    StoreError::Serialization(format!("value at '{}' is not a counter", key))
                })?;
                (count + 1, entry.expires_at.or(Some(now + ttl)))
            }
            None => (1, Some(now + ttl)),
        };

        entries.put(
            key.to_string(),
            MemoryEntry {
                value: count.to_string(),
                expires_at,
            },
        );
        Ok(count)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.check_available()
    }
}
