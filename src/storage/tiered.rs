// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Primary store with a local fallback and an explicit degradation flag
//!
//! Operations go to the primary with a small retry budget. When that budget is
//! exhausted with `Unavailable`, the store flips to degraded, logs once at
//! `warn`, and serves from the fallback. While degraded the primary is probed
//! again at most once per reprobe interval. Results from the fallback are
//! marked non-authoritative. Writes made to the fallback during an outage are
//! not replayed to the primary when it recovers.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::config::StoreConfig;
use super::kv::{KvStore, StoreError, CACHE_KEY_PREFIX};
use super::memory::MemoryStore;
use super::redis_store::RedisStore;

/// A value plus whether it came from the authoritative primary
#[derive(Debug, Clone, PartialEq)]
pub struct Tiered<T> {
    pub value: T,
    pub authoritative: bool,
}

impl<T> Tiered<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Tiered<U> {
        Tiered {
            value: f(self.value),
            authoritative: self.authoritative,
        }
    }
}

/// Retry policy for primary operations
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub exponential_base: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_delay: Duration::from_millis(50),
            max_delay: Duration::from_secs(1),
            exponential_base: 2.0,
        }
    }
}

impl RetryConfig {
    fn delay_for(&self, attempt: u32) -> Duration {
        let factor = self.exponential_base.powi(attempt as i32);
        let delay = self.initial_delay.mul_f64(factor);
        delay.min(self.max_delay)
    }
}

pub struct TieredStore {
    primary: Option<Arc<dyn KvStore>>,
    fallback: Option<Arc<dyn KvStore>>,
    degraded: AtomicBool,
    last_probe: Mutex<Option<Instant>>,
    reprobe_interval: Duration,
    retry: RetryConfig,
}

impl TieredStore {
    pub fn new(
        primary: Option<Arc<dyn KvStore>>,
        fallback: Option<Arc<dyn KvStore>>,
        reprobe_interval: Duration,
        retry: RetryConfig,
    ) -> Result<Self, StoreError> {
        if primary.is_none() && fallback.is_none() {
            return Err(StoreError::Unavailable(
                "no primary store configured and local fallback disabled".to_string(),
            ));
        }
        let degraded = primary.is_none();
        if degraded {
            warn!("No primary store configured, usage is tracked in process memory only");
        }
        Ok(Self {
            primary,
            fallback,
            degraded: AtomicBool::new(degraded),
            last_probe: Mutex::new(None),
            reprobe_interval,
            retry,
        })
    }

    /// Build the Redis primary and memory fallback described by `config`
    pub fn from_config(config: &StoreConfig) -> Result<Self, StoreError> {
        let primary: Option<Arc<dyn KvStore>> = match &config.redis_url {
            Some(url) => Some(Arc::new(RedisStore::new(
                url,
                Duration::from_millis(config.op_timeout_ms),
            )?)),
            None => None,
        };
        let fallback: Option<Arc<dyn KvStore>> = if config.allow_local_fallback {
            Some(Arc::new(MemoryStore::partitioned(
                config.memory_capacity,
                CACHE_KEY_PREFIX,
                config.memory_cache_capacity,
            )))
        } else {
            None
        };
        let retry = RetryConfig {
            max_retries: config.primary_retries,
            ..RetryConfig::default()
        };
        Self::new(
            primary,
            fallback,
            Duration::from_secs(config.reprobe_interval_secs),
            retry,
        )
    }

    /// True while results are served from the fallback
    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::SeqCst)
    }

    /// Check the primary now, regardless of the reprobe interval
    pub async fn probe(&self) -> bool {
        let Some(primary) = &self.primary else {
            return false;
        };
        match primary.ping().await {
            Ok(()) => {
                self.mark_healthy(primary.name());
                true
            }
            Err(e) => {
                self.mark_degraded(primary.name(), "probe", &e.to_string());
                false
            }
        }
    }

    pub async fn get(&self, key: &str) -> Result<Tiered<Option<String>>, StoreError> {
        self.execute("get", |store| {
            let key = key.to_string();
            async move { store.get(&key).await }
        })
        .await
    }

    pub async fn set_ex(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<Tiered<()>, StoreError> {
        self.execute("set_ex", |store| {
            let key = key.to_string();
            let value = value.to_string();
            async move { store.set_ex(&key, &value, ttl).await }
        })
        .await
    }

    pub async fn incr_ex(&self, key: &str, ttl: Duration) -> Result<Tiered<u64>, StoreError> {
        self.execute("incr_ex", |store| {
            let key = key.to_string();
            async move { store.incr_ex(&key, ttl).await }
        })
        .await
    }

    async fn execute<T, F, Fut>(&self, op: &str, run: F) -> Result<Tiered<T>, StoreError>
    where
        F: Fn(Arc<dyn KvStore>) -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        if let Some(primary) = &self.primary {
            if self.should_try_primary() {
                match self.with_retries(primary, op, &run).await {
                    Ok(value) => {
                        self.mark_healthy(primary.name());
                        return Ok(Tiered {
                            value,
                            authoritative: true,
                        });
                    }
                    Err(StoreError::Unavailable(msg)) => {
                        self.mark_degraded(primary.name(), op, &msg);
                        if self.fallback.is_none() {
                            return Err(StoreError::Unavailable(msg));
                        }
                    }
                    Err(other) => return Err(other),
                }
            }
        }

        match &self.fallback {
            Some(fallback) => run(fallback.clone()).await.map(|value| Tiered {
                value,
                authoritative: false,
            }),
            None => Err(StoreError::Unavailable(
                "primary store unavailable".to_string(),
            )),
        }
    }

    async fn with_retries<T, F, Fut>(
        &self,
        primary: &Arc<dyn KvStore>,
        op: &str,
        run: &F,
    ) -> Result<T, StoreError>
    where
        F: Fn(Arc<dyn KvStore>) -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        // A reprobe gets a single attempt
        let retries = if self.is_degraded() {
            0
        } else {
            self.retry.max_retries
        };

        let mut attempt = 0;
        loop {
            match run(primary.clone()).await {
                Err(StoreError::Unavailable(msg)) if attempt < retries => {
                    let delay = self.retry.delay_for(attempt);
                    debug!(
                        "{} {} failed (attempt {}), retrying in {:?}: {}",
                        primary.name(),
                        op,
                        attempt + 1,
                        delay,
                        msg
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    fn should_try_primary(&self) -> bool {
        if !self.is_degraded() || self.fallback.is_none() {
            return true;
        }
        let Ok(mut last_probe) = self.last_probe.lock() else {
            return true;
        };
        let due = last_probe.map_or(true, |at| at.elapsed() >= self.reprobe_interval);
        if due {
            *last_probe = Some(Instant::now());
        }
        due
    }

    fn mark_degraded(&self, name: &str, op: &str, reason: &str) {
        if let Ok(mut last_probe) = self.last_probe.lock() {
            *last_probe = Some(Instant::now());
        }
        if !self.degraded.swap(true, Ordering::SeqCst) {
            if self.fallback.is_some() {
                warn!(
                    "Primary store '{}' unavailable during {}, serving from local fallback: {}",
                    name, op, reason
                );
            } else {
                warn!("Primary store '{}' unavailable during {}: {}", name, op, reason);
            }
        } else {
            debug!("Primary store '{}' still unavailable: {}", name, reason);
        }
    }

    fn mark_healthy(&self, name: &str) {
        if self.degraded.swap(false, Ordering::SeqCst) {
            info!("Primary store '{}' recovered, leaving degraded mode", name);
        }
    }
}
