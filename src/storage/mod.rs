// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Shared key-value storage
//!
//! Usage counters and cached threads live behind the [`KvStore`] trait.
//! [`TieredStore`] pairs a Redis primary with an in-memory fallback and reports
//! whether each result is authoritative.

pub mod config;
pub mod kv;
pub mod memory;
pub mod redis_store;
pub mod tiered;

pub use config::StoreConfig;
pub use kv::{KvStore, StoreError, CACHE_KEY_PREFIX};
pub use memory::MemoryStore;
pub use redis_store::RedisStore;
pub use tiered::{RetryConfig, Tiered, TieredStore};
