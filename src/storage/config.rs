// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Store configuration

use std::env;

use crate::config::{env_flag, env_or};

#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Redis URL; `None` runs on the in-memory store only
    pub redis_url: Option<String>,
    /// Serve from process memory while Redis is unreachable (default: true)
    pub allow_local_fallback: bool,
    /// Seconds between primary probes while degraded (default: 30)
    pub reprobe_interval_secs: u64,
    /// Per-operation timeout for the primary (default: 500ms)
    pub op_timeout_ms: u64,
    /// Extra attempts against the primary before falling back (default: 2)
    pub primary_retries: u32,
    /// Entry cap of the in-memory store for counters and grants (default: 100000)
    pub memory_capacity: usize,
    /// Separate entry cap for cached threads in memory (default: 10000)
    pub memory_cache_capacity: usize,
}

impl StoreConfig {
    pub fn from_env() -> Self {
        Self {
            redis_url: env::var("REDIS_URL").ok().filter(|v| !v.trim().is_empty()),
            allow_local_fallback: env_flag("STORE_ALLOW_LOCAL_FALLBACK", true),
            reprobe_interval_secs: env_or("STORE_REPROBE_SECS", 30),
            op_timeout_ms: env_or("STORE_OP_TIMEOUT_MS", 500),
            primary_retries: env_or("STORE_PRIMARY_RETRIES", 2),
            memory_capacity: env_or("STORE_MEMORY_CAPACITY", 100_000),
            memory_cache_capacity: env_or("STORE_MEMORY_CACHE_CAPACITY", 10_000),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        match &self.redis_url {
            Some(url) if !(url.starts_with("redis://") || url.starts_with("rediss://")) => {
                return Err("REDIS_URL must use the redis:// or rediss:// scheme".to_string());
            }
            None if !self.allow_local_fallback => {
                return Err("REDIS_URL is required when local fallback is disabled".to_string());
            }
            _ => {}
        }
        if self.op_timeout_ms == 0 {
            return Err("op_timeout_ms must be at least 1".to_string());
        }
        if self.memory_capacity == 0 {
            return Err("memory_capacity must be at least 1".to_string());
        }
        if self.memory_cache_capacity == 0 {
            return Err("memory_cache_capacity must be at least 1".to_string());
        }
        Ok(())
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            redis_url: None,
            allow_local_fallback: true,
            reprobe_interval_secs: 30,
            op_timeout_ms: 500,
            primary_retries: 2,
            memory_capacity: 100_000,
            memory_cache_capacity: 10_000,
        }
    }
}
