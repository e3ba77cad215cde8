// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Admission configuration

use std::time::Duration;

use crate::config::env_or;

#[derive(Debug, Clone)]
pub struct AdmissionConfig {
    /// Whole-request deadline in seconds (default: 120)
    pub request_deadline_secs: u64,
    /// How long a caller waits on another caller's generation (default: 90)
    pub follower_wait_secs: u64,
    /// Lifetime of cached threads in seconds (default: 86400)
    pub cache_ttl_secs: u64,
}

impl AdmissionConfig {
    pub fn from_env() -> Self {
        Self {
            request_deadline_secs: env_or("ADMISSION_DEADLINE_SECS", 120),
            follower_wait_secs: env_or("ADMISSION_FOLLOWER_WAIT_SECS", 90),
            cache_ttl_secs: env_or("CACHE_TTL_SECS", 86_400),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.request_deadline_secs == 0 {
            return Err("request_deadline_secs must be at least 1".to_string());
        }
        if self.follower_wait_secs == 0 {
            return Err("follower_wait_secs must be at least 1".to_string());
        }
        if self.cache_ttl_secs == 0 {
            return Err("cache_ttl_secs must be at least 1".to_string());
        }
        Ok(())
    }

    pub fn request_deadline(&self) -> Duration {
        Duration::from_secs(self.request_deadline_secs)
    }

    pub fn follower_wait(&self) -> Duration {
        Duration::from_secs(self.follower_wait_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            request_deadline_secs: 120,
            follower_wait_secs: 90,
            cache_ttl_secs: 86_400,
        }
    }
}
