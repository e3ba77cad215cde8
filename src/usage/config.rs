// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Quota configuration

use crate::config::env_or;

#[derive(Debug, Clone)]
pub struct QuotaConfig {
    /// Free-tier generations per UTC day (default: 5)
    pub free_daily: u64,
    /// Free-tier generations per UTC month (default: 50)
    pub free_monthly: u64,
    /// Requests per minute per identity before the burst guard trips (default: 20)
    pub burst_per_minute: u32,
}

impl QuotaConfig {
    pub fn from_env() -> Self {
        Self {
            free_daily: env_or("QUOTA_FREE_DAILY", 5),
            free_monthly: env_or("QUOTA_FREE_MONTHLY", 50),
            burst_per_minute: env_or("QUOTA_BURST_PER_MINUTE", 20),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.burst_per_minute == 0 {
            return Err("burst_per_minute must be at least 1".to_string());
        }
        if self.free_monthly < self.free_daily {
            return Err(format!(
                "free_monthly ({}) must not be below free_daily ({})",
                self.free_monthly, self.free_daily
            ));
        }
        Ok(())
    }
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            free_daily: 5,
            free_monthly: 50,
            burst_per_minute: 20,
        }
    }
}
