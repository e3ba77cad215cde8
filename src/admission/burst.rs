// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Per-identity burst guard

use governor::clock::{Clock, DefaultClock};
use governor::state::keyed::DefaultKeyedStateStore;
use governor::{Quota, RateLimiter as GovRateLimiter};
use std::num::NonZeroU32;
use tracing::debug;

use crate::error::ThreadError;

/// Idle keys are dropped once the limiter tracks more than this many identities
const SHRINK_THRESHOLD: usize = 4096;

/// Keyed requests-per-minute limiter; independent of daily quota
pub struct BurstLimiter {
    limiter: GovRateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>,
    requests_per_minute: u32,
    shrink_threshold: usize,
}

impl BurstLimiter {
    pub fn new(requests_per_minute: u32) -> Self {
        let rpm = NonZeroU32::new(requests_per_minute).unwrap_or(NonZeroU32::MIN);
        Self::from_quota(Quota::per_minute(rpm), rpm.get(), SHRINK_THRESHOLD)
    }

    fn from_quota(quota: Quota, requests_per_minute: u32, shrink_threshold: usize) -> Self {
        Self {
            limiter: GovRateLimiter::keyed(quota),
            requests_per_minute,
            shrink_threshold,
        }
    }

    /// Take one cell for `key`; a rejection carries the wait until the next cell
    pub fn check(&self, key: &str) -> Result<(), ThreadError> {
        if self.limiter.len() > self.shrink_threshold {
            self.shrink();
        }
        self.limiter.check_key(&key.to_string()).map_err(|not_until| {
            let wait = not_until.wait_time_from(DefaultClock::default().now());
            let secs = wait.as_secs() + u64::from(wait.subsec_nanos() > 0);
            ThreadError::RateLimitExceeded {
                retry_after_secs: secs.max(1),
            }
        })
    }

    /// Drop state of keys whose bucket has fully refilled
    pub fn shrink(&self) {
        let before = self.limiter.len();
        self.limiter.retain_recent();
        self.limiter.shrink_to_fit();
        debug!("Burst limiter shrunk from {} to {} keys", before, self.limiter.len());
    }

    /// Identities currently tracked
    pub fn tracked(&self) -> usize {
        self.limiter.len()
    }

    pub fn requests_per_minute(&self) -> u32 {
        self.requests_per_minute
    }
}
