// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Per-identity usage accounting
//!
//! Counters live in daily and monthly window keys:
//!
//! ```text
//! usage:{identity}:d:{YYYY-MM-DD}   daily count
//! usage:{identity}:m:{YYYY-MM}      monthly count
//! premium:{identity}                premium expiry, unix seconds
//! ```
//!
//! Window keys are created by the first increment and expire one hour after
//! their window ends, so no reset job is needed.

use chrono::{DateTime, Datelike, Duration as ChronoDuration, NaiveDate, NaiveTime, TimeZone, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use super::config::QuotaConfig;
use super::types::{AdmissionDecision, Identity, Quota, QuotaWindow, Tier, UsageRecord, UsageStatus};
use crate::storage::{StoreError, Tiered, TieredStore};

/// Slack added to window key TTLs past the end of the window
const WINDOW_SLACK_SECS: u64 = 3600;

pub fn daily_key(identity: &Identity, now: DateTime<Utc>) -> String {
    format!("usage:{}:d:{}", identity.key(), now.format("%Y-%m-%d"))
}

pub fn monthly_key(identity: &Identity, now: DateTime<Utc>) -> String {
    format!("usage:{}:m:{}", identity.key(), now.format("%Y-%m"))
}

pub fn premium_key(identity: &Identity) -> String {
    format!("premium:{}", identity.key())
}

fn start_of_day(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive().and_time(NaiveTime::MIN).and_utc()
}

/// Seconds until the next UTC midnight (at least 1)
pub fn seconds_until_daily_reset(now: DateTime<Utc>) -> u64 {
    let next = start_of_day(now) + ChronoDuration::days(1);
    (next - now).num_seconds().max(1) as u64
}

/// Seconds until 00:00 UTC on the first of next month (at least 1)
pub fn seconds_until_monthly_reset(now: DateTime<Utc>) -> u64 {
    let (year, month) = if now.month() == 12 {
        (now.year() + 1, 1)
    } else {
        (now.year(), now.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
        .map(|date| Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)))
        .map(|next| (next - now).num_seconds().max(1) as u64)
        .unwrap_or_else(|| seconds_until_daily_reset(now))
}

fn parse_count(key: &str, raw: Option<String>) -> Result<u64, StoreError> {
    match raw {
        None => Ok(0),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| StoreError::Serialization(format!("counter '{}' is not a number", key))),
    }
}

pub struct UsageLedger {
    store: Arc<TieredStore>,
    config: QuotaConfig,
}

impl UsageLedger {
    pub fn new(store: Arc<TieredStore>, config: QuotaConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &QuotaConfig {
        &self.config
    }

    pub async fn get_usage(&self, identity: &Identity) -> Result<Tiered<UsageRecord>, StoreError> {
        self.get_usage_at(identity, Utc::now()).await
    }

    pub async fn get_usage_at(
        &self,
        identity: &Identity,
        now: DateTime<Utc>,
    ) -> Result<Tiered<UsageRecord>, StoreError> {
        let day_key = daily_key(identity, now);
        let month_key = monthly_key(identity, now);

        let daily = self.store.get(&day_key).await?;
        let monthly = self.store.get(&month_key).await?;
        let premium = self.premium_expiry(identity, now).await?;

        let record = UsageRecord {
            identity: identity.key(),
            window_start: start_of_day(now),
            count: parse_count(&day_key, daily.value)?,
            monthly_count: parse_count(&month_key, monthly.value)?,
            tier: if premium.value.is_some() { Tier::Premium } else { Tier::Free },
            premium_expiry: premium.value,
        };
        Ok(Tiered {
            value: record,
            authoritative: daily.authoritative && monthly.authoritative && premium.authoritative,
        })
    }

    /// Charge one admitted generation to both windows
    pub async fn increment(&self, identity: &Identity) -> Result<Tiered<UsageRecord>, StoreError> {
        self.increment_at(identity, Utc::now()).await
    }

    pub async fn increment_at(
        &self,
        identity: &Identity,
        now: DateTime<Utc>,
    ) -> Result<Tiered<UsageRecord>, StoreError> {
        let day_ttl =
            Duration::from_secs(seconds_until_daily_reset(now) + WINDOW_SLACK_SECS);
        let month_ttl =
            Duration::from_secs(seconds_until_monthly_reset(now) + WINDOW_SLACK_SECS);

        let daily = self.store.incr_ex(&daily_key(identity, now), day_ttl).await?;
        let monthly = self.store.incr_ex(&monthly_key(identity, now), month_ttl).await?;
        let premium = self.premium_expiry(identity, now).await?;

        debug!(
            "Usage for {} now {} today, {} this month",
            identity, daily.value, monthly.value
        );

        Ok(Tiered {
            value: UsageRecord {
                identity: identity.key(),
                window_start: start_of_day(now),
                count: daily.value,
                monthly_count: monthly.value,
                tier: if premium.value.is_some() { Tier::Premium } else { Tier::Free },
                premium_expiry: premium.value,
            },
            authoritative: daily.authoritative && monthly.authoritative && premium.authoritative,
        })
    }

    pub async fn is_premium(&self, identity: &Identity) -> Result<Tiered<bool>, StoreError> {
        Ok(self
            .premium_expiry(identity, Utc::now())
            .await?
            .map(|expiry| expiry.is_some()))
    }

    /// Grant premium until `until`; a time in the past revokes it
    pub async fn grant_premium(
        &self,
        identity: &Identity,
        until: DateTime<Utc>,
    ) -> Result<Tiered<()>, StoreError> {
        let remaining = (until - Utc::now()).num_seconds().max(1) as u64;
        let result = self
            .store
            .set_ex(
                &premium_key(identity),
                &until.timestamp().to_string(),
                Duration::from_secs(remaining),
            )
            .await?;
        info!("Premium for {} set until {}", identity, until.to_rfc3339());
        Ok(result)
    }

    /// Decide admission for a free-tier record, counting `pending` in-flight
    /// admissions of the same identity as already used
    pub fn check_admission(
        &self,
        record: &UsageRecord,
        pending: u64,
        now: DateTime<Utc>,
    ) -> AdmissionDecision {
        if record.is_premium() {
            return AdmissionDecision::Admit;
        }
        // Monthly first: when both are exhausted the monthly reset is the one that helps
        if record.monthly_count + pending >= self.config.free_monthly {
            return AdmissionDecision::Reject {
                window: QuotaWindow::Monthly,
                retry_after_secs: seconds_until_monthly_reset(now),
            };
        }
        if record.count + pending >= self.config.free_daily {
            return AdmissionDecision::Reject {
                window: QuotaWindow::Daily,
                retry_after_secs: seconds_until_daily_reset(now),
            };
        }
        AdmissionDecision::Admit
    }

    pub async fn usage_status(&self, identity: &Identity) -> Result<UsageStatus, StoreError> {
        let now = Utc::now();
        let usage = self.get_usage_at(identity, now).await?;
        Ok(self.status_from(&usage.value, usage.authoritative, now))
    }

    pub fn status_from(
        &self,
        record: &UsageRecord,
        authoritative: bool,
        now: DateTime<Utc>,
    ) -> UsageStatus {
        if record.is_premium() {
            return UsageStatus {
                used: record.count,
                remaining: Quota::Unlimited,
                limit: Quota::Unlimited,
                reset_in_seconds: seconds_until_daily_reset(now),
                tier: Tier::Premium,
                authoritative,
            };
        }

        let daily_left = self.config.free_daily.saturating_sub(record.count);
        let monthly_left = self.config.free_monthly.saturating_sub(record.monthly_count);

        // Every field describes the window that sets `remaining`
        let (used, remaining, limit, reset_in_seconds) =
            if monthly_left == 0 || monthly_left < daily_left {
                (
                    record.monthly_count,
                    monthly_left,
                    self.config.free_monthly,
                    seconds_until_monthly_reset(now),
                )
            } else {
                (
                    record.count,
                    daily_left,
                    self.config.free_daily,
                    seconds_until_daily_reset(now),
                )
            };

        UsageStatus {
            used,
            remaining: Quota::Limited(remaining),
            limit: Quota::Limited(limit),
            reset_in_seconds,
            tier: Tier::Free,
            authoritative,
        }
    }

    async fn premium_expiry(
        &self,
        identity: &Identity,
        now: DateTime<Utc>,
    ) -> Result<Tiered<Option<DateTime<Utc>>>, StoreError> {
        let key = premium_key(identity);
        let raw = self.store.get(&key).await?;
        Ok(raw.map(|value| {
            value
                .and_then(|v| v.trim().parse::<i64>().ok())
                .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
                .filter(|expiry| *expiry > now)
        }))
    }
}
