// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Usage and quota types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Who a request is charged to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    pub client_address: String,
    pub account_id: Option<String>,
}

impl Identity {
    pub fn anonymous(client_address: impl Into<String>) -> Self {
        Self {
            client_address: client_address.into(),
            account_id: None,
        }
    }

    pub fn account(client_address: impl Into<String>, account_id: impl Into<String>) -> Self {
        Self {
            client_address: client_address.into(),
            account_id: Some(account_id.into()),
        }
    }

    /// Store key; accounts are tracked by id, anonymous callers by address
    pub fn key(&self) -> String {
        match &self.account_id {
            Some(id) => format!("account:{}", id),
            None => format!("ip:{}", self.client_address),
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Free,
    Premium,
}

/// A count that may be unbounded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quota {
    Limited(u64),
    Unlimited,
}

impl Quota {
    pub fn is_unlimited(&self) -> bool {
        matches!(self, Self::Unlimited)
    }
}

impl fmt::Display for Quota {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Limited(n) => write!(f, "{}", n),
            Self::Unlimited => f.write_str("unlimited"),
        }
    }
}

/// Usage of one identity in the current windows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub identity: String,
    /// Start of the current daily window (UTC midnight)
    pub window_start: DateTime<Utc>,
    /// Admitted generations in the current day
    pub count: u64,
    /// Admitted generations in the current month
    pub monthly_count: u64,
    pub tier: Tier,
    pub premium_expiry: Option<DateTime<Utc>>,
}

impl UsageRecord {
    pub fn is_premium(&self) -> bool {
        self.tier == Tier::Premium
    }
}

/// Caller-facing view of an identity's quota
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageStatus {
    pub used: u64,
    pub remaining: Quota,
    pub limit: Quota,
    pub reset_in_seconds: u64,
    pub tier: Tier,
    /// False when read from the local fallback store
    pub authoritative: bool,
}

/// Which window blocked an admission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaWindow {
    Daily,
    Monthly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionDecision {
    Admit,
    Reject {
        window: QuotaWindow,
        retry_after_secs: u64,
    },
}
