// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Usage ledger and quota policy

pub mod config;
pub mod ledger;
pub mod types;

pub use config::QuotaConfig;
pub use ledger::{seconds_until_daily_reset, seconds_until_monthly_reset, UsageLedger};
pub use types::{AdmissionDecision, Identity, Quota, QuotaWindow, Tier, UsageRecord, UsageStatus};
