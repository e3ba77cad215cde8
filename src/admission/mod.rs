// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Request admission
//!
//! Key features:
//! - Content-fingerprint cache; hits never consume quota
//! - Daily and monthly free-tier ceilings with a premium bypass
//! - Per-identity burst guard
//! - Single-flight generation per fingerprint
//! - Whole-request deadline

pub mod burst;
pub mod config;
pub mod controller;
pub mod generation;
pub mod inflight;
pub mod single_flight;
pub mod types;

pub use config::AdmissionConfig;
pub use controller::AdmissionController;
pub use generation::{GeneratedThread, GenerationPipeline, PreparedSource};
pub use types::{AdmissionState, ServedBy, Source, ThreadResult};
