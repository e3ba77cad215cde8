// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod admission;
pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod ingest;
pub mod pipeline;
pub mod storage;
pub mod thread;
pub mod usage;
pub mod version;

pub use admission::{AdmissionController, ServedBy, Source, ThreadResult};
pub use config::PipelineConfig;
pub use error::{ErrorClass, ErrorResponse, ThreadError};
pub use pipeline::Pipeline;
pub use thread::{GenerationMode, Tweet};
pub use usage::{Identity, Quota, Tier, UsageStatus};
