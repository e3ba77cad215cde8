// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Process configuration
//!
//! Each component owns its config struct (`from_env`, `Default`, `validate`).
//! `PipelineConfig` gathers them so the binary can load and check everything
//! in one place before wiring the service.

use std::env;
use std::str::FromStr;

use crate::admission::AdmissionConfig;
use crate::ingest::config::{ExtractConfig, FetchConfig, ValidatorConfig};
use crate::storage::StoreConfig;
use crate::thread::config::{AiConfig, SegmenterConfig};
use crate::usage::QuotaConfig;

/// Read and parse an environment variable, falling back to `default`
pub(crate) fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Read a boolean flag ("true"/"1"/"yes", case-insensitive)
pub(crate) fn env_flag(key: &str, default: bool) -> bool {
    env::var(key)
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(default)
}

/// Read a comma-separated list, dropping empty items
pub(crate) fn env_list(key: &str, default: &[&str]) -> Vec<String> {
    match env::var(key) {
        Ok(v) => v
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect(),
        Err(_) => default.iter().map(|s| s.to_string()).collect(),
    }
}

/// Complete configuration for the thread service
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    pub validator: ValidatorConfig,
    pub fetch: FetchConfig,
    pub extract: ExtractConfig,
    pub segmenter: SegmenterConfig,
    /// External AI generator; `None` selects the plain splitter
    pub ai: Option<AiConfig>,
    pub quota: QuotaConfig,
    pub store: StoreConfig,
    pub admission: AdmissionConfig,
}

impl PipelineConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            validator: ValidatorConfig::from_env(),
            fetch: FetchConfig::from_env(),
            extract: ExtractConfig::from_env(),
            segmenter: SegmenterConfig::from_env(),
            ai: AiConfig::from_env(),
            quota: QuotaConfig::from_env(),
            store: StoreConfig::from_env(),
            admission: AdmissionConfig::from_env(),
        }
    }

    /// Validate every section, reporting the first problem found
    pub fn validate(&self) -> Result<(), String> {
        self.fetch.validate().map_err(|e| format!("fetch: {}", e))?;
        self.extract.validate().map_err(|e| format!("extract: {}", e))?;
        self.segmenter
            .validate()
            .map_err(|e| format!("segmenter: {}", e))?;
        if let Some(ai) = &self.ai {
            ai.validate().map_err(|e| format!("ai: {}", e))?;
        }
        self.quota.validate().map_err(|e| format!("quota: {}", e))?;
        self.store.validate().map_err(|e| format!("store: {}", e))?;
        self.admission
            .validate()
            .map_err(|e| format!("admission: {}", e))?;
        Ok(())
    }
}
