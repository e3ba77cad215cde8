// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Configuration for thread segmentation and the AI generator

use std::env;

use crate::config::env_or;

/// Segmentation settings
#[derive(Debug, Clone)]
pub struct SegmenterConfig {
    /// Maximum characters per tweet, numbering included (default: 280)
    pub max_tweet_length: usize,
    /// Numbering suffix; `{i}` is the tweet index, `{n}` the total (default: "{i}/{n}")
    pub numbering_template: String,
}

impl SegmenterConfig {
    pub fn from_env() -> Self {
        Self {
            max_tweet_length: env_or("THREAD_MAX_TWEET_LENGTH", 280),
            numbering_template: env::var("THREAD_NUMBERING_TEMPLATE")
                .unwrap_or_else(|_| "{i}/{n}".to_string()),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if !self.numbering_template.contains("{i}") {
            return Err("numbering template must contain {i}".to_string());
        }
        if self.max_tweet_length < 20 {
            return Err("max_tweet_length must be at least 20".to_string());
        }
        Ok(())
    }
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            max_tweet_length: 280,
            numbering_template: "{i}/{n}".to_string(),
        }
    }
}

/// OpenAI-compatible text generation endpoint
#[derive(Debug, Clone)]
pub struct AiConfig {
    /// Base URL, e.g. `https://api.openai.com`
    pub endpoint: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
}

impl AiConfig {
    /// Returns `None` when no endpoint is configured
    pub fn from_env() -> Option<Self> {
        let endpoint = env::var("AI_ENDPOINT").ok().filter(|v| !v.trim().is_empty())?;
        Some(Self {
            endpoint,
            api_key: env::var("AI_API_KEY").ok().filter(|v| !v.is_empty()),
            model: env::var("AI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            timeout_secs: env_or("AI_TIMEOUT_SECS", 45),
        })
    }

    pub fn validate(&self) -> Result<(), String> {
        if !(self.endpoint.starts_with("http://") || self.endpoint.starts_with("https://")) {
            return Err(format!("endpoint '{}' must be an http(s) URL", self.endpoint));
        }
        if self.model.trim().is_empty() {
            return Err("model must not be empty".to_string());
        }
        if self.timeout_secs == 0 {
            return Err("timeout_secs must be at least 1".to_string());
        }
        Ok(())
    }
}
