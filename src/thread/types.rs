// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Core types for generated threads

use serde::{Deserialize, Serialize};

/// One unit of a thread
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tweet {
    /// 1-based position in the thread
    pub index: usize,
    pub total: usize,
    /// Publishable text, numbering suffix included
    pub text: String,
    /// Text without the numbering suffix
    pub body: String,
    /// Unicode scalar count of `text`
    pub char_count: usize,
}

/// How a thread was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationMode {
    /// AI rewrite packaged by the segmenter
    Ai,
    /// Plain splitting, selected at construction (no AI configured)
    PlainSplit,
    /// Plain splitting because the AI call failed at runtime
    PlainSplitFallback,
}

impl GenerationMode {
    /// Plain splitting is functional but lower quality than the AI path
    pub fn is_degraded(&self) -> bool {
        !matches!(self, Self::Ai)
    }
}
