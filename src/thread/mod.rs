// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Thread composition
//!
//! Key pieces:
//! - `Segmenter`: deterministic, length-bounded numbering of text
//! - `ThreadBackend`: AI rewrite or plain split, picked at construction
//! - `TextGenerator`: OpenAI-compatible client used by the AI backend

pub mod backend;
pub mod config;
pub mod generator;
pub mod segmenter;
pub mod types;

pub use backend::{AiBackend, ComposedThread, PlainSplitterBackend, ThreadBackend};
pub use config::{AiConfig, SegmenterConfig};
pub use generator::{GeneratorError, OpenAiCompatibleGenerator, TextGenerator};
pub use segmenter::{SegmentError, Segmenter};
pub use types::{GenerationMode, Tweet};
