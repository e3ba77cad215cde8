// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Thread composition backends
//!
//! The backend is chosen once, when the pipeline is built: `AiBackend` when a
//! text generator is configured, `PlainSplitterBackend` otherwise. Both hand
//! their output to the [`Segmenter`] so every thread obeys the same length and
//! numbering rules.

use async_trait::async_trait;
use regex::Regex;
use std::sync::{Arc, OnceLock};
use tracing::{debug, warn};

use super::generator::TextGenerator;
use super::segmenter::{SegmentError, Segmenter};
use super::types::{GenerationMode, Tweet};
use crate::ingest::extractor::ExtractedContent;

/// Upper bound on source text sent to the generator
const MAX_PROMPT_SOURCE_CHARS: usize = 12_000;

/// Tweets plus the path that produced them
#[derive(Debug, Clone, PartialEq)]
pub struct ComposedThread {
    pub tweets: Vec<Tweet>,
    pub mode: GenerationMode,
}

#[async_trait]
pub trait ThreadBackend: Send + Sync {
    fn name(&self) -> &'static str;

    async fn compose(
        &self,
        content: &ExtractedContent,
        segmenter: &Segmenter,
    ) -> Result<ComposedThread, SegmentError>;
}

/// Deterministic splitting of the extracted body
#[derive(Debug, Clone, Default)]
pub struct PlainSplitterBackend;

#[async_trait]
impl ThreadBackend for PlainSplitterBackend {
    fn name(&self) -> &'static str {
        "plain_split"
    }

    async fn compose(
        &self,
        content: &ExtractedContent,
        segmenter: &Segmenter,
    ) -> Result<ComposedThread, SegmentError> {
        Ok(ComposedThread {
            tweets: segmenter.segment(&content.body_text)?,
            mode: GenerationMode::PlainSplit,
        })
    }
}

/// Rewrites content through an external generator
pub struct AiBackend {
    generator: Arc<dyn TextGenerator>,
}

impl AiBackend {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    fn fallback(
        content: &ExtractedContent,
        segmenter: &Segmenter,
    ) -> Result<ComposedThread, SegmentError> {
        Ok(ComposedThread {
            tweets: segmenter.segment(&content.body_text)?,
            mode: GenerationMode::PlainSplitFallback,
        })
    }
}

#[async_trait]
impl ThreadBackend for AiBackend {
    fn name(&self) -> &'static str {
        "ai"
    }

    async fn compose(
        &self,
        content: &ExtractedContent,
        segmenter: &Segmenter,
    ) -> Result<ComposedThread, SegmentError> {
        let prompt = build_prompt(content, segmenter.max_tweet_length());

        let text = match self.generator.generate(&prompt).await {
            Ok(text) => text,
            Err(e) => {
                warn!("AI generation failed, falling back to plain split: {}", e);
                return Self::fallback(content, segmenter);
            }
        };

        let units = parse_ai_units(&text);
        if units.is_empty() {
            warn!("AI generation returned no usable posts, falling back to plain split");
            return Self::fallback(content, segmenter);
        }
        debug!("AI generation produced {} units", units.len());

        Ok(ComposedThread {
            tweets: segmenter.segment_units(&units)?,
            mode: GenerationMode::Ai,
        })
    }
}

fn build_prompt(content: &ExtractedContent, max_len: usize) -> String {
    let source: String = content.body_text.chars().take(MAX_PROMPT_SOURCE_CHARS).collect();
    let mut prompt = format!(
        "Rewrite the following content as a thread. Keep every post under {} characters \
         and leave room for a short numbering suffix. Keep the original order of ideas.\n\n",
        max_len.saturating_sub(8)
    );
    if let Some(title) = &content.title {
        prompt.push_str(&format!("Title: {}\n\n", title));
    }
    prompt.push_str(&source);
    prompt
}

fn leading_number() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:(?i:tweet|post)\s*)?\(?\d{1,3}(?:\s*/\s*\d{1,3})?[\)\.:/]?\s+").ok()
    })
    .as_ref()
}

fn trailing_number() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s*\(?\d{1,3}\s*/\s*\d{1,3}\)?$").ok())
        .as_ref()
}

/// Split generator output into posts
///
/// Posts are separated by blank lines or `---` rules. Any numbering the
/// model added is stripped since the segmenter applies its own.
pub(crate) fn parse_ai_units(text: &str) -> Vec<String> {
    let mut units = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.chars().all(|c| c == '-' || c == '*' || c == '=') {
            push_unit(&mut units, &mut current);
        } else {
            current.push(trimmed);
        }
    }
    push_unit(&mut units, &mut current);
    units
}

fn push_unit(units: &mut Vec<String>, lines: &mut Vec<&str>) {
    if lines.is_empty() {
        return;
    }
    let mut unit = lines.join(" ");
    lines.clear();

    if let Some(re) = leading_number() {
        unit = re.replace(&unit, "").into_owned();
    }
    if let Some(re) = trailing_number() {
        unit = re.replace(&unit, "").into_owned();
    }
    let unit = unit.trim();
    if !unit.is_empty() {
        units.push(unit.to_string());
    }
}
