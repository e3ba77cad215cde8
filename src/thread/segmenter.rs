// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Deterministic thread segmentation
//!
//! Text is split into sentences, sentences are packed greedily into tweets,
//! and a sentence only falls back to word packing when it cannot fit in a
//! tweet of its own. A single word is hard-cut only when it alone exceeds the
//! budget. The numbering suffix width depends on the final count, so packing
//! runs at most twice: once with an estimated reservation and, if the real
//! count needs a wider suffix, once more with one extra digit of headroom.

use thiserror::Error;

use super::config::SegmenterConfig;
use super::types::Tweet;
use crate::ingest::extractor::clean_text;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum SegmentError {
    #[error("No content after normalization")]
    EmptyInput,
    #[error("Max tweet length {max_len} cannot hold a {reserved}-character numbering suffix")]
    LengthTooSmall { max_len: usize, reserved: usize },
    #[error("Invalid numbering template: {0}")]
    InvalidTemplate(String),
}

/// Splits text into numbered, length-bounded tweets
#[derive(Debug, Clone)]
pub struct Segmenter {
    max_len: usize,
    template: String,
}

impl Segmenter {
    pub fn new(config: &SegmenterConfig) -> Result<Self, SegmentError> {
        if !config.numbering_template.contains("{i}") {
            return Err(SegmentError::InvalidTemplate(
                config.numbering_template.clone(),
            ));
        }
        if config.max_tweet_length == 0 {
            return Err(SegmentError::LengthTooSmall {
                max_len: 0,
                reserved: 0,
            });
        }
        Ok(Self {
            max_len: config.max_tweet_length,
            template: config.numbering_template.clone(),
        })
    }

    pub fn max_tweet_length(&self) -> usize {
        self.max_len
    }

    /// Segment free text, preferring sentence boundaries
    pub fn segment(&self, text: &str) -> Result<Vec<Tweet>, SegmentError> {
        let normalized = clean_text(text);
        if normalized.is_empty() {
            return Err(SegmentError::EmptyInput);
        }
        if char_len(&normalized) <= self.max_len {
            return Ok(vec![single(normalized)]);
        }
        self.pack_numbered(&[split_sentences(&normalized)])
    }

    /// Segment pre-split units; units are never merged with each other
    pub fn segment_units<S: AsRef<str>>(&self, units: &[S]) -> Result<Vec<Tweet>, SegmentError> {
        let normalized: Vec<String> = units
            .iter()
            .map(|u| clean_text(u.as_ref()))
            .filter(|u| !u.is_empty())
            .collect();
        if normalized.is_empty() {
            return Err(SegmentError::EmptyInput);
        }
        if normalized.len() == 1 && char_len(&normalized[0]) <= self.max_len {
            return Ok(normalized.into_iter().map(single).collect());
        }
        let sentences: Vec<Vec<String>> = normalized.iter().map(|u| split_sentences(u)).collect();
        self.pack_numbered(&sentences)
    }

    fn suffix(&self, index: usize, total: usize) -> String {
        self.template
            .replace("{i}", &index.to_string())
            .replace("{n}", &total.to_string())
    }

    /// Characters reserved for " <suffix>" when the thread has `total` tweets
    fn reserve_for(&self, total: usize) -> usize {
        1 + char_len(&self.suffix(total, total))
    }

    fn budget(&self, reserved: usize) -> Result<usize, SegmentError> {
        match self.max_len.checked_sub(reserved) {
            Some(budget) if budget >= 1 => Ok(budget),
            _ => Err(SegmentError::LengthTooSmall {
                max_len: self.max_len,
                reserved,
            }),
        }
    }

    fn pack_numbered(&self, units: &[Vec<String>]) -> Result<Vec<Tweet>, SegmentError> {
        let total_chars: usize = units.iter().flatten().map(|s| char_len(s) + 1).sum();
        let estimate = (total_chars / self.max_len + 1).max(units.len()).max(2);

        let reserved = self.reserve_for(estimate);
        let bodies = pack(units, self.budget(reserved)?);
        if self.reserve_for(bodies.len()) <= reserved {
            return Ok(self.finalize(bodies));
        }

        // Final pass: one digit wider than the count we just observed
        let reserved = self.reserve_for(bodies.len().saturating_mul(10));
        let bodies = pack(units, self.budget(reserved)?);
        let needed = self.reserve_for(bodies.len());
        if needed <= reserved {
            return Ok(self.finalize(bodies));
        }
        Err(SegmentError::LengthTooSmall {
            max_len: self.max_len,
            reserved: needed,
        })
    }

    fn finalize(&self, bodies: Vec<String>) -> Vec<Tweet> {
        let total = bodies.len();
        bodies
            .into_iter()
            .enumerate()
            .map(|(i, body)| {
                let text = format!("{} {}", body, self.suffix(i + 1, total));
                let char_count = char_len(&text);
                debug_assert!(char_count <= self.max_len);
                Tweet {
                    index: i + 1,
                    total,
                    text,
                    body,
                    char_count,
                }
            })
            .collect()
    }
}

fn single(text: String) -> Tweet {
    Tweet {
        index: 1,
        total: 1,
        char_count: char_len(&text),
        body: text.clone(),
        text,
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Split whitespace-normalized text into sentences
fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    for word in text.split(' ') {
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
        if ends_sentence(word) {
            sentences.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        sentences.push(current);
    }
    sentences
}

fn ends_sentence(word: &str) -> bool {
    let trimmed = word.trim_end_matches(['"', '\'', ')', ']', '”', '’', '»']);
    trimmed.ends_with(['.', '!', '?', '…'])
}

fn pack(units: &[Vec<String>], budget: usize) -> Vec<String> {
    let mut packer = Packer::new(budget);
    for unit in units {
        for sentence in unit {
            packer.push_sentence(sentence);
        }
        packer.flush();
    }
    packer.bodies
}

struct Packer {
    budget: usize,
    bodies: Vec<String>,
    current: String,
    current_len: usize,
}

impl Packer {
    fn new(budget: usize) -> Self {
        Self {
            budget,
            bodies: Vec::new(),
            current: String::new(),
            current_len: 0,
        }
    }

    fn fits(&self, len: usize) -> bool {
        if self.current_len == 0 {
            len <= self.budget
        } else {
            self.current_len + 1 + len <= self.budget
        }
    }

    fn append(&mut self, piece: &str, len: usize) {
        if self.current_len > 0 {
            self.current.push(' ');
            self.current_len += 1;
        }
        self.current.push_str(piece);
        self.current_len += len;
    }

    fn flush(&mut self) {
        if self.current_len > 0 {
            self.bodies.push(std::mem::take(&mut self.current));
            self.current_len = 0;
        }
    }

    fn push_sentence(&mut self, sentence: &str) {
        let len = char_len(sentence);
        if self.fits(len) {
            self.append(sentence, len);
            return;
        }
        if len <= self.budget {
            self.flush();
            self.append(sentence, len);
            return;
        }
        for word in sentence.split(' ') {
            self.push_word(word);
        }
    }

    fn push_word(&mut self, word: &str) {
        let len = char_len(word);
        if self.fits(len) {
            self.append(word, len);
            return;
        }
        self.flush();
        if len <= self.budget {
            self.append(word, len);
            return;
        }
        // Hard cut; the last piece stays open so following words can join it
        let chars: Vec<char> = word.chars().collect();
        for piece in chars.chunks(self.budget) {
            self.flush();
            self.current = piece.iter().collect();
            self.current_len = piece.len();
        }
    }
}
