// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Generation path run by an admitted request
//!
//! fetch → extract → compose (AI or plain) → segment

use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use crate::error::ThreadError;
use crate::ingest::{ContentExtractor, PageFetcher, ValidatedUrl};
use crate::thread::{GenerationMode, Segmenter, ThreadBackend, Tweet};

/// Input that already passed validation
#[derive(Debug, Clone)]
pub enum PreparedSource {
    Url(ValidatedUrl),
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedThread {
    pub title: Option<String>,
    pub tweets: Vec<Tweet>,
    pub mode: GenerationMode,
}

pub struct GenerationPipeline {
    fetcher: Arc<dyn PageFetcher>,
    extractor: ContentExtractor,
    backend: Arc<dyn ThreadBackend>,
    segmenter: Segmenter,
}

impl GenerationPipeline {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        extractor: ContentExtractor,
        backend: Arc<dyn ThreadBackend>,
        segmenter: Segmenter,
    ) -> Self {
        info!("Generation pipeline using '{}' backend", backend.name());
        Self {
            fetcher,
            extractor,
            backend,
            segmenter,
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub async fn generate(&self, source: &PreparedSource) -> Result<GeneratedThread, ThreadError> {
        let start = Instant::now();

        let content = match source {
            PreparedSource::Url(url) => {
                let page = self.fetcher.fetch(url).await?;
                debug!(
                    "Fetched {} bytes from {}",
                    page.bytes.len(),
                    page.final_url
                );
                self.extractor
                    .extract(&page.bytes, page.content_type.as_deref())?
            }
            PreparedSource::Text(text) => self.extractor.extract_text(text)?,
        };

        let composed = self.backend.compose(&content, &self.segmenter).await?;

        info!(
            "Generated {} tweets via {:?} in {}ms",
            composed.tweets.len(),
            composed.mode,
            start.elapsed().as_millis()
        );

        Ok(GeneratedThread {
            title: content.title,
            tweets: composed.tweets,
            mode: composed.mode,
        })
    }
}
