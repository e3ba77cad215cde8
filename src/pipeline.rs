// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Service wiring
//!
//! Builds every shared handle once from a `PipelineConfig` and hands them to
//! the admission controller. Nothing here is global; tests construct their own.

use anyhow::{anyhow, Context, Result};
use std::sync::Arc;
use tracing::{info, warn};

use crate::admission::{AdmissionController, GenerationPipeline, Source, ThreadResult};
use crate::cache::ThreadCache;
use crate::config::PipelineConfig;
use crate::error::ThreadError;
use crate::ingest::{ContentExtractor, HttpFetcher, UrlValidator};
use crate::storage::TieredStore;
use crate::thread::{
    AiBackend, OpenAiCompatibleGenerator, PlainSplitterBackend, Segmenter, ThreadBackend,
};
use crate::usage::{Identity, UsageLedger, UsageStatus};

pub struct Pipeline {
    controller: AdmissionController,
    store: Arc<TieredStore>,
}

impl Pipeline {
    /// Validate `config` and build the full service
    pub async fn from_config(config: PipelineConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| anyhow!("invalid configuration: {}", e))?;

        let validator = Arc::new(UrlValidator::new(config.validator.clone()));
        let fetcher = Arc::new(
            HttpFetcher::new(config.fetch.clone(), validator.clone())
                .context("failed to build HTTP fetcher")?,
        );
        let extractor = ContentExtractor::new(config.extract.clone());
        let segmenter = Segmenter::new(&config.segmenter).context("invalid segmenter settings")?;

        let backend: Arc<dyn ThreadBackend> = match &config.ai {
            Some(ai) => {
                let generator = OpenAiCompatibleGenerator::new(ai)
                    .context("failed to build AI generator client")?;
                info!("AI backend enabled ({} via {})", ai.model, ai.endpoint);
                Arc::new(AiBackend::new(Arc::new(generator)))
            }
            None => {
                info!("No AI endpoint configured, threads use the plain splitter");
                Arc::new(PlainSplitterBackend)
            }
        };

        let store = Arc::new(
            TieredStore::from_config(&config.store).context("failed to build usage store")?,
        );
        if config.store.redis_url.is_some() && !store.probe().await {
            warn!("Primary store unreachable at startup, serving from local fallback");
        }

        let ledger = Arc::new(UsageLedger::new(store.clone(), config.quota.clone()));
        let cache = ThreadCache::new(store.clone(), config.admission.cache_ttl());
        let pipeline = GenerationPipeline::new(fetcher, extractor, backend, segmenter);
        let controller =
            AdmissionController::new(validator, pipeline, ledger, cache, config.admission);

        Ok(Self { controller, store })
    }

    pub fn controller(&self) -> &AdmissionController {
        &self.controller
    }

    pub fn store(&self) -> &Arc<TieredStore> {
        &self.store
    }

    pub async fn submit(
        &self,
        source: Source,
        identity: &Identity,
    ) -> Result<ThreadResult, ThreadError> {
        self.controller.submit(source, identity).await
    }

    pub async fn usage_status(&self, identity: &Identity) -> Result<UsageStatus, ThreadError> {
        self.controller.usage_status(identity).await
    }
}
