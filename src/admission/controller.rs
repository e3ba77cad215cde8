// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Request admission orchestration
//!
//! Coordinates caching, quota, single-flight and the generation pipeline:
//!
//! ```text
//! RECEIVED → FINGERPRINTED → CACHE_HIT → SERVED_FROM_CACHE → DONE
//!                          ↘ QUOTA_CHECK → REJECTED
//!                                        ↘ ADMITTED → GENERATED → DONE
//! ```
//!
//! Only the caller that runs a generation is charged, and only after it
//! succeeds. Cache hits and callers served by another caller's flight are free.

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use super::burst::BurstLimiter;
use super::config::AdmissionConfig;
use super::generation::{GenerationPipeline, PreparedSource};
use super::inflight::{InflightTracker, Reservation};
use super::single_flight::{FollowOutcome, LeaderGuard, Role, SingleFlight};
use super::types::{AdmissionState, ServedBy, Source, ThreadResult};
use crate::cache::{CachedThread, Fingerprint, ThreadCache};
use crate::error::{ErrorClass, ThreadError};
use crate::ingest::UrlValidator;
use crate::storage::StoreError;
use crate::usage::{AdmissionDecision, Identity, UsageLedger, UsageStatus};

fn transition(request_id: Uuid, state: AdmissionState) {
    debug!(request_id = %request_id, state = state.as_str(), "admission state");
}

fn to_result(thread: CachedThread, served_by: ServedBy, authoritative: bool) -> ThreadResult {
    ThreadResult {
        fingerprint: thread.fingerprint,
        title: thread.title,
        tweets: thread.tweets,
        cached: served_by == ServedBy::Cache,
        served_by,
        generation_mode: thread.generation_mode,
        authoritative,
    }
}

pub struct AdmissionController {
    validator: Arc<UrlValidator>,
    pipeline: GenerationPipeline,
    ledger: Arc<UsageLedger>,
    cache: ThreadCache,
    burst: BurstLimiter,
    flights: Arc<SingleFlight<CachedThread>>,
    inflight: InflightTracker,
    config: AdmissionConfig,
}

impl AdmissionController {
    pub fn new(
        validator: Arc<UrlValidator>,
        pipeline: GenerationPipeline,
        ledger: Arc<UsageLedger>,
        cache: ThreadCache,
        config: AdmissionConfig,
    ) -> Self {
        let burst = BurstLimiter::new(ledger.config().burst_per_minute);
        Self {
            validator,
            pipeline,
            ledger,
            cache,
            burst,
            flights: Arc::new(SingleFlight::new()),
            inflight: InflightTracker::new(),
            config,
        }
    }

    /// Turn a URL or pasted text into a thread on behalf of `identity`
    pub async fn submit(
        &self,
        source: Source,
        identity: &Identity,
    ) -> Result<ThreadResult, ThreadError> {
        let request_id = Uuid::new_v4();
        let span = info_span!("submit", request_id = %request_id, identity = %identity);

        async move {
            let deadline = self.config.request_deadline();
            let result =
                match tokio::time::timeout(deadline, self.run(request_id, source, identity)).await
                {
                    Ok(result) => result,
                    Err(_) => {
                        warn!("Request deadline of {:?} exceeded", deadline);
                        Err(ThreadError::DeadlineExceeded)
                    }
                };

            match &result {
                Ok(thread) => info!(
                    "Served {} tweets ({:?}, mode {:?})",
                    thread.tweets.len(),
                    thread.served_by,
                    thread.generation_mode
                ),
                Err(e) if matches!(e.class(), ErrorClass::Input | ErrorClass::Quota) => {
                    info!("Request rejected [{}]: {}", e.code(), e)
                }
                Err(e) => warn!("Request failed [{}]: {}", e.code(), e),
            }
            result
        }
        .instrument(span)
        .await
    }

    pub async fn usage_status(&self, identity: &Identity) -> Result<UsageStatus, ThreadError> {
        Ok(self.ledger.usage_status(identity).await?)
    }

    /// Grant premium through `until`; exposed for the operator CLI
    pub async fn grant_premium(
        &self,
        identity: &Identity,
        until: chrono::DateTime<Utc>,
    ) -> Result<(), ThreadError> {
        self.ledger.grant_premium(identity, until).await?;
        Ok(())
    }

    async fn run(
        &self,
        request_id: Uuid,
        source: Source,
        identity: &Identity,
    ) -> Result<ThreadResult, ThreadError> {
        transition(request_id, AdmissionState::Received);
        let (prepared, fingerprint) = self.prepare(source)?;
        transition(request_id, AdmissionState::Fingerprinted);
        debug!("Fingerprint {}", fingerprint);

        let mut authoritative = true;
        if let Some(hit) = self.cached(&fingerprint, &mut authoritative).await {
            return Ok(self.serve_cached(request_id, hit, authoritative));
        }

        if let Err(e) = self.burst.check(&identity.key()) {
            transition(request_id, AdmissionState::Rejected);
            return Err(e);
        }

        let mut reelected = false;
        loop {
            match self.flights.join(fingerprint.as_str()) {
                Role::Leader(guard) => {
                    if reelected {
                        // The abandoned leader may have written the cache before failing
                        if let Some(hit) = self.cached(&fingerprint, &mut authoritative).await {
                            guard.complete(hit.clone());
                            return Ok(self.serve_cached(request_id, hit, authoritative));
                        }
                    }
                    return self
                        .lead(request_id, guard, &prepared, fingerprint, identity, authoritative)
                        .await;
                }
                Role::Follower(follower) => {
                    debug!("Waiting on in-flight generation for {}", fingerprint);
                    match follower.wait(self.config.follower_wait()).await {
                        FollowOutcome::Completed(thread) => {
                            transition(request_id, AdmissionState::Done);
                            return Ok(to_result(thread, ServedBy::SharedFlight, authoritative));
                        }
                        FollowOutcome::Abandoned => {
                            debug!("In-flight generation abandoned, rejoining");
                            reelected = true;
                        }
                        FollowOutcome::TimedOut => {
                            return Err(ThreadError::Service(
                                "timed out waiting for in-flight generation".to_string(),
                            ));
                        }
                    }
                }
            }
        }
    }

    /// Input errors surface here, before any cache, quota or network work
    fn prepare(&self, source: Source) -> Result<(PreparedSource, Fingerprint), ThreadError> {
        match source {
            Source::Url(raw) => {
                let url = self.validator.validate(raw.trim())?;
                let fingerprint = Fingerprint::of_url(url.as_str());
                Ok((PreparedSource::Url(url), fingerprint))
            }
            Source::Text(text) => {
                if text.trim().is_empty() {
                    return Err(ThreadError::EmptyInput);
                }
                let fingerprint = Fingerprint::of_text(&text);
                Ok((PreparedSource::Text(text), fingerprint))
            }
        }
    }

    async fn cached(
        &self,
        fingerprint: &Fingerprint,
        authoritative: &mut bool,
    ) -> Option<CachedThread> {
        match self.cache.get(fingerprint).await {
            Ok(hit) => {
                *authoritative &= hit.authoritative;
                hit.value
            }
            Err(e) => {
                warn!("Cache read for {} failed, treating as miss: {}", fingerprint, e);
                *authoritative = false;
                None
            }
        }
    }

    fn serve_cached(
        &self,
        request_id: Uuid,
        thread: CachedThread,
        authoritative: bool,
    ) -> ThreadResult {
        transition(request_id, AdmissionState::CacheHit);
        transition(request_id, AdmissionState::ServedFromCache);
        transition(request_id, AdmissionState::Done);
        to_result(thread, ServedBy::Cache, authoritative)
    }

    async fn lead(
        &self,
        request_id: Uuid,
        guard: LeaderGuard<CachedThread>,
        prepared: &PreparedSource,
        fingerprint: Fingerprint,
        identity: &Identity,
        mut authoritative: bool,
    ) -> Result<ThreadResult, ThreadError> {
        transition(request_id, AdmissionState::QuotaCheck);
        let reservation = match self.admit(identity, &mut authoritative).await {
            Ok(reservation) => reservation,
            Err(e) => {
                transition(request_id, AdmissionState::Rejected);
                return Err(e);
            }
        };
        transition(request_id, AdmissionState::Admitted);

        // On failure the reservation and the guard drop: nothing is charged and
        // waiting callers elect a new leader
        let generated = self.pipeline.generate(prepared).await?;
        transition(request_id, AdmissionState::Generated);

        let thread = CachedThread {
            fingerprint,
            tweets: generated.tweets,
            title: generated.title,
            generated_at: Utc::now(),
            ttl_secs: self.config.cache_ttl_secs,
            generation_mode: generated.mode,
        };

        match self.cache.put(&thread).await {
            Ok(written) => authoritative &= written.authoritative,
            Err(e) => {
                warn!("Cache write for {} failed: {}", thread.fingerprint, e);
                authoritative = false;
            }
        }

        let ledger = &self.ledger;
        match reservation.commit(|| ledger.increment(identity)).await {
            Ok(record) => authoritative &= record.authoritative,
            Err(e) => {
                warn!(
                    "Usage increment for {} failed after generation, serving uncharged: {}",
                    identity, e
                );
                authoritative = false;
            }
        }

        guard.complete(thread.clone());
        transition(request_id, AdmissionState::Done);
        Ok(to_result(thread, ServedBy::Generated, authoritative))
    }

    async fn admit(
        &self,
        identity: &Identity,
        authoritative: &mut bool,
    ) -> Result<Reservation, ThreadError> {
        let now = Utc::now();
        let ledger = &self.ledger;

        let ((usage_authoritative, decision), reservation) = self
            .inflight
            .reserve(&identity.key(), |pending| async move {
                let usage = ledger.get_usage_at(identity, now).await?;
                let decision = ledger.check_admission(&usage.value, pending, now);
                let admit = decision == AdmissionDecision::Admit;
                Ok::<_, StoreError>(((usage.authoritative, decision), admit))
            })
            .await?;
        *authoritative &= usage_authoritative;

        match (decision, reservation) {
            (_, Some(reservation)) => Ok(reservation),
            (
                AdmissionDecision::Reject {
                    window,
                    retry_after_secs,
                },
                None,
            ) => {
                info!("Quota exhausted for {} ({:?} window)", identity, window);
                Err(ThreadError::RateLimitExceeded { retry_after_secs })
            }
            (AdmissionDecision::Admit, None) => Err(ThreadError::Service(
                "admission granted without a reservation".to_string(),
            )),
        }
    }
}
