// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use std::time::Duration;
use threadloom::admission::{AdmissionConfig, Source};
use threadloom::error::ThreadError;
use threadloom::usage::Identity;

use super::common::{build, harness, quota, text_source, FakeFetcher};

#[tokio::test]
async fn test_requests_served_from_fallback_are_flagged() {
    let h = harness(FakeFetcher::ok(), quota(5, 50));
    let identity = Identity::anonymous("203.0.113.40");
    h.primary.set_available(false);

    let result = h
        .controller
        .submit(Source::Text(text_source(0)), &identity)
        .await
        .unwrap();
    assert!(!result.authoritative);
    assert!(h.store.is_degraded());

    // Quota is still enforced against the fallback
    let usage = h.ledger.get_usage(&identity).await.unwrap();
    assert!(!usage.authoritative);
    assert_eq!(usage.value.count, 1);
}

#[tokio::test]
async fn test_primary_recovery_restores_authoritative_results() {
    let h = harness(FakeFetcher::ok(), quota(5, 50));
    let identity = Identity::anonymous("203.0.113.41");

    h.primary.set_available(false);
    let degraded = h
        .controller
        .submit(Source::Text(text_source(1)), &identity)
        .await
        .unwrap();
    assert!(!degraded.authoritative);

    h.primary.set_available(true);
    tokio::time::sleep(Duration::from_millis(120)).await;

    let recovered = h
        .controller
        .submit(Source::Text(text_source(2)), &identity)
        .await
        .unwrap();
    assert!(recovered.authoritative);
    assert!(!h.store.is_degraded());
}

#[tokio::test]
async fn test_fallback_quota_still_rejects() {
    let h = harness(FakeFetcher::ok(), quota(1, 50));
    let identity = Identity::anonymous("203.0.113.42");
    h.primary.set_available(false);

    h.controller
        .submit(Source::Text(text_source(3)), &identity)
        .await
        .unwrap();
    let err = h
        .controller
        .submit(Source::Text(text_source(4)), &identity)
        .await
        .unwrap_err();
    assert!(matches!(err, ThreadError::RateLimitExceeded { .. }));
}

#[tokio::test]
async fn test_store_unavailable_without_fallback() {
    let h = build(
        FakeFetcher::ok(),
        quota(5, 50),
        AdmissionConfig::default(),
        false,
    );
    let identity = Identity::anonymous("203.0.113.43");
    h.primary.set_available(false);

    let err = h
        .controller
        .submit(Source::Text(text_source(5)), &identity)
        .await
        .unwrap_err();
    assert!(matches!(err, ThreadError::StoreUnavailable(_)));
    assert_eq!(err.to_response().message, "Usage tracking is temporarily unavailable");
    assert_eq!(h.fetcher.calls(), 0);
}
