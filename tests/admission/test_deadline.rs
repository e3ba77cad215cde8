// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use std::time::Duration;
use threadloom::admission::{AdmissionConfig, Source};
use threadloom::error::ThreadError;
use threadloom::usage::Identity;

use super::common::{build, quota, FakeFetcher, ARTICLE_URL};

fn short_deadline() -> AdmissionConfig {
    AdmissionConfig {
        request_deadline_secs: 1,
        follower_wait_secs: 1,
        ..AdmissionConfig::default()
    }
}

#[tokio::test]
async fn test_slow_generation_hits_deadline_uncharged() {
    let h = build(
        FakeFetcher::slow(Duration::from_secs(3)),
        quota(5, 50),
        short_deadline(),
        true,
    );
    let identity = Identity::anonymous("203.0.113.60");

    let err = h
        .controller
        .submit(Source::Url(ARTICLE_URL.to_string()), &identity)
        .await
        .unwrap_err();
    assert_eq!(err, ThreadError::DeadlineExceeded);
    assert_eq!(h.ledger.get_usage(&identity).await.unwrap().value.count, 0);
}

#[tokio::test]
async fn test_deadline_releases_the_flight() {
    let h = build(
        FakeFetcher::slow(Duration::from_millis(1500)),
        quota(5, 50),
        short_deadline(),
        true,
    );
    let identity = Identity::anonymous("203.0.113.61");

    let err = h
        .controller
        .submit(Source::Url(ARTICLE_URL.to_string()), &identity)
        .await
        .unwrap_err();
    assert_eq!(err, ThreadError::DeadlineExceeded);

    // The cancelled leader left nothing behind: the next caller leads again
    let again = h
        .controller
        .submit(Source::Url(ARTICLE_URL.to_string()), &identity)
        .await;
    assert_eq!(again.unwrap_err(), ThreadError::DeadlineExceeded);
    assert_eq!(h.fetcher.calls(), 2);
}
