// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use std::time::Duration;
use threadloom::admission::{ServedBy, Source};
use threadloom::usage::Identity;

use super::common::{harness, quota, FakeFetcher, ARTICLE_URL};

#[tokio::test]
async fn test_concurrent_callers_share_one_generation() {
    let m = 8;
    let h = harness(
        FakeFetcher::slow(Duration::from_millis(300)),
        quota(5, 50),
    );

    let mut handles = Vec::new();
    for i in 0..m {
        let controller = h.controller.clone();
        handles.push(tokio::spawn(async move {
            let identity = Identity::anonymous(format!("192.0.2.{}", 50 + i));
            controller
                .submit(Source::Url(ARTICLE_URL.to_string()), &identity)
                .await
        }));
    }

    let mut results = Vec::new();
    for handle in handles {
        results.push(handle.await.unwrap().unwrap());
    }

    assert_eq!(h.fetcher.calls(), 1);
    let first = &results[0];
    assert!(results.iter().all(|r| r.tweets == first.tweets));
    assert_eq!(
        results
            .iter()
            .filter(|r| r.served_by == ServedBy::Generated)
            .count(),
        1
    );

    // Only the caller that ran the generation was charged
    let mut charged = 0;
    for i in 0..m {
        let identity = Identity::anonymous(format!("192.0.2.{}", 50 + i));
        charged += h.ledger.get_usage(&identity).await.unwrap().value.count;
    }
    assert_eq!(charged, 1);
}

#[tokio::test]
async fn test_followers_recover_when_leader_fails() {
    let h = harness(
        FakeFetcher::flaky(Duration::from_millis(300), 502),
        quota(5, 50),
    );
    let first = Identity::anonymous("192.0.2.70");
    let second = Identity::anonymous("192.0.2.71");

    let leader = {
        let controller = h.controller.clone();
        let identity = first.clone();
        tokio::spawn(async move {
            controller
                .submit(Source::Url(ARTICLE_URL.to_string()), &identity)
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    // Joins the running flight, sees it abandoned, then takes over
    let follower = h
        .controller
        .submit(Source::Url(ARTICLE_URL.to_string()), &second)
        .await
        .unwrap();

    assert_eq!(leader.await.unwrap().unwrap_err().code(), "http_error");
    assert_eq!(follower.served_by, ServedBy::Generated);
    assert_eq!(h.fetcher.calls(), 2);
    assert_eq!(h.ledger.get_usage(&first).await.unwrap().value.count, 0);
    assert_eq!(h.ledger.get_usage(&second).await.unwrap().value.count, 1);
}

#[tokio::test]
async fn test_different_sources_run_in_parallel() {
    let h = harness(
        FakeFetcher::slow(Duration::from_millis(100)),
        quota(5, 50),
    );
    let identity = Identity::anonymous("192.0.2.80");

    let a = h.controller.submit(
        Source::Url(format!("{}?page=1", ARTICLE_URL)),
        &identity,
    );
    let b = h.controller.submit(
        Source::Url(format!("{}?page=2", ARTICLE_URL)),
        &identity,
    );
    let (a, b) = tokio::join!(a, b);

    assert_eq!(a.unwrap().served_by, ServedBy::Generated);
    assert_eq!(b.unwrap().served_by, ServedBy::Generated);
    assert_eq!(h.fetcher.calls(), 2);
}
