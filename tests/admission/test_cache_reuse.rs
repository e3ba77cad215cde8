// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use threadloom::admission::{ServedBy, Source};
use threadloom::usage::Identity;

use super::common::{harness, quota, text_source, FakeFetcher, ARTICLE_URL};

#[tokio::test]
async fn test_second_url_request_served_from_cache() {
    let h = harness(FakeFetcher::ok(), quota(5, 50));
    let identity = Identity::anonymous("203.0.113.10");

    let first = h
        .controller
        .submit(Source::Url(ARTICLE_URL.to_string()), &identity)
        .await
        .unwrap();
    assert_eq!(first.served_by, ServedBy::Generated);
    assert!(!first.cached);
    assert!(first.authoritative);
    assert_eq!(first.title.as_deref(), Some("Rust in production"));

    let second = h
        .controller
        .submit(Source::Url(ARTICLE_URL.to_string()), &identity)
        .await
        .unwrap();
    assert_eq!(second.served_by, ServedBy::Cache);
    assert!(second.cached);
    assert_eq!(second.tweets, first.tweets);
    assert_eq!(second.fingerprint, first.fingerprint);

    // One network fetch, one charge
    assert_eq!(h.fetcher.calls(), 1);
    let usage = h.ledger.get_usage(&identity).await.unwrap();
    assert_eq!(usage.value.count, 1);
}

#[tokio::test]
async fn test_cache_is_shared_across_identities() {
    let h = harness(FakeFetcher::ok(), quota(5, 50));
    let alice = Identity::account("203.0.113.11", "alice");
    let bob = Identity::account("203.0.113.12", "bob");

    h.controller
        .submit(Source::Url(ARTICLE_URL.to_string()), &alice)
        .await
        .unwrap();
    let for_bob = h
        .controller
        .submit(Source::Url(ARTICLE_URL.to_string()), &bob)
        .await
        .unwrap();

    assert!(for_bob.cached);
    assert_eq!(h.ledger.get_usage(&bob).await.unwrap().value.count, 0);
}

#[tokio::test]
async fn test_url_normalization_hits_cache() {
    let h = harness(FakeFetcher::ok(), quota(5, 50));
    let identity = Identity::anonymous("203.0.113.13");

    h.controller
        .submit(Source::Url(ARTICLE_URL.to_string()), &identity)
        .await
        .unwrap();
    let shouted = ARTICLE_URL.replace("news.example.com", "NEWS.Example.COM");
    let again = h
        .controller
        .submit(Source::Url(format!("  {}  ", shouted)), &identity)
        .await
        .unwrap();

    assert!(again.cached);
    assert_eq!(h.fetcher.calls(), 1);
}

#[tokio::test]
async fn test_cache_hit_allowed_when_quota_exhausted() {
    let h = harness(FakeFetcher::ok(), quota(1, 10));
    let identity = Identity::anonymous("203.0.113.14");
    let text = text_source(1);

    h.controller
        .submit(Source::Text(text.clone()), &identity)
        .await
        .unwrap();

    // Ceiling reached, but the identical source is still served
    let replay = h
        .controller
        .submit(Source::Text(text), &identity)
        .await
        .unwrap();
    assert!(replay.cached);

    let fresh = h
        .controller
        .submit(Source::Text(text_source(2)), &identity)
        .await;
    assert_eq!(fresh.unwrap_err().code(), "rate_limit_exceeded");
}

#[tokio::test]
async fn test_whitespace_variants_of_text_share_fingerprint() {
    let h = harness(FakeFetcher::ok(), quota(5, 50));
    let identity = Identity::anonymous("203.0.113.15");
    let text = text_source(3);

    let first = h
        .controller
        .submit(Source::Text(text.clone()), &identity)
        .await
        .unwrap();
    let spaced = text.replace(". ", ".\n\n  ");
    let second = h
        .controller
        .submit(Source::Text(spaced), &identity)
        .await
        .unwrap();

    assert!(second.cached);
    assert_eq!(first.fingerprint, second.fingerprint);
}
