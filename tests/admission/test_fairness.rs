// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use threadloom::admission::Source;
use threadloom::error::{ErrorClass, ThreadError};
use threadloom::usage::Identity;

use super::common::{harness, quota, FakeFetcher, ARTICLE_URL};

#[tokio::test]
async fn test_failed_fetch_is_not_charged() {
    let h = harness(FakeFetcher::failing(404), quota(5, 50));
    let identity = Identity::anonymous("192.0.2.30");

    let err = h
        .controller
        .submit(Source::Url(ARTICLE_URL.to_string()), &identity)
        .await
        .unwrap_err();
    assert_eq!(err, ThreadError::HttpError { status: 404 });
    assert_eq!(err.class(), ErrorClass::Input);

    let usage = h.ledger.get_usage(&identity).await.unwrap();
    assert_eq!(usage.value.count, 0);
    assert_eq!(usage.value.monthly_count, 0);
}

#[tokio::test]
async fn test_failed_fetch_is_not_cached() {
    let h = harness(FakeFetcher::failing(503), quota(5, 50));
    let identity = Identity::anonymous("192.0.2.31");

    for _ in 0..2 {
        let err = h
            .controller
            .submit(Source::Url(ARTICLE_URL.to_string()), &identity)
            .await
            .unwrap_err();
        assert_eq!(err.class(), ErrorClass::Transient);
    }
    // Both attempts went to the network
    assert_eq!(h.fetcher.calls(), 2);
}

#[tokio::test]
async fn test_validation_failures_never_fetch_or_charge() {
    let h = harness(FakeFetcher::ok(), quota(5, 50));
    let identity = Identity::anonymous("192.0.2.32");

    for url in [
        "http://127.0.0.1/admin",
        "http://169.254.169.254/latest/meta-data/",
        "http://10.20.30.40/",
        "ftp://example.com/file",
        "not a url",
    ] {
        let err = h
            .controller
            .submit(Source::Url(url.to_string()), &identity)
            .await
            .unwrap_err();
        assert_eq!(err.class(), ErrorClass::Input, "{} should be rejected", url);
    }

    assert_eq!(h.fetcher.calls(), 0);
    assert_eq!(h.ledger.get_usage(&identity).await.unwrap().value.count, 0);
}

#[tokio::test]
async fn test_empty_text_rejected_before_quota() {
    let h = harness(FakeFetcher::ok(), quota(5, 50));
    let identity = Identity::anonymous("192.0.2.33");

    let err = h
        .controller
        .submit(Source::Text("   \n\t ".to_string()), &identity)
        .await
        .unwrap_err();
    assert_eq!(err, ThreadError::EmptyInput);
    assert_eq!(h.ledger.get_usage(&identity).await.unwrap().value.count, 0);
}

#[tokio::test]
async fn test_error_response_hides_internal_detail() {
    let h = harness(FakeFetcher::ok(), quota(5, 50));
    let identity = Identity::anonymous("192.0.2.34");

    let err = h
        .controller
        .submit(Source::Url("http://10.0.0.5/secret".to_string()), &identity)
        .await
        .unwrap_err();
    let response = err.to_response();
    assert_eq!(response.code, "private_network_blocked");
    assert!(!response.message.contains("10.0.0.5"));
    assert_eq!(response.retry_after_secs, None);
}

#[tokio::test]
async fn test_long_pasted_text_keeps_its_tail() {
    let h = harness(FakeFetcher::ok(), quota(5, 50));
    let identity = Identity::anonymous("192.0.2.35");
    let text = "Alpha beta gamma delta. ".repeat(1000) + "The final sentence.";
    assert!(text.chars().count() > 20_000);

    let result = h
        .controller
        .submit(Source::Text(text.clone()), &identity)
        .await
        .unwrap();

    let joined = result
        .tweets
        .iter()
        .map(|t| t.body.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    assert!(joined.ends_with("The final sentence."));
    let squash = |s: &str| s.chars().filter(|c| !c.is_whitespace()).collect::<String>();
    assert_eq!(squash(&joined), squash(&text));
    assert_eq!(h.fetcher.calls(), 0);
}
