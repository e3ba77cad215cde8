// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;

use threadloom::ingest::ExtractedContent;
use threadloom::thread::{
    AiBackend, AiConfig, GenerationMode, OpenAiCompatibleGenerator, PlainSplitterBackend,
    Segmenter, SegmenterConfig, ThreadBackend,
};

async fn spawn_server(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn ai_backend(endpoint: String) -> AiBackend {
    let generator = OpenAiCompatibleGenerator::new(&AiConfig {
        endpoint,
        api_key: Some("sk-test".to_string()),
        model: "thread-writer".to_string(),
        timeout_secs: 5,
    })
    .unwrap();
    AiBackend::new(Arc::new(generator))
}

fn article() -> ExtractedContent {
    ExtractedContent {
        title: Some("Rust in production".to_string()),
        body_text: "Teams adopting Rust report fewer incidents. ".repeat(30),
    }
}

fn segmenter() -> Segmenter {
    Segmenter::new(&SegmenterConfig::default()).unwrap()
}

#[tokio::test]
async fn test_ai_output_is_renumbered() {
    let app = Router::new().route(
        "/v1/chat/completions",
        post(|| async {
            Json(json!({
                "choices": [{
                    "message": {
                        "role": "assistant",
                        "content": "1/ Rust cut our incident count in half.\n\n\
                                    2/ The borrow checker caught races early.\n\n\
                                    3/ Hiring was easier than expected."
                    }
                }]
            }))
        }),
    );
    let addr = spawn_server(app).await;
    let backend = ai_backend(format!("http://{}", addr));

    let composed = backend.compose(&article(), &segmenter()).await.unwrap();
    assert_eq!(composed.mode, GenerationMode::Ai);
    assert_eq!(composed.tweets.len(), 3);
    assert_eq!(composed.tweets[0].body, "Rust cut our incident count in half.");
    assert_eq!(
        composed.tweets[2].text,
        "Hiring was easier than expected. 3/3"
    );
}

#[tokio::test]
async fn test_unavailable_generator_falls_back() {
    let app = Router::new().route(
        "/v1/chat/completions",
        post(|| async { StatusCode::SERVICE_UNAVAILABLE }),
    );
    let addr = spawn_server(app).await;
    let backend = ai_backend(format!("http://{}", addr));

    let composed = backend.compose(&article(), &segmenter()).await.unwrap();
    let plain = PlainSplitterBackend
        .compose(&article(), &segmenter())
        .await
        .unwrap();

    assert_eq!(composed.mode, GenerationMode::PlainSplitFallback);
    assert_eq!(composed.tweets, plain.tweets);
}

#[tokio::test]
async fn test_rejected_credentials_fall_back() {
    let app = Router::new().route(
        "/v1/chat/completions",
        post(|| async { StatusCode::UNAUTHORIZED }),
    );
    let addr = spawn_server(app).await;
    let backend = ai_backend(format!("http://{}", addr));

    let composed = backend.compose(&article(), &segmenter()).await.unwrap();
    assert_eq!(composed.mode, GenerationMode::PlainSplitFallback);
}

#[tokio::test]
async fn test_unreachable_generator_falls_back() {
    // Nothing listens on the discard port
    let backend = ai_backend("http://127.0.0.1:9".to_string());
    let composed = backend.compose(&article(), &segmenter()).await.unwrap();
    assert_eq!(composed.mode, GenerationMode::PlainSplitFallback);
    assert!(!composed.tweets.is_empty());
}
