// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use threadloom::ingest::{ContentExtractor, ExtractConfig, ExtractError};

fn extractor() -> ContentExtractor {
    ContentExtractor::new(ExtractConfig::default())
}

const NEWS_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
  <title>Site name | Storage engines explained</title>
  <style>body { color: red; }</style>
  <script>window.analytics = "track everything";</script>
</head>
<body>
  <header><nav><a href="/">Home</a> <a href="/about">About</a></nav></header>
  <aside>Subscribe to our newsletter for weekly updates!</aside>
  <main>
    <article>
      <h1>Storage engines explained</h1>
      <p>A log-structured merge tree buffers writes in memory and flushes them in sorted runs.</p>
      <p>Compaction merges those runs in the background, trading write amplification for read speed.</p>
      <p>B-trees update pages in place, which keeps reads predictable but makes random writes costly.</p>
    </article>
  </main>
  <footer>Copyright 2025. All rights reserved.</footer>
</body>
</html>"#;

#[test]
fn test_article_body_without_chrome() {
    let content = extractor()
        .extract(NEWS_PAGE.as_bytes(), Some("text/html; charset=utf-8"))
        .unwrap();

    assert_eq!(content.title.as_deref(), Some("Storage engines explained"));
    assert!(content.body_text.contains("log-structured merge tree"));
    assert!(content.body_text.contains("B-trees update pages"));
    for noise in ["track everything", "Subscribe", "Copyright", "About", "color: red"] {
        assert!(!content.body_text.contains(noise), "leaked {:?}", noise);
    }
    // Paragraph order is preserved
    let lsm = content.body_text.find("log-structured").unwrap();
    let btree = content.body_text.find("B-trees").unwrap();
    assert!(lsm < btree);
}

#[test]
fn test_html_sniffed_without_content_type() {
    let content = extractor().extract(NEWS_PAGE.as_bytes(), None).unwrap();
    assert!(content.body_text.contains("Compaction merges"));
}

#[test]
fn test_plain_text_payload() {
    let text = "First line is the title\n\nThen   the body\twith   odd spacing.";
    let content = extractor()
        .extract(text.as_bytes(), Some("text/plain"))
        .unwrap();
    assert_eq!(content.title.as_deref(), Some("First line is the title"));
    assert_eq!(
        content.body_text,
        "First line is the title Then the body with odd spacing."
    );
}

#[test]
fn test_unsupported_and_empty_payloads() {
    assert!(matches!(
        extractor().extract(b"%PDF-1.7 ...", Some("application/pdf")),
        Err(ExtractError::UnparsableContent(_))
    ));
    assert!(matches!(
        extractor().extract(
            b"<html><body><script>only()</script></body></html>",
            Some("text/html")
        ),
        Err(ExtractError::UnparsableContent(_))
    ));
}

#[test]
fn test_body_is_capped() {
    let config = ExtractConfig {
        max_body_chars: 200,
    };
    let long = "word ".repeat(500);
    let content = ContentExtractor::new(config)
        .extract(long.as_bytes(), Some("text/plain"))
        .unwrap();
    assert!(content.body_text.chars().count() <= 200);
    assert!(content.body_text.ends_with("word"));
}
