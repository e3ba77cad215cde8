//! HTML and plain-text content extraction
//!
//! Reduces a fetched payload to a title and the dominant body text. HTML is
//! walked with scraper, skipping structural noise subtrees, and the first
//! substantial content container wins.

use scraper::{ElementRef, Html, Selector};
use thiserror::Error;

use super::config::ExtractConfig;

/// Elements whose whole subtree is dropped
const NOISE_TAGS: &[&str] = &[
    "script", "style", "noscript", "nav", "footer", "header", "aside", "form", "iframe", "svg",
    "template", "button",
];

/// Priority order of content containers
const CONTENT_SELECTORS: &[&str] = &[
    "article",
    "main",
    "[role='main']",
    ".post-content",
    ".article-content",
    ".entry-content",
    ".story-body",
    ".article__body",
    ".content-body",
    "#article-body",
    "#content",
    ".prose",
];

/// A container must hold at least this many characters to count as the body
const MIN_CONTAINER_CHARS: usize = 200;

const MAX_TITLE_CHARS: usize = 120;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ExtractError {
    #[error("Unparsable content: {0}")]
    UnparsableContent(String),
}

/// Title and body text of a document
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedContent {
    pub title: Option<String>,
    pub body_text: String,
}

#[derive(Debug, Clone, PartialEq)]
enum PayloadKind {
    Html,
    Text,
    Unsupported(String),
}

#[derive(Debug, Clone)]
pub struct ContentExtractor {
    config: ExtractConfig,
}

impl ContentExtractor {
    pub fn new(config: ExtractConfig) -> Self {
        Self { config }
    }

    /// Extract from raw bytes and the declared content type
    pub fn extract(
        &self,
        bytes: &[u8],
        content_type: Option<&str>,
    ) -> Result<ExtractedContent, ExtractError> {
        let raw = String::from_utf8_lossy(bytes);
        match classify(content_type, &raw) {
            PayloadKind::Html => self.extract_html(&raw),
            PayloadKind::Text => {
                let mut content = self.extract_text(&raw)?;
                content.body_text = truncate_chars(&content.body_text, self.config.max_body_chars);
                Ok(content)
            }
            PayloadKind::Unsupported(mime) => Err(ExtractError::UnparsableContent(format!(
                "unsupported content type '{}'",
                mime
            ))),
        }
    }

    /// Plain text: whitespace normalization only.
    ///
    /// Pasted text is never truncated; the body cap applies to fetched pages.
    pub fn extract_text(&self, text: &str) -> Result<ExtractedContent, ExtractError> {
        let title = text
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(|line| truncate_chars(&clean_text(line), MAX_TITLE_CHARS));
        finish(title, clean_text(text))
    }

    fn extract_html(&self, html: &str) -> Result<ExtractedContent, ExtractError> {
        let document = Html::parse_document(html);
        let title = heading_title(&document).or_else(|| document_title(&document));
        let body = main_content(&document);
        let body_text = truncate_chars(&body, self.config.max_body_chars);
        finish(title, body_text)
    }
}

fn finish(title: Option<String>, body_text: String) -> Result<ExtractedContent, ExtractError> {
    if body_text.is_empty() {
        return Err(ExtractError::UnparsableContent(
            "no text left after cleanup".to_string(),
        ));
    }
    Ok(ExtractedContent {
        title: title.filter(|t| !t.is_empty()),
        body_text,
    })
}

fn classify(content_type: Option<&str>, raw: &str) -> PayloadKind {
    let mime = content_type
        .and_then(|ct| ct.split(';').next())
        .map(|m| m.trim().to_ascii_lowercase())
        .unwrap_or_default();

    match mime.as_str() {
        "text/html" | "application/xhtml+xml" => PayloadKind::Html,
        "" | "application/octet-stream" => {
            if looks_like_html(raw) {
                PayloadKind::Html
            } else if raw.contains('\u{0}') {
                PayloadKind::Unsupported("binary".to_string())
            } else {
                PayloadKind::Text
            }
        }
        m if m.starts_with("text/") => PayloadKind::Text,
        other => PayloadKind::Unsupported(other.to_string()),
    }
}

fn looks_like_html(raw: &str) -> bool {
    let head: String = raw.trim_start().chars().take(512).collect::<String>().to_lowercase();
    head.starts_with("<!doctype html") || head.contains("<html") || head.contains("<body")
}

fn heading_title(document: &Html) -> Option<String> {
    let selector = Selector::parse("h1").ok()?;
    document
        .select(&selector)
        .map(|el| clean_text(&visible_text(el)))
        .find(|text| !text.is_empty())
        .map(|text| truncate_chars(&text, MAX_TITLE_CHARS))
}

fn document_title(document: &Html) -> Option<String> {
    let selector = Selector::parse("title").ok()?;
    document
        .select(&selector)
        .next()
        .map(|el| clean_text(&el.text().collect::<String>()))
        .filter(|text| !text.is_empty())
        .map(|text| truncate_chars(&text, MAX_TITLE_CHARS))
}

fn main_content(document: &Html) -> String {
    for selector_str in CONTENT_SELECTORS {
        if let Ok(selector) = Selector::parse(selector_str) {
            if let Some(element) = document.select(&selector).next() {
                let cleaned = clean_text(&visible_text(element));
                if cleaned.chars().count() > MIN_CONTAINER_CHARS {
                    return cleaned;
                }
            }
        }
    }

    // Fallback: whole body minus noise
    if let Ok(body_selector) = Selector::parse("body") {
        if let Some(body) = document.select(&body_selector).next() {
            return clean_text(&visible_text(body));
        }
    }
    clean_text(&visible_text(document.root_element()))
}

/// Text of an element, skipping noise subtrees
fn visible_text(element: ElementRef) -> String {
    let mut out = String::new();
    collect_text(element, &mut out);
    out
}

fn collect_text(element: ElementRef, out: &mut String) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
        } else if let Some(child_el) = ElementRef::wrap(child) {
            if NOISE_TAGS.contains(&child_el.value().name()) {
                continue;
            }
            // Block boundaries must not glue words together
            out.push(' ');
            collect_text(child_el, out);
            out.push(' ');
        }
    }
}

/// Clean text: normalize whitespace
pub(crate) fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Truncate to `max_chars`, cutting at the last word boundary when possible
fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        None => text.to_string(),
        Some((cut, _)) => {
            let head = &text[..cut];
            match head.rfind(' ') {
                Some(space) if space > 0 => head[..space].to_string(),
                _ => head.to_string(),
            }
        }
    }
}
