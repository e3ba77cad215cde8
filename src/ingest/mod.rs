// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Content ingestion
//!
//! Turns a caller-supplied URL into plain text:
//!
//! ```text
//! URL string → UrlValidator → ValidatedUrl → HttpFetcher → bytes → ContentExtractor → text
//!                                   ↑              ↓
//!                                   └── redirect targets re-validated
//! ```
//!
//! Pasted text skips the first two stages and goes straight to
//! [`ContentExtractor::extract_text`].

pub mod config;
pub mod extractor;
pub mod fetcher;
pub mod validator;

pub use config::{ExtractConfig, FetchConfig, TlsMode, ValidatorConfig};
pub use extractor::{ContentExtractor, ExtractError, ExtractedContent};
pub use fetcher::{FetchError, FetchedPage, HttpFetcher, PageFetcher};
pub use validator::{UrlValidator, ValidatedUrl, ValidationError};
