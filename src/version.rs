// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Version information for threadloom

/// Semantic version number, taken from the package manifest
pub const VERSION_NUMBER: &str = env!("CARGO_PKG_VERSION");

/// Capabilities compiled into this build
pub const FEATURES: &[&str] = &[
    "ssrf-guard",
    "redirect-revalidation",
    "dns-guard",
    "html-extraction",
    "sentence-segmentation",
    "ai-backend",
    "plain-split-fallback",
    "fingerprint-cache",
    "daily-monthly-quota",
    "premium-tier",
    "burst-guard",
    "single-flight",
    "redis-with-local-fallback",
];

/// Formatted version string for logging
pub fn get_version_string() -> String {
    format!("threadloom {}", VERSION_NUMBER)
}

/// Version info as JSON, printed by `threadloom-cli version`
pub fn get_version_info() -> serde_json::Value {
    serde_json::json!({
        "name": "threadloom",
        "version": VERSION_NUMBER,
        "features": FEATURES,
    })
}
