// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Generated-thread cache keyed by content fingerprint

pub mod fingerprint;
pub mod thread_cache;

pub use fingerprint::Fingerprint;
pub use thread_cache::{CachedThread, ThreadCache};
