// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! In-flight admission accounting
//!
//! Between the quota check and the ledger increment a generation may run for
//! a minute. Admissions that have not been charged yet are tracked here per
//! identity and counted against the ceiling, so concurrent misses from one
//! identity cannot overshoot it. Check-and-reserve and charge-and-release both
//! run under the identity's gate.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Mutex as AsyncMutex;

/// Slots are pruned once the map grows past this many identities
const PRUNE_THRESHOLD: usize = 1024;

#[derive(Default)]
struct Slot {
    gate: AsyncMutex<()>,
    pending: AtomicU64,
}

#[derive(Default)]
pub struct InflightTracker {
    slots: Mutex<HashMap<String, Arc<Slot>>>,
}

impl InflightTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, key: &str) -> Arc<Slot> {
        let mut slots = match self.slots.lock() {
            Ok(s) => s,
            Err(poisoned) => poisoned.into_inner(),
        };
        if slots.len() > PRUNE_THRESHOLD {
            slots.retain(|_, slot| {
                Arc::strong_count(slot) > 1 || slot.pending.load(Ordering::SeqCst) > 0
            });
        }
        slots.entry(key.to_string()).or_default().clone()
    }

    /// Uncharged admissions currently held for `key`
    pub fn pending(&self, key: &str) -> u64 {
        self.slots
            .lock()
            .ok()
            .and_then(|s| s.get(key).map(|slot| slot.pending.load(Ordering::SeqCst)))
            .unwrap_or(0)
    }

    /// Run `decide` with the current pending count under the identity's gate.
    /// `decide` returns its verdict alongside any detail the caller needs;
    /// an admitting verdict takes a reservation.
    pub async fn reserve<D, E, F, Fut>(
        &self,
        key: &str,
        decide: F,
    ) -> Result<(D, Option<Reservation>), E>
    where
        F: FnOnce(u64) -> Fut,
        Fut: Future<Output = Result<(D, bool), E>>,
    {
        let slot = self.slot(key);
        let gate = slot.gate.lock().await;
        let pending = slot.pending.load(Ordering::SeqCst);
        let (detail, admit) = decide(pending).await?;
        if !admit {
            return Ok((detail, None));
        }
        slot.pending.fetch_add(1, Ordering::SeqCst);
        drop(gate);
        Ok((
            detail,
            Some(Reservation {
                slot,
                released: false,
            }),
        ))
    }
}

/// An admitted, not yet charged request; dropping it releases the hold
pub struct Reservation {
    slot: Arc<Slot>,
    released: bool,
}

impl Reservation {
    /// Charge the admission with `charge`, then release the hold.
    /// The hold is released even when charging fails.
    pub async fn commit<T, E, F, Fut>(mut self, charge: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let slot = self.slot.clone();
        let _gate = slot.gate.lock().await;
        let result = charge().await;
        self.release();
        result
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.slot.pending.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        self.release();
    }
}
