// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Per-key request coalescing
//!
//! The first caller for a key becomes the leader and runs the work; callers
//! arriving while it runs subscribe to its outcome. A leader that finishes
//! without completing (error, cancellation, deadline) abandons the flight and
//! its followers race to join again, so exactly one of them takes over.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;

#[derive(Debug, Clone)]
enum Outcome<T> {
    Done(T),
    Abandoned,
}

struct Flight<T> {
    id: u64,
    tx: broadcast::Sender<Outcome<T>>,
}

pub struct SingleFlight<T> {
    flights: Mutex<HashMap<String, Flight<T>>>,
    next_id: AtomicU64,
}

/// Result of joining a flight
pub enum Role<T: Clone + Send + 'static> {
    Leader(LeaderGuard<T>),
    Follower(FollowerHandle<T>),
}

/// What a follower observed
#[derive(Debug, PartialEq)]
pub enum FollowOutcome<T> {
    Completed(T),
    /// The leader gave up; join again to elect a new one
    Abandoned,
    TimedOut,
}

impl<T: Clone + Send + 'static> SingleFlight<T> {
    pub fn new() -> Self {
        Self {
            flights: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn join(self: &Arc<Self>, key: &str) -> Role<T> {
        let mut flights = match self.flights.lock() {
            Ok(f) => f,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(flight) = flights.get(key) {
            return Role::Follower(FollowerHandle {
                rx: flight.tx.subscribe(),
            });
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, _) = broadcast::channel(1);
        flights.insert(
            key.to_string(),
            Flight {
                id,
                tx: tx.clone(),
            },
        );
        Role::Leader(LeaderGuard {
            owner: Arc::clone(self),
            key: key.to_string(),
            id,
            tx,
            finished: false,
        })
    }

    /// Number of flights currently running
    pub fn in_flight(&self) -> usize {
        self.flights.lock().map(|f| f.len()).unwrap_or(0)
    }

    fn finish(&self, key: &str, id: u64, tx: &broadcast::Sender<Outcome<T>>, outcome: Outcome<T>) {
        let mut flights = match self.flights.lock() {
            Ok(f) => f,
            Err(poisoned) => poisoned.into_inner(),
        };
        // Remove before publishing so a late joiner either subscribed already or starts fresh
        if flights.get(key).map_or(false, |f| f.id == id) {
            flights.remove(key);
        }
        let _ = tx.send(outcome);
    }
}

impl<T: Clone + Send + 'static> Default for SingleFlight<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Held by the caller doing the work; dropping it without `complete` abandons
pub struct LeaderGuard<T: Clone + Send + 'static> {
    owner: Arc<SingleFlight<T>>,
    key: String,
    id: u64,
    tx: broadcast::Sender<Outcome<T>>,
    finished: bool,
}

impl<T: Clone + Send + 'static> LeaderGuard<T> {
    pub fn complete(mut self, value: T) {
        self.finished = true;
        self.owner
            .finish(&self.key, self.id, &self.tx, Outcome::Done(value));
    }
}

impl<T: Clone + Send + 'static> Drop for LeaderGuard<T> {
    fn drop(&mut self) {
        if !self.finished {
            self.owner
                .finish(&self.key, self.id, &self.tx, Outcome::Abandoned);
        }
    }
}

pub struct FollowerHandle<T> {
    rx: broadcast::Receiver<Outcome<T>>,
}

impl<T: Clone> FollowerHandle<T> {
    pub async fn wait(mut self, limit: Duration) -> FollowOutcome<T> {
        match tokio::time::timeout(limit, self.rx.recv()).await {
            Err(_) => FollowOutcome::TimedOut,
            Ok(Ok(Outcome::Done(value))) => FollowOutcome::Completed(value),
            // Closed without a message means the leader vanished
            Ok(Ok(Outcome::Abandoned)) | Ok(Err(_)) => FollowOutcome::Abandoned,
        }
    }
}
