//! # Bounded tracker of recently-seen cluster message ids.
//!
//! The relay tags every locally-observed event with a fresh message id before
//! publishing it to the cluster, and records the id here. Inbound messages
//! whose id is already recorded are duplicates: either this process's own
//! publish echoed back by the broker, or the same underlying event relayed by
//! more than one peer.
//!
//! ## Rules
//! - `claim(id)` is **atomic**: check-then-insert happens under one write
//!   lock, so two racing claims of the same id can never both win.
//! - First claim wins and returns true; every later claim of the same id
//!   returns false and mutates nothing.
//! - Capacity is bounded: once size would exceed the limit, the single
//!   oldest claimed id is evicted (FIFO, not LRU). An evicted id can be
//!   claimed again.

use std::collections::{HashSet, VecDeque};

use tokio::sync::RwLock;

/// Insertion-ordered claim state.
struct DedupState {
    /// Membership check.
    seen: HashSet<String>,
    /// Insertion order, oldest at the front.
    order: VecDeque<String>,
}

/// Bounded FIFO set of claimed message ids.
///
/// ### Responsibilities
/// - Decides whether an inbound cluster message should be processed.
/// - Suppresses the publish-echo loop (the relay's own publish delivered back
///   to the same process).
///
/// ### Invariant
/// After any claim, size ≤ capacity; an id present in the set has been
/// claimed and must not be reprocessed.
pub struct DedupTracker {
    capacity: usize,
    state: RwLock<DedupState>,
}

impl DedupTracker {
    /// Creates a tracker that retains at most `capacity` claimed ids.
    ///
    /// The minimum capacity is 1 (clamped).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            state: RwLock::new(DedupState {
                seen: HashSet::with_capacity(capacity),
                order: VecDeque::with_capacity(capacity),
            }),
        }
    }

    /// Claims `id` if it has not been seen.
    ///
    /// Returns true and records the id on first claim; returns false without
    /// mutating anything when the id is already present. When recording would
    /// exceed capacity, the oldest claimed id is evicted.
    pub async fn claim(&self, id: &str) -> bool {
        let mut state = self.state.write().await;
        if state.seen.contains(id) {
            return false;
        }
        state.seen.insert(id.to_string());
        state.order.push_back(id.to_string());
        if state.order.len() > self.capacity {
            if let Some(oldest) = state.order.pop_front() {
                state.seen.remove(&oldest);
            }
        }
        true
    }

    /// Returns true if `id` is currently claimed.
    pub async fn contains(&self, id: &str) -> bool {
        self.state.read().await.seen.contains(id)
    }

    /// Number of ids currently retained.
    pub async fn len(&self) -> usize {
        self.state.read().await.order.len()
    }

    /// Returns true if no id is currently retained.
    pub async fn is_empty(&self) -> bool {
        self.state.read().await.order.is_empty()
    }
}
