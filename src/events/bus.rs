//! # Change bus: process-wide broadcast of intent changes.
//!
//! [`Bus`] is a thin wrapper around [`tokio::sync::broadcast`] that decouples
//! the webhook receiver from everything downstream. It is the single source
//! of "an intent changed" events inside one process.
//!
//! ## Architecture
//! ```text
//! Publishers:                           Consumers (independent receivers):
//!   webhook receiver (emit_local) ──┐
//!                                   ├──► Bus ──► registry dispatcher ──► watchers / waits
//!   cluster relay (remote events) ──┘     │
//!                                         └────► relay outbound ──► broker publish
//! ```
//!
//! ## Rules
//! - **Non-blocking publish**: `publish()` never blocks or awaits.
//! - **Independent consumers**: each receiver drains at its own pace, so a
//!   slow broker publish for one event never stalls watcher dispatch of
//!   another.
//! - **Per-receiver FIFO**: a receiver observes events in publish order —
//!   this is what provides per-intent delivery ordering.
//! - **No persistence**: events published while a consumer is not yet
//!   subscribed are lost to that consumer.
//!
//! ## Capacity behavior
//! The channel keeps a ring buffer of the most recent `capacity` events.
//! Receivers that fall behind observe `RecvError::Lagged(n)` on the next
//! `recv()`, telling them how many events were skipped.

use tokio::sync::broadcast;

use super::event::ChangeEvent;

/// Broadcast channel for intent change events.
///
/// Thin wrapper over [`tokio::sync::broadcast`] providing a `publish`/`subscribe`
/// API. Multiple publishers may publish concurrently; every subscriber
/// receives a clone of each event.
///
/// Cheap to clone (internally holds an `Arc`-backed sender).
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<ChangeEvent>,
}

impl Bus {
    /// Creates a new bus with the given channel capacity.
    ///
    /// Capacity is shared across all receivers; the minimum is 1 (clamped).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, _rx) = broadcast::channel::<ChangeEvent>(capacity);
        Self { tx }
    }

    /// Publishes an event to all active subscribers.
    ///
    /// Takes ownership of the event; the channel clones it per receiver. If
    /// there are no receivers the event is dropped — publishing is
    /// fire-and-forget.
    pub fn publish(&self, ev: ChangeEvent) {
        let _ = self.tx.send(ev);
    }

    /// Publishes a borrowed event by cloning it.
    pub fn publish_ref(&self, ev: &ChangeEvent) {
        let _ = self.tx.send(ev.clone());
    }

    /// Creates a new receiver that observes subsequent events.
    ///
    /// Each call creates an independent receiver; a receiver only sees events
    /// published **after** it subscribes.
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{IntentMetadata, IntentSnapshot, IntentStatus};

    fn event(id: &str, status: IntentStatus) -> ChangeEvent {
        ChangeEvent::local(IntentSnapshot {
            id: id.to_string(),
            status,
            amount: 100,
            currency: "usd".to_string(),
            metadata: IntentMetadata::default(),
            cancellation_reason: None,
        })
    }

    #[tokio::test]
    async fn test_receivers_observe_publish_order() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();

        bus.publish(event("pi_1", IntentStatus::Pending));
        bus.publish(event("pi_1", IntentStatus::Processing));
        bus.publish(event("pi_1", IntentStatus::Succeeded));

        let statuses = [
            rx.recv().await.unwrap().status(),
            rx.recv().await.unwrap().status(),
            rx.recv().await.unwrap().status(),
        ];
        assert_eq!(
            statuses,
            [
                IntentStatus::Pending,
                IntentStatus::Processing,
                IntentStatus::Succeeded
            ]
        );
    }

    #[tokio::test]
    async fn test_late_subscriber_misses_earlier_events() {
        let bus = Bus::new(16);
        bus.publish(event("pi_1", IntentStatus::Pending));

        let mut rx = bus.subscribe();
        bus.publish(event("pi_1", IntentStatus::Succeeded));

        let got = rx.recv().await.unwrap();
        assert_eq!(got.status(), IntentStatus::Succeeded);
    }

    #[test]
    fn test_publish_without_receivers_is_dropped() {
        let bus = Bus::new(1);
        // No subscriber: must not panic or block.
        bus.publish(event("pi_1", IntentStatus::Pending));
    }
}
