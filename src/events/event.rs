//! # Intent change events.
//!
//! A [`ChangeEvent`] is produced once per observed intent transition and
//! consumed by zero or more watchers. It is immutable once constructed.
//!
//! ## Origin
//! - [`ChangeEvent::local`] — observed by this process (webhook receiver, or
//!   a direct provider read inside `wait_for_terminal`).
//! - [`ChangeEvent::remote`] — received from another cluster instance via the
//!   relay.
//!
//! ## Ordering guarantees
//! Each event carries a process-local sequence number (`seq`) that increases
//! monotonically. For a single intent, bus delivery order equals publish
//! order; `seq` lets consumers assert that ordering when they record events.
//!
//! ## Example
//! ```rust
//! use intentwatch::{ChangeEvent, IntentMetadata, IntentSnapshot, IntentStatus};
//!
//! let ev = ChangeEvent::local(IntentSnapshot {
//!     id: "pi_1".into(),
//!     status: IntentStatus::Succeeded,
//!     amount: 2500,
//!     currency: "usd".into(),
//!     metadata: IntentMetadata { payload: Some("order-42".into()), charge: None },
//!     cancellation_reason: None,
//! });
//!
//! assert!(ev.local);
//! assert_eq!(ev.intent_id(), "pi_1");
//! assert_eq!(ev.payload_id(), Some("order-42"));
//! assert!(ev.is_terminal());
//! ```

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

use crate::provider::{IntentSnapshot, IntentStatus};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// A single observed intent state change.
///
/// - `seq`: monotonic process-local sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - `local`: true when this process observed the change itself, false when
///   it arrived from a cluster peer
/// - `intent`: the provider intent snapshot the change carries
#[derive(Clone, Debug)]
pub struct ChangeEvent {
    /// Monotonically increasing sequence number, unique within this process.
    pub seq: u64,
    /// Wall-clock timestamp of when this process constructed the event.
    pub at: SystemTime,
    /// Event origin: locally observed vs relayed from a peer.
    pub local: bool,
    /// The intent snapshot carried by this change.
    pub intent: IntentSnapshot,
}

impl ChangeEvent {
    fn tagged(intent: IntentSnapshot, local: bool) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            local,
            intent,
        }
    }

    /// Creates an event for a change observed by this process.
    pub fn local(intent: IntentSnapshot) -> Self {
        Self::tagged(intent, true)
    }

    /// Creates an event for a change relayed from another cluster instance.
    pub fn remote(intent: IntentSnapshot) -> Self {
        Self::tagged(intent, false)
    }

    /// The provider intent id this change is about.
    #[inline]
    pub fn intent_id(&self) -> &str {
        &self.intent.id
    }

    /// The intent's lifecycle status at the time of the change.
    #[inline]
    pub fn status(&self) -> IntentStatus {
        self.intent.status
    }

    /// The caller-supplied payload id, if the intent carries one.
    #[inline]
    pub fn payload_id(&self) -> Option<&str> {
        self.intent.metadata.payload.as_deref()
    }

    /// The provider's cancellation reason, if present.
    #[inline]
    pub fn cancellation_reason(&self) -> Option<&str> {
        self.intent.cancellation_reason.as_deref()
    }

    /// True when the carried status is terminal (`succeeded` / `canceled`).
    #[inline]
    pub fn is_terminal(&self) -> bool {
        self.intent.status.is_terminal()
    }
}
