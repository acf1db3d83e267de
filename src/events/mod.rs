//! Intent change events: data model and broadcast bus.
//!
//! ## Contents
//! - [`ChangeEvent`] — one observed intent transition, tagged with origin.
//! - [`Bus`] — thin wrapper over `tokio::sync::broadcast`.
//!
//! ## Quick reference
//! - **Publishers**: the webhook receiver (via [`Hub::emit_local`](crate::Hub::emit_local))
//!   and the cluster relay (remote events that survived dedup).
//! - **Consumers**: the hub's registry dispatcher (drives watchers and
//!   terminal waits) and the relay's outbound worker (fans local events out
//!   to the cluster).
//!
//! See `core/mod.rs` for the system-level wiring diagram.

mod bus;
mod event;

pub use bus::Bus;
pub use event::ChangeEvent;
