//! # Broker abstraction: the cluster pub/sub transport.
//!
//! The actual broker client (connection handling, reconnects, auth) is an
//! external collaborator. This module defines the narrow capability the
//! relay consumes — publish, subscribe, unsubscribe — and a loopback
//! in-memory implementation for tests and single-process deployments.
//!
//! ## Contract
//! - `subscribe` is called once per channel after the implementation's
//!   connection is established; it hands back a receiver the relay drains.
//! - Every successful `subscribe` is matched by exactly one `unsubscribe`
//!   before the broker is disconnected (symmetric teardown).
//! - Implementations may deliver a publish back to the publisher's own
//!   subscription (broker echo). The relay's dedup layer suppresses it.

mod memory;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::BrokerError;

pub use memory::MemoryBroker;

/// Narrow pub/sub capability of an external message broker.
///
/// Payloads are opaque UTF-8 strings; the relay owns their shape.
#[async_trait]
pub trait Broker: Send + Sync + 'static {
    /// Publishes `payload` to every current subscriber of `channel`.
    ///
    /// Fire-and-forget from the relay's point of view: delivery to any
    /// particular peer is not guaranteed.
    async fn publish(&self, channel: &str, payload: &str) -> Result<(), BrokerError>;

    /// Subscribes to `channel`, returning the stream of inbound payloads.
    async fn subscribe(&self, channel: &str) -> Result<mpsc::Receiver<String>, BrokerError>;

    /// Removes this client's subscriptions to `channel`.
    ///
    /// Receivers returned by [`subscribe`](Broker::subscribe) observe
    /// end-of-stream afterwards.
    async fn unsubscribe(&self, channel: &str) -> Result<(), BrokerError>;
}
