//! # Cluster relay: bridges the change bus to the broker channel.
//!
//! The relay makes one process's locally-observed changes visible to every
//! peer instance, idempotently:
//!
//! ```text
//! outbound:  Bus (local=true) ──► fresh message id ──► claim ──► broker.publish
//! inbound:   broker message ──► deserialize ──► claim(messageId)
//!                                  │                  ├─ true  ──► Bus (local=false)
//!                                  └─ malformed: drop └─ false ──► drop (duplicate)
//! ```
//!
//! Claiming the fresh id *before* publishing is what suppresses the echo
//! loop: when the broker delivers the relay's own publish back to this
//! process, the inbound claim loses and the message is dropped.
//!
//! ## Rules
//! - Only `local == true` events are relayed; re-publishing remote events
//!   would loop them through the cluster forever.
//! - Publish and serialize failures are logged, never retried; cluster
//!   delivery is best-effort (at-least-once overall, via provider webhook
//!   redelivery, not via the relay).
//! - Subscribe/unsubscribe are symmetric: `stop` unsubscribes exactly once
//!   if and only if `start`'s subscribe succeeded.

use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::broker::Broker;
use crate::core::DedupTracker;
use crate::error::BrokerError;
use crate::events::{Bus, ChangeEvent};
use crate::relay::wire::WireMessage;

/// Bridges the process-local [`Bus`] to a cluster-wide broker channel.
pub(crate) struct ClusterRelay {
    channel: String,
    bus: Bus,
    tracker: Arc<DedupTracker>,
    broker: Arc<dyn Broker>,
    subscribed: AtomicBool,
}

impl ClusterRelay {
    pub(crate) fn new(
        channel: impl Into<String>,
        bus: Bus,
        tracker: Arc<DedupTracker>,
        broker: Arc<dyn Broker>,
    ) -> Arc<Self> {
        Arc::new(Self {
            channel: channel.into(),
            bus,
            tracker,
            broker,
            subscribed: AtomicBool::new(false),
        })
    }

    /// Subscribes to the broker channel and spawns the inbound and outbound
    /// workers.
    ///
    /// The caller is expected to hand over a broker whose connection is
    /// already established; a refused subscription surfaces as an error and
    /// leaves the relay inert.
    pub(crate) async fn start(
        self: Arc<Self>,
        token: CancellationToken,
    ) -> Result<Vec<JoinHandle<()>>, BrokerError> {
        let inbound_rx = self.broker.subscribe(&self.channel).await?;
        self.subscribed.store(true, AtomicOrdering::SeqCst);
        // Subscribe to the bus before spawning, so no event published after
        // start() returns can be missed.
        let outbound_rx = self.bus.subscribe();

        let inbound = {
            let me = Arc::clone(&self);
            let token = token.clone();
            tokio::spawn(async move { me.run_inbound(inbound_rx, token).await })
        };
        let outbound = tokio::spawn(async move { self.run_outbound(outbound_rx, token).await });
        Ok(vec![inbound, outbound])
    }

    /// Tears the broker subscription down, exactly once.
    pub(crate) async fn stop(&self) {
        if self.subscribed.swap(false, AtomicOrdering::SeqCst) {
            if let Err(err) = self.broker.unsubscribe(&self.channel).await {
                tracing::warn!(channel = %self.channel, error = %err, "relay unsubscribe failed");
            }
        }
    }

    /// Drains inbound broker messages until cancellation or end-of-stream.
    async fn run_inbound(
        &self,
        mut rx: tokio::sync::mpsc::Receiver<String>,
        token: CancellationToken,
    ) {
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                msg = rx.recv() => match msg {
                    Some(payload) => self.accept_remote(&payload).await,
                    None => break,
                }
            }
        }
    }

    /// Forwards local bus events to the broker until cancellation.
    async fn run_outbound(
        &self,
        mut rx: broadcast::Receiver<ChangeEvent>,
        token: CancellationToken,
    ) {
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                msg = rx.recv() => match msg {
                    Ok(ev) if ev.local => self.relay_local(&ev).await,
                    Ok(_) => {} // remote events are never re-published
                    Err(broadcast::error::RecvError::Closed) => break,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "relay outbound lagged behind the bus");
                    }
                }
            }
        }
    }

    /// Publishes one locally-observed event to the cluster.
    async fn relay_local(&self, event: &ChangeEvent) {
        let message_id = Uuid::new_v4().to_string();
        // Fresh id: the claim always wins; recording it is what suppresses
        // the broker echo on the inbound path.
        let _ = self.tracker.claim(&message_id).await;

        let msg = WireMessage {
            message_id,
            payment_intent: event.intent.clone(),
        };
        let payload = match serde_json::to_string(&msg) {
            Ok(payload) => payload,
            Err(err) => {
                tracing::warn!(intent = event.intent_id(), error = %err, "failed to encode relay message");
                return;
            }
        };
        if let Err(err) = self.broker.publish(&self.channel, &payload).await {
            tracing::warn!(
                channel = %self.channel,
                intent = event.intent_id(),
                error = %err,
                "relay publish failed (not retried)"
            );
        }
    }

    /// Handles one inbound broker payload.
    async fn accept_remote(&self, payload: &str) {
        let msg: WireMessage = match serde_json::from_str(payload) {
            Ok(msg) => msg,
            Err(err) => {
                tracing::warn!(error = %err, "malformed cluster message dropped");
                return;
            }
        };
        if self.tracker.claim(&msg.message_id).await {
            self.bus.publish(ChangeEvent::remote(msg.payment_intent));
        } else {
            tracing::trace!(message_id = %msg.message_id, "duplicate cluster message dropped");
        }
    }
}
