//! # Hub: the explicitly-constructed context that owns the whole subsystem.
//!
//! One [`Hub`] per process replaces module-level singletons: it owns the
//! change bus, the dedup tracker, the watch registry, and the cluster relay,
//! and wires them together at start. The webhook receiver and application
//! code hold a shared handle (`Arc<Hub>`) and never touch the internals.
//!
//! ## High-level architecture
//! ```text
//! Inputs:
//!   webhook receiver ──► emit_local(intent)        application ──► watch_all / watch /
//!                                                                  wait_for_terminal
//!
//! Wiring (start()):
//!   Bus ──► dispatcher worker ──► WatchRegistry::dispatch ──► watchers + waits
//!    │
//!    └────► relay outbound ──► uuid + claim ──► Broker::publish ──► cluster peers
//!
//!   Broker subscription ──► relay inbound ──► claim(messageId)
//!                                               └─ novel ──► Bus (local=false)
//!
//! Shutdown path (shutdown()):
//!   runtime_token.cancel()
//!      └─► relay.stop()            (symmetric unsubscribe)
//!      └─► join workers, up to cfg.grace → HubError::GraceExceeded
//! ```
//!
//! ## Lifecycle
//! `build → start → shutdown`, once each. `start` on a running hub returns
//! [`HubError::AlreadyStarted`]; a hub that failed to start (broker refused
//! the subscription) may be started again.
//!
//! ## Example
//! ```rust,ignore
//! let hub = Hub::builder(HubConfig::default())
//!     .with_broker(broker)
//!     .with_provider(provider)
//!     .build()?;
//! hub.start().await?;
//!
//! hub.watch_all(WatchFn::arc("audit", |ev| async move {
//!     println!("{} -> {}", ev.intent_id(), ev.status().as_str());
//! }), false).await;
//!
//! // webhook receiver, once per verified delivery:
//! hub.emit_local(intent_snapshot);
//!
//! // synchronous interest in one payment:
//! let done = hub.wait_for_terminal("pi_1").await?;
//! ```

use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::core::config::HubConfig;
use crate::core::dedup::DedupTracker;
use crate::core::registry::{WaitOutcome, WatchRegistry, WatchToken};
use crate::error::{HubError, ProviderError};
use crate::events::{Bus, ChangeEvent};
use crate::provider::{charge_for_source, Charge, IntentSnapshot, ProviderClient, SourceSnapshot};
use crate::relay::ClusterRelay;
use crate::watchers::WatchRef;

use super::builder::HubBuilder;

/// Coordinates change propagation, cluster fan-out, and the watch/wait
/// surface for one process.
pub struct Hub {
    cfg: HubConfig,
    bus: Bus,
    tracker: Arc<DedupTracker>,
    registry: Arc<WatchRegistry>,
    relay: Arc<ClusterRelay>,
    provider: Arc<dyn ProviderClient>,
    runtime_token: CancellationToken,
    started: AtomicBool,
    workers: tokio::sync::Mutex<Vec<JoinHandle<()>>>,
}

impl Hub {
    /// Returns a builder for assembling a hub.
    pub fn builder(cfg: HubConfig) -> HubBuilder {
        HubBuilder::new(cfg)
    }

    pub(crate) fn new_internal(
        cfg: HubConfig,
        bus: Bus,
        tracker: Arc<DedupTracker>,
        registry: Arc<WatchRegistry>,
        relay: Arc<ClusterRelay>,
        provider: Arc<dyn ProviderClient>,
    ) -> Self {
        Self {
            cfg,
            bus,
            tracker,
            registry,
            relay,
            provider,
            runtime_token: CancellationToken::new(),
            started: AtomicBool::new(false),
            workers: tokio::sync::Mutex::new(Vec::new()),
        }
    }

    /// Starts the runtime workers: relay (broker subscribe + inbound +
    /// outbound) and the registry dispatcher.
    ///
    /// Requires the injected broker to be connected; a refused subscription
    /// surfaces as [`HubError::Broker`] and leaves the hub stopped.
    pub async fn start(&self) -> Result<(), HubError> {
        if self.started.swap(true, AtomicOrdering::SeqCst) {
            return Err(HubError::AlreadyStarted);
        }

        let relay = Arc::clone(&self.relay);
        let relay_workers = match relay.start(self.runtime_token.clone()).await {
            Ok(workers) => workers,
            Err(err) => {
                self.started.store(false, AtomicOrdering::SeqCst);
                return Err(HubError::Broker(err));
            }
        };

        let mut workers = self.workers.lock().await;
        workers.push(self.spawn_dispatcher());
        workers.extend(relay_workers);
        tracing::debug!(channel = %self.cfg.channel, "hub started");
        Ok(())
    }

    /// Stops the hub: cancels the workers, unsubscribes from the broker, and
    /// joins everything within the configured grace window.
    pub async fn shutdown(&self) -> Result<(), HubError> {
        self.runtime_token.cancel();
        self.relay.stop().await;

        let workers: Vec<JoinHandle<()>> = self.workers.lock().await.drain(..).collect();
        let grace = self.cfg.grace;
        let join_all = async {
            for handle in workers {
                let _ = handle.await;
            }
        };
        match tokio::time::timeout(grace, join_all).await {
            Ok(()) => {
                tracing::debug!("hub stopped");
                Ok(())
            }
            Err(_) => Err(HubError::GraceExceeded { grace }),
        }
    }

    /// Publishes a locally-observed intent change.
    ///
    /// This is the webhook receiver's entry point: call it **exactly once**
    /// per distinct, signature-verified delivery. Downstream it reaches every
    /// watcher in this process and, via the relay, every cluster peer.
    pub fn emit_local(&self, intent: IntentSnapshot) {
        self.bus.publish(ChangeEvent::local(intent));
    }

    /// Registers a watcher for every intent change.
    /// See [`WatchRegistry::watch_all`].
    pub async fn watch_all(&self, watch: WatchRef, local_only: bool) -> WatchToken {
        self.registry.watch_all(watch, local_only).await
    }

    /// Removes a `watch_all` registration.
    /// See [`WatchRegistry::unwatch_all`].
    pub async fn unwatch_all(&self, token: WatchToken) -> bool {
        self.registry.unwatch_all(token).await
    }

    /// Registers a watcher for a single intent.
    /// See [`WatchRegistry::watch`].
    pub async fn watch(&self, intent_id: &str, watch: WatchRef) {
        self.registry.watch(intent_id, watch).await
    }

    /// Waits for an intent to reach a terminal state.
    /// See [`WatchRegistry::wait_for_terminal`].
    pub async fn wait_for_terminal(&self, intent_id: &str) -> WaitOutcome {
        self.registry.wait_for_terminal(intent_id).await
    }

    /// Settles a payment for a `source.chargeable` webhook delivery.
    ///
    /// Resolves the intent from the source, applies the skip rules (already
    /// terminal / already charged / not chargeable / no intent named), and
    /// creates the charge idempotently. Runs against the provider only —
    /// independent of bus dispatch, so a slow provider call here never stalls
    /// delivery of unrelated events.
    pub async fn ingest_chargeable_source(
        &self,
        source: &SourceSnapshot,
    ) -> Result<Option<Charge>, ProviderError> {
        charge_for_source(self.provider.as_ref(), source).await
    }

    /// The process-wide change bus.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// The watch registry (introspection helpers live here).
    pub fn registry(&self) -> &WatchRegistry {
        &self.registry
    }

    /// This hub's configuration.
    pub fn config(&self) -> &HubConfig {
        &self.cfg
    }

    /// Subscribes the registry to the bus and forwards every event into
    /// [`WatchRegistry::dispatch`]. Single consumer: dispatch is never run
    /// concurrently with itself, which preserves per-intent ordering.
    fn spawn_dispatcher(&self) -> JoinHandle<()> {
        let mut rx = self.bus.subscribe();
        let registry = Arc::clone(&self.registry);
        let token = self.runtime_token.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    msg = rx.recv() => match msg {
                        Ok(ev) => registry.dispatch(&ev).await,
                        Err(broadcast::error::RecvError::Closed) => break,
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "registry dispatcher lagged behind the bus");
                        }
                    }
                }
            }
        })
    }

    #[cfg(test)]
    pub(crate) fn dedup(&self) -> &DedupTracker {
        &self.tracker
    }
}
