//! # intentwatch
//!
//! **intentwatch** propagates payment-intent state changes across a cluster
//! and lets any part of a process watch them — or synchronously await a
//! payment reaching its terminal state.
//!
//! Webhooks for a long-lived payment land on *one* instance behind the load
//! balancer; every instance republishes what it observed to its peers over a
//! broker channel, deduplicates redundant deliveries, and drives a local
//! registry of watchers and terminal-state waiters.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   provider webhook (signature-verified, external)
//!        │
//!        ▼ emit_local(intent)
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Hub (explicit context object)                                    │
//! │  - Bus (broadcast change events)                                  │
//! │  - DedupTracker (bounded FIFO set of seen message ids)            │
//! │  - WatchRegistry (watchers + terminal waits)                      │
//! │  - ClusterRelay (bridge to the broker channel)                    │
//! └──────┬───────────────────────────────┬────────────────────────────┘
//!        │                               │
//!        ▼ dispatcher worker             ▼ relay outbound (local only)
//!   WatchRegistry::dispatch         fresh uuid ──► claim ──► publish
//!        │                               │
//!   ┌────┴─────────┬────────────┐        ▼
//!   ▼              ▼            ▼   broker channel "payment_intent.changes"
//! all-watchers  per-intent   pending     │
//! (local_only   watchers     waits       ▼ relay inbound (every instance)
//!  filter)      (GC'd on     (shared  deserialize ──► claim(messageId)
//!               terminal)    future)     ├─ duplicate ──► drop
//!                                        └─ novel ──► Bus (local=false)
//! ```
//!
//! ### Event lifecycle
//! ```text
//! webhook ──► emit_local ──► Bus ──► dispatch(event)
//!                             │        ├─► all-watchers (registration order)
//!                             │        ├─► watchers of event.intent_id
//!                             │        └─► terminal? resolve/reject wait,
//!                             │                      purge per-intent state
//!                             └─────► relay ──► cluster peers ──► their Bus
//!                                               (same dispatch, local=false)
//! ```
//!
//! ## Features
//! | Area            | Description                                                        | Key types / traits                  |
//! |-----------------|--------------------------------------------------------------------|-------------------------------------|
//! | **Watching**    | Observe every change, or a single intent's changes.                | [`Watch`], [`WatchFn`], [`WatchRef`]|
//! | **Waiting**     | Await a payment's terminal state; concurrent callers share a wait. | [`Hub::wait_for_terminal`]          |
//! | **Fan-out**     | Cluster-wide republication with echo/duplicate suppression.        | [`Broker`], [`WireMessage`], [`DedupTracker`] |
//! | **Payments**    | Initialize intents and complete charges idempotently.              | [`initialize_payment`], [`complete_payment`] |
//! | **Errors**      | Typed outcomes; cancellation distinct from faults.                 | [`WaitError`], [`HubError`]         |
//! | **Configuration** | Centralized runtime settings.                                    | [`HubConfig`]                       |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWatcher`] _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//!
//! use async_trait::async_trait;
//! use intentwatch::{
//!     ChangeEvent, Charge, ChargeParams, CreateIntentParams, Hub, HubConfig, IntentMetadata,
//!     IntentSnapshot, IntentStatus, MemoryBroker, ProviderClient, ProviderError, WatchFn,
//! };
//!
//! struct DemoProvider;
//!
//! #[async_trait]
//! impl ProviderClient for DemoProvider {
//!     async fn retrieve_intent(&self, intent_id: &str) -> Result<IntentSnapshot, ProviderError> {
//!         Ok(IntentSnapshot {
//!             id: intent_id.to_string(),
//!             status: IntentStatus::Succeeded,
//!             amount: 2500,
//!             currency: "usd".into(),
//!             metadata: IntentMetadata::default(),
//!             cancellation_reason: None,
//!         })
//!     }
//!
//!     async fn create_intent(
//!         &self,
//!         _params: CreateIntentParams,
//!     ) -> Result<IntentSnapshot, ProviderError> {
//!         Err(ProviderError::Api { message: "demo".into() })
//!     }
//!
//!     async fn create_charge(
//!         &self,
//!         _params: ChargeParams,
//!         _idempotency_key: &str,
//!     ) -> Result<Charge, ProviderError> {
//!         Err(ProviderError::Api { message: "demo".into() })
//!     }
//!
//!     async fn update_intent_metadata(
//!         &self,
//!         _intent_id: &str,
//!         _metadata: IntentMetadata,
//!     ) -> Result<(), ProviderError> {
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let hub = Hub::builder(HubConfig::default())
//!         .with_broker(Arc::new(MemoryBroker::new()))
//!         .with_provider(Arc::new(DemoProvider))
//!         .build()?;
//!     hub.start().await?;
//!
//!     // Observe every change in this process (and, via the relay, changes
//!     // observed by any cluster peer).
//!     hub.watch_all(
//!         WatchFn::arc("audit", |ev: ChangeEvent| async move {
//!             println!("{} -> {}", ev.intent_id(), ev.status().as_str());
//!         }),
//!         false,
//!     )
//!     .await;
//!
//!     // Webhook receiver path: one verified delivery, one local emit.
//!     hub.emit_local(IntentSnapshot {
//!         id: "pi_1".into(),
//!         status: IntentStatus::Succeeded,
//!         amount: 2500,
//!         currency: "usd".into(),
//!         metadata: IntentMetadata::default(),
//!         cancellation_reason: None,
//!     });
//!
//!     // Await the terminal state; an already-succeeded intent resolves
//!     // immediately from the provider pre-check.
//!     let done = hub.wait_for_terminal("pi_1").await?;
//!     assert_eq!(done.status(), IntentStatus::Succeeded);
//!
//!     hub.shutdown().await?;
//!     Ok(())
//! }
//! ```

mod broker;
mod core;
mod error;
mod events;
mod provider;
mod relay;
mod watchers;

// ---- Public re-exports ----

pub use broker::{Broker, MemoryBroker};
pub use core::{
    DedupTracker, Hub, HubBuilder, HubConfig, WaitOutcome, WatchRegistry, WatchToken,
    DEFAULT_CHANNEL,
};
pub use error::{BrokerError, HubError, PaymentError, ProviderError, WaitError};
pub use events::{Bus, ChangeEvent};
pub use provider::{
    complete_payment, initialize_payment, Charge, ChargeParams, CreateIntentParams, IntentMetadata,
    IntentSnapshot, IntentStatus, ProviderClient, SourceSnapshot, SourceStatus,
};
pub use relay::WireMessage;
pub use watchers::{Watch, WatchFn, WatchRef};

// Optional: expose a simple built-in logging watcher (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use watchers::LogWatcher;
