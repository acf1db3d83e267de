//! # Watch registry: the watch/wait surface over the change bus.
//!
//! The registry is the single consumer of change events (driven by the hub's
//! dispatcher worker) and owns three kinds of per-process state:
//!
//! - **all-watchers** — see every change, optionally local-only, live until
//!   explicitly unregistered via their [`WatchToken`];
//! - **per-intent watchers** — see one intent's changes; the whole set is
//!   purged when that intent reaches a terminal state;
//! - **pending waits** — at most one shared terminal-state future per
//!   intent, joined by every concurrent `wait_for_terminal` caller.
//!
//! ## Dispatch algorithm
//! ```text
//! dispatch(event):
//!   1. snapshot watcher handles (copy-before-iterate)
//!   2. deliver to all-watchers        (local_only filter, panic-isolated)
//!   3. deliver to per-intent watchers (panic-isolated)
//!   4. terminal status?
//!        ├─► remove per-intent watcher set and pending wait
//!        └─► resolve (succeeded) / reject (canceled) the wait
//! ```
//! Watchers are notified **before** teardown, so per-intent watchers observe
//! the terminal event itself. Once purged, later events for the same id (not
//! expected from a well-behaved provider) reach all-watchers only.
//!
//! ## Serialization
//! All state lives behind one `RwLock`; registration, dispatch mutation, and
//! wait creation are serialized relative to each other. Delivery itself runs
//! on a snapshot, outside the lock, so a slow watcher never holds the
//! registry.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use tokio::sync::{oneshot, RwLock};

use crate::error::WaitError;
use crate::events::ChangeEvent;
use crate::provider::{IntentStatus, ProviderClient};
use crate::watchers::WatchRef;

/// Outcome delivered to terminal-state waiters: the terminal event on
/// success, [`WaitError::Canceled`] on cancellation.
pub type WaitOutcome = Result<ChangeEvent, WaitError>;

/// The joinable wait future: resolves exactly once, clones share the result.
type SharedWait = Shared<BoxFuture<'static, WaitOutcome>>;

/// Registration handle returned by [`WatchRegistry::watch_all`].
///
/// Pass it back to [`WatchRegistry::unwatch_all`] to stop delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchToken(u64);

/// One `watch_all` registration.
struct AllWatcher {
    token: u64,
    /// When set, events with `local == false` are filtered out before
    /// delivery to this watcher.
    local_only: bool,
    watch: WatchRef,
}

/// The single outstanding terminal wait for one intent.
struct PendingWait {
    tx: oneshot::Sender<WaitOutcome>,
    shared: SharedWait,
}

struct RegistryState {
    next_token: u64,
    all: Vec<AllWatcher>,
    by_intent: HashMap<String, Vec<WatchRef>>,
    waits: HashMap<String, PendingWait>,
}

/// Process-wide registry of intent watchers and terminal waits.
///
/// Owned by the [`Hub`](crate::Hub). Watcher identities never leave the
/// process; peers only exchange change events.
pub struct WatchRegistry {
    provider: Arc<dyn ProviderClient>,
    state: RwLock<RegistryState>,
}

impl WatchRegistry {
    /// Creates an empty registry backed by the given provider capability.
    pub fn new(provider: Arc<dyn ProviderClient>) -> Self {
        Self {
            provider,
            state: RwLock::new(RegistryState {
                next_token: 0,
                all: Vec::new(),
                by_intent: HashMap::new(),
                waits: HashMap::new(),
            }),
        }
    }

    /// Registers `watch` for every change event.
    ///
    /// With `local_only`, events relayed from cluster peers are filtered out
    /// before delivery. Registering the same watcher twice yields duplicate
    /// delivery: each registration is an independent handle.
    pub async fn watch_all(&self, watch: WatchRef, local_only: bool) -> WatchToken {
        let mut state = self.state.write().await;
        let token = state.next_token;
        state.next_token += 1;
        state.all.push(AllWatcher {
            token,
            local_only,
            watch,
        });
        WatchToken(token)
    }

    /// Removes a `watch_all` registration.
    ///
    /// Returns true if the token was registered.
    pub async fn unwatch_all(&self, token: WatchToken) -> bool {
        let mut state = self.state.write().await;
        let before = state.all.len();
        state.all.retain(|w| w.token != token.0);
        state.all.len() != before
    }

    /// Registers `watch` for changes of a single intent, local and remote.
    ///
    /// The registration lives until the intent reaches a terminal state, at
    /// which point the whole per-intent set is removed (after delivering the
    /// terminal event itself).
    pub async fn watch(&self, intent_id: &str, watch: WatchRef) {
        let mut state = self.state.write().await;
        state
            .by_intent
            .entry(intent_id.to_string())
            .or_default()
            .push(watch);
    }

    /// Waits until the intent reaches a terminal state.
    ///
    /// - Already `succeeded` at the provider → resolves immediately.
    /// - Already `canceled` → rejects immediately with the stored reason.
    /// - Provider lookup fails → [`WaitError::Provider`] (no fallback wait).
    /// - Otherwise joins the single pending wait for this intent: every
    ///   concurrent caller awaits the same future and observes the same
    ///   outcome when the terminal event arrives.
    ///
    /// There is no built-in timeout; an intent that never terminates leaves
    /// its waiters pending. Callers impose their own deadline, e.g. with
    /// `tokio::time::timeout`.
    pub async fn wait_for_terminal(&self, intent_id: &str) -> WaitOutcome {
        let snapshot = self.provider.retrieve_intent(intent_id).await?;
        match snapshot.status {
            IntentStatus::Succeeded => return Ok(ChangeEvent::local(snapshot)),
            IntentStatus::Canceled => {
                return Err(WaitError::Canceled {
                    reason: snapshot.cancellation_reason,
                })
            }
            _ => {}
        }

        let shared = {
            let mut state = self.state.write().await;
            match state.waits.get(intent_id) {
                Some(wait) => wait.shared.clone(),
                None => {
                    let (tx, rx) = oneshot::channel::<WaitOutcome>();
                    let shared: SharedWait = async move {
                        match rx.await {
                            Ok(outcome) => outcome,
                            // Sender dropped without resolving: registry gone.
                            Err(_) => Err(WaitError::Closed),
                        }
                    }
                    .boxed()
                    .shared();
                    state.waits.insert(
                        intent_id.to_string(),
                        PendingWait {
                            tx,
                            shared: shared.clone(),
                        },
                    );
                    shared
                }
            }
        };
        shared.await
    }

    /// Delivers one change event to watchers and terminal waiters.
    ///
    /// Called from the hub's dispatcher worker; never concurrently with
    /// itself, which is what gives per-intent delivery ordering.
    pub(crate) async fn dispatch(&self, event: &ChangeEvent) {
        let (all, per_intent) = {
            let state = self.state.read().await;
            let all: Vec<WatchRef> = state
                .all
                .iter()
                .filter(|w| !w.local_only || event.local)
                .map(|w| Arc::clone(&w.watch))
                .collect();
            let per_intent: Vec<WatchRef> = state
                .by_intent
                .get(event.intent_id())
                .map(|ws| ws.to_vec())
                .unwrap_or_default();
            (all, per_intent)
        };

        for watch in &all {
            Self::deliver(watch, event).await;
        }
        for watch in &per_intent {
            Self::deliver(watch, event).await;
        }

        if event.is_terminal() {
            let wait = {
                let mut state = self.state.write().await;
                state.by_intent.remove(event.intent_id());
                state.waits.remove(event.intent_id())
            };
            if let Some(wait) = wait {
                // No waiter left alive is fine; the outcome is then dropped.
                let _ = wait.tx.send(Self::terminal_outcome(event));
            }
        }
    }

    /// Intent ids with at least one per-intent watcher, sorted.
    pub async fn watched_intents(&self) -> Vec<String> {
        let state = self.state.read().await;
        let mut ids: Vec<String> = state.by_intent.keys().cloned().collect();
        ids.sort_unstable();
        ids
    }

    /// Returns true if a terminal wait is currently pending for `intent_id`.
    pub async fn has_pending_wait(&self, intent_id: &str) -> bool {
        self.state.read().await.waits.contains_key(intent_id)
    }

    fn terminal_outcome(event: &ChangeEvent) -> WaitOutcome {
        match event.status() {
            IntentStatus::Canceled => Err(WaitError::Canceled {
                reason: event.intent.cancellation_reason.clone(),
            }),
            _ => Ok(event.clone()),
        }
    }

    /// Invokes one watcher, isolating panics so a faulty watcher cannot
    /// break delivery to the others.
    async fn deliver(watch: &WatchRef, event: &ChangeEvent) {
        let fut = watch.on_change(event);
        if let Err(panic_err) = std::panic::AssertUnwindSafe(fut).catch_unwind().await {
            let info = {
                let any = &*panic_err;
                if let Some(msg) = any.downcast_ref::<&'static str>() {
                    (*msg).to_string()
                } else if let Some(msg) = any.downcast_ref::<String>() {
                    msg.clone()
                } else {
                    "unknown panic".to_string()
                }
            };
            tracing::warn!(watcher = watch.name(), panic = %info, "watcher panicked during dispatch");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::error::ProviderError;
    use crate::provider::{
        Charge, ChargeParams, CreateIntentParams, IntentMetadata, IntentSnapshot,
    };
    use crate::watchers::Watch;

    /// Provider stub serving configured snapshots by intent id.
    struct StubProvider {
        intents: Mutex<HashMap<String, IntentSnapshot>>,
    }

    impl StubProvider {
        fn empty() -> Arc<Self> {
            Arc::new(Self {
                intents: Mutex::new(HashMap::new()),
            })
        }

        fn with(intent: IntentSnapshot) -> Arc<Self> {
            let stub = Self::empty();
            stub.intents
                .lock()
                .unwrap()
                .insert(intent.id.clone(), intent);
            stub
        }
    }

    #[async_trait]
    impl ProviderClient for StubProvider {
        async fn retrieve_intent(&self, intent_id: &str) -> Result<IntentSnapshot, ProviderError> {
            self.intents
                .lock()
                .unwrap()
                .get(intent_id)
                .cloned()
                .ok_or_else(|| ProviderError::Transport {
                    message: "stub has no such intent".to_string(),
                })
        }

        async fn create_intent(
            &self,
            _params: CreateIntentParams,
        ) -> Result<IntentSnapshot, ProviderError> {
            unimplemented!("not used by registry tests")
        }

        async fn create_charge(
            &self,
            _params: ChargeParams,
            _idempotency_key: &str,
        ) -> Result<Charge, ProviderError> {
            unimplemented!("not used by registry tests")
        }

        async fn update_intent_metadata(
            &self,
            _intent_id: &str,
            _metadata: IntentMetadata,
        ) -> Result<(), ProviderError> {
            unimplemented!("not used by registry tests")
        }
    }

    /// Watcher that counts deliveries and remembers the last event.
    #[derive(Default)]
    struct CountingWatch {
        hits: AtomicUsize,
        last: Mutex<Option<ChangeEvent>>,
    }

    impl CountingWatch {
        fn arc() -> Arc<Self> {
            Arc::new(Self::default())
        }

        fn hits(&self) -> usize {
            self.hits.load(AtomicOrdering::SeqCst)
        }
    }

    #[async_trait]
    impl Watch for CountingWatch {
        async fn on_change(&self, event: &ChangeEvent) {
            self.hits.fetch_add(1, AtomicOrdering::SeqCst);
            *self.last.lock().unwrap() = Some(event.clone());
        }

        fn name(&self) -> &str {
            "counting"
        }
    }

    /// Watcher that always panics.
    struct PanickyWatch;

    #[async_trait]
    impl Watch for PanickyWatch {
        async fn on_change(&self, _event: &ChangeEvent) {
            panic!("boom");
        }

        fn name(&self) -> &str {
            "panicky"
        }
    }

    fn snapshot(id: &str, status: IntentStatus) -> IntentSnapshot {
        IntentSnapshot {
            id: id.to_string(),
            status,
            amount: 100,
            currency: "usd".to_string(),
            metadata: IntentMetadata::default(),
            cancellation_reason: None,
        }
    }

    fn canceled_snapshot(id: &str, reason: &str) -> IntentSnapshot {
        IntentSnapshot {
            cancellation_reason: Some(reason.to_string()),
            ..snapshot(id, IntentStatus::Canceled)
        }
    }

    fn registry() -> Arc<WatchRegistry> {
        Arc::new(WatchRegistry::new(StubProvider::empty()))
    }

    async fn wait_until_pending(registry: &WatchRegistry, intent_id: &str) {
        for _ in 0..200 {
            if registry.has_pending_wait(intent_id).await {
                return;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        panic!("wait for {intent_id} never registered");
    }

    #[tokio::test]
    async fn test_watch_all_receives_every_event() {
        let registry = registry();
        let watch = CountingWatch::arc();
        registry.watch_all(watch.clone(), false).await;

        registry
            .dispatch(&ChangeEvent::local(snapshot("pi_1", IntentStatus::Pending)))
            .await;
        registry
            .dispatch(&ChangeEvent::remote(snapshot("pi_2", IntentStatus::Processing)))
            .await;

        assert_eq!(watch.hits(), 2);
    }

    #[tokio::test]
    async fn test_local_only_filters_remote_events() {
        let registry = registry();
        let watch = CountingWatch::arc();
        registry.watch_all(watch.clone(), true).await;

        registry
            .dispatch(&ChangeEvent::remote(snapshot("pi_1", IntentStatus::Pending)))
            .await;
        assert_eq!(watch.hits(), 0);

        registry
            .dispatch(&ChangeEvent::local(snapshot("pi_1", IntentStatus::Pending)))
            .await;
        assert_eq!(watch.hits(), 1);
    }

    #[tokio::test]
    async fn test_unwatch_all_stops_delivery() {
        let registry = registry();
        let watch = CountingWatch::arc();
        let token = registry.watch_all(watch.clone(), false).await;

        registry
            .dispatch(&ChangeEvent::local(snapshot("pi_1", IntentStatus::Pending)))
            .await;
        assert!(registry.unwatch_all(token).await);
        registry
            .dispatch(&ChangeEvent::local(snapshot("pi_1", IntentStatus::Pending)))
            .await;

        assert_eq!(watch.hits(), 1);
        // Second removal of the same token is a no-op.
        assert!(!registry.unwatch_all(token).await);
    }

    #[tokio::test]
    async fn test_watch_receives_only_its_intent() {
        let registry = registry();
        let watch = CountingWatch::arc();
        registry.watch("pi_1", watch.clone()).await;

        registry
            .dispatch(&ChangeEvent::local(snapshot("pi_2", IntentStatus::Pending)))
            .await;
        assert_eq!(watch.hits(), 0);

        registry
            .dispatch(&ChangeEvent::remote(snapshot("pi_1", IntentStatus::Pending)))
            .await;
        assert_eq!(watch.hits(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_registration_double_delivers() {
        let registry = registry();
        let watch = CountingWatch::arc();
        registry.watch("pi_1", watch.clone()).await;
        registry.watch("pi_1", watch.clone()).await;

        registry
            .dispatch(&ChangeEvent::local(snapshot("pi_1", IntentStatus::Pending)))
            .await;
        assert_eq!(watch.hits(), 2);
    }

    #[tokio::test]
    async fn test_terminal_purges_per_intent_state() {
        let registry = registry();
        let all = CountingWatch::arc();
        let per = CountingWatch::arc();
        registry.watch_all(all.clone(), false).await;
        registry.watch("pi_1", per.clone()).await;

        registry
            .dispatch(&ChangeEvent::local(snapshot("pi_1", IntentStatus::Succeeded)))
            .await;

        // The per-intent watcher observed the terminal event itself...
        assert_eq!(per.hits(), 1);
        assert!(per.last.lock().unwrap().as_ref().unwrap().is_terminal());
        // ...and its set is gone.
        assert!(registry.watched_intents().await.is_empty());

        // A straggler event for the purged id reaches all-watchers only.
        registry
            .dispatch(&ChangeEvent::local(snapshot("pi_1", IntentStatus::Succeeded)))
            .await;
        assert_eq!(per.hits(), 1);
        assert_eq!(all.hits(), 2);
    }

    #[tokio::test]
    async fn test_panicking_watcher_does_not_block_others() {
        let registry = registry();
        let survivor = CountingWatch::arc();
        registry.watch_all(Arc::new(PanickyWatch), false).await;
        registry.watch_all(survivor.clone(), false).await;

        registry
            .dispatch(&ChangeEvent::local(snapshot("pi_1", IntentStatus::Succeeded)))
            .await;

        assert_eq!(survivor.hits(), 1);
    }

    #[tokio::test]
    async fn test_wait_resolves_on_success_event() {
        let registry = Arc::new(WatchRegistry::new(StubProvider::with(snapshot(
            "pi_1",
            IntentStatus::Pending,
        ))));
        let waiter = {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move { registry.wait_for_terminal("pi_1").await })
        };
        wait_until_pending(&registry, "pi_1").await;

        registry
            .dispatch(&ChangeEvent::local(snapshot("pi_1", IntentStatus::Succeeded)))
            .await;

        let outcome = waiter.await.unwrap().expect("must resolve");
        assert_eq!(outcome.intent_id(), "pi_1");
        assert_eq!(outcome.status(), IntentStatus::Succeeded);
        assert!(!registry.has_pending_wait("pi_1").await);
    }

    #[tokio::test]
    async fn test_wait_rejects_on_cancellation_with_reason() {
        let registry = Arc::new(WatchRegistry::new(StubProvider::with(snapshot(
            "pi_1",
            IntentStatus::Pending,
        ))));
        let waiter = {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move { registry.wait_for_terminal("pi_1").await })
        };
        wait_until_pending(&registry, "pi_1").await;

        registry
            .dispatch(&ChangeEvent::local(canceled_snapshot("pi_1", "fraudulent")))
            .await;

        let err = waiter.await.unwrap().expect_err("must reject");
        match err {
            WaitError::Canceled { reason } => assert_eq!(reason.as_deref(), Some("fraudulent")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_join_semantics_share_one_outcome() {
        let registry = Arc::new(WatchRegistry::new(StubProvider::with(snapshot(
            "pi_1",
            IntentStatus::Pending,
        ))));
        let spawn_waiter = |registry: &Arc<WatchRegistry>| {
            let registry = Arc::clone(registry);
            tokio::spawn(async move { registry.wait_for_terminal("pi_1").await })
        };
        let a = spawn_waiter(&registry);
        let b = spawn_waiter(&registry);
        wait_until_pending(&registry, "pi_1").await;

        registry
            .dispatch(&ChangeEvent::local(snapshot("pi_1", IntentStatus::Succeeded)))
            .await;

        let ra = a.await.unwrap().expect("first waiter resolves");
        let rb = b.await.unwrap().expect("second waiter resolves");
        assert_eq!(ra.seq, rb.seq); // literally the same event
    }

    #[tokio::test]
    async fn test_immediate_resolution_when_already_succeeded() {
        let provider = StubProvider::with(snapshot("pi_1", IntentStatus::Succeeded));
        let registry = WatchRegistry::new(provider);

        let outcome = registry.wait_for_terminal("pi_1").await.expect("resolves");
        assert_eq!(outcome.status(), IntentStatus::Succeeded);
        assert!(!registry.has_pending_wait("pi_1").await);
    }

    #[tokio::test]
    async fn test_immediate_rejection_when_already_canceled() {
        let provider = StubProvider::with(canceled_snapshot("pi_1", "expired"));
        let registry = WatchRegistry::new(provider);

        let err = registry
            .wait_for_terminal("pi_1")
            .await
            .expect_err("must reject");
        assert!(err.is_canceled());
        match err {
            WaitError::Canceled { reason } => assert_eq!(reason.as_deref(), Some("expired")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_provider_failure_propagates() {
        let registry = registry(); // stub knows no intents
        let err = registry
            .wait_for_terminal("pi_missing")
            .await
            .expect_err("must fail");
        assert!(matches!(err, WaitError::Provider(_)));
        assert!(!err.is_canceled());
    }
}
