//! # Core watcher trait.
//!
//! `Watch` is the extension point for reacting to intent changes. Watchers
//! are registered on the [`WatchRegistry`](crate::WatchRegistry) — either for
//! every intent (`watch_all`) or for a single intent (`watch`) — and are
//! invoked from the hub's dispatcher task.
//!
//! ## Contract
//! - Dispatch is sequential and in registration order; keep `on_change`
//!   short. Long work belongs in a task the watcher spawns itself.
//! - A panicking watcher is isolated: the panic is caught, logged, and
//!   delivery continues with the next watcher.

use async_trait::async_trait;
use std::sync::Arc;

use crate::events::ChangeEvent;

/// Shared handle to a watcher.
pub type WatchRef = Arc<dyn Watch>;

/// Contract for intent-change watchers.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use intentwatch::{ChangeEvent, Watch};
///
/// struct Audit;
///
/// #[async_trait]
/// impl Watch for Audit {
///     async fn on_change(&self, event: &ChangeEvent) {
///         // record the transition...
///         let _ = event.intent_id();
///     }
///
///     fn name(&self) -> &str { "audit" }
/// }
/// ```
#[async_trait]
pub trait Watch: Send + Sync + 'static {
    /// Handles a single intent change.
    async fn on_change(&self, event: &ChangeEvent);

    /// Human-readable name (for logs).
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}
