//! # Function-backed watcher (`WatchFn`).
//!
//! [`WatchFn`] wraps a closure `F: Fn(ChangeEvent) -> Fut`, producing a fresh
//! future per delivery. State shared between deliveries goes through an
//! explicit `Arc<...>` captured by the closure.
//!
//! ## Example
//! ```rust
//! use intentwatch::{ChangeEvent, WatchFn, WatchRef};
//!
//! let w: WatchRef = WatchFn::arc("audit", |event: ChangeEvent| async move {
//!     println!("{} -> {}", event.intent_id(), event.status().as_str());
//! });
//!
//! assert_eq!(w.name(), "audit");
//! ```

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::events::ChangeEvent;
use crate::watchers::watch::Watch;

/// Function-backed watcher implementation.
///
/// Wraps a closure that *creates* a new future per delivery. The event is
/// passed by value so the future is `'static` and may outlive the borrow.
#[derive(Debug)]
pub struct WatchFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> WatchFn<F> {
    /// Creates a new function-backed watcher.
    ///
    /// Prefer [`WatchFn::arc`] when you immediately need a [`WatchRef`](crate::WatchRef).
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Creates the watcher and returns it as a shared handle (`Arc<dyn Watch>`).
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

#[async_trait]
impl<F, Fut> Watch for WatchFn<F>
where
    F: Fn(ChangeEvent) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    async fn on_change(&self, event: &ChangeEvent) {
        (self.f)(event.clone()).await;
    }

    fn name(&self) -> &str {
        &self.name
    }
}
