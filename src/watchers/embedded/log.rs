//! # LogWatcher — simple change printer.
//!
//! A minimal watcher that prints incoming [`ChangeEvent`]s to stdout.
//! Use it for tests or demos.
//!
//! ## Example output
//! ```text
//! [intent-changed] intent="pi_1" status=processing local=true
//! [intent-changed] intent="pi_1" status=succeeded local=false payload="order-42"
//! [intent-changed] intent="pi_2" status=canceled local=true reason="requested_by_customer"
//! ```

use async_trait::async_trait;

use crate::events::ChangeEvent;
use crate::watchers::watch::Watch;

/// Change printer watcher.
#[derive(Default)]
pub struct LogWatcher;

impl LogWatcher {
    /// Construct a new [`LogWatcher`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Watch for LogWatcher {
    async fn on_change(&self, e: &ChangeEvent) {
        let mut line = format!(
            "[intent-changed] intent={:?} status={} local={}",
            e.intent_id(),
            e.status().as_str(),
            e.local
        );
        if let Some(payload) = e.payload_id() {
            line.push_str(&format!(" payload={payload:?}"));
        }
        if let Some(reason) = e.cancellation_reason() {
            line.push_str(&format!(" reason={reason:?}"));
        }
        println!("{line}");
    }

    fn name(&self) -> &str {
        "LogWatcher"
    }
}
