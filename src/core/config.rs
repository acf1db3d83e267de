//! # Global hub configuration.
//!
//! Provides [`HubConfig`], the centralized settings for one hub instance.
//!
//! ## Field semantics
//! - `channel`: broker channel the cluster relay publishes to and consumes
//!   from — every instance of one deployment must use the same name.
//! - `bus_capacity`: change-bus ring buffer size (min 1; clamped).
//! - `dedup_capacity`: how many recently-seen message ids are retained (min
//!   1; clamped). Oldest ids are evicted FIFO beyond this.
//! - `grace`: maximum wait for worker tasks to stop during shutdown.

use std::time::Duration;

/// Default broker channel for intent change fan-out.
pub const DEFAULT_CHANNEL: &str = "payment_intent.changes";

/// Global configuration for a [`Hub`](crate::Hub).
///
/// All fields are public for flexibility. Prefer the clamping accessors over
/// re-checking bounds at use sites.
#[derive(Clone, Debug)]
pub struct HubConfig {
    /// Broker channel name for cluster fan-out.
    pub channel: String,

    /// Capacity of the change-bus broadcast ring buffer.
    ///
    /// Consumers that lag behind more than `bus_capacity` events observe
    /// `Lagged` and skip older items. Minimum value is 1 (enforced by the bus).
    pub bus_capacity: usize,

    /// Maximum number of recently-seen cluster message ids retained for
    /// dedup. Beyond it the oldest claimed id is evicted (FIFO).
    pub dedup_capacity: usize,

    /// Maximum time to wait for worker tasks during [`Hub::shutdown`](crate::Hub::shutdown)
    /// before giving up with `GraceExceeded`.
    pub grace: Duration,
}

impl HubConfig {
    /// Bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Dedup capacity clamped to a minimum of 1.
    #[inline]
    pub fn dedup_capacity_clamped(&self) -> usize {
        self.dedup_capacity.max(1)
    }
}

impl Default for HubConfig {
    /// Default configuration:
    ///
    /// - `channel = "payment_intent.changes"`
    /// - `bus_capacity = 1024`
    /// - `dedup_capacity = 1000` (the fan-out layer's memory bound)
    /// - `grace = 5s`
    fn default() -> Self {
        Self {
            channel: DEFAULT_CHANNEL.to_string(),
            bus_capacity: 1024,
            dedup_capacity: 1000,
            grace: Duration::from_secs(5),
        }
    }
}
