//! Error types used by the intentwatch runtime.
//!
//! This module defines the error taxonomy of the crate:
//!
//! - [`HubError`] — errors raised by the orchestration context itself.
//! - [`BrokerError`] — broker transport failures (publish/subscribe/unsubscribe).
//! - [`ProviderError`] — failures of the payment-provider capability.
//! - [`WaitError`] — outcome of a terminal-state wait. A canceled intent is an
//!   **expected** outcome here and stays distinguishable from transport or
//!   provider faults.
//! - [`PaymentError`] — charge-completion failures.
//!
//! All enums are `Clone` so outcomes can flow through shared futures, and the
//! ones that show up in logs provide `as_label()` helpers.

use std::time::Duration;
use thiserror::Error;

/// # Errors produced by the hub runtime.
///
/// These represent failures of the orchestration context itself: bad wiring,
/// double start, a broker that refuses the relay subscription, or a shutdown
/// that exceeded its grace window.
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum HubError {
    /// The builder was finalized without a required collaborator.
    #[error("hub is misconfigured: {message}")]
    Config {
        /// What is missing or inconsistent.
        message: String,
    },

    /// `start()` was called on a hub that is already running.
    #[error("hub already started")]
    AlreadyStarted,

    /// The broker rejected a relay operation during start/stop.
    #[error("broker failure: {0}")]
    Broker(#[from] BrokerError),

    /// Shutdown grace period was exceeded; some worker tasks were still running.
    #[error("shutdown grace {grace:?} exceeded; worker tasks still running")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
    },
}

impl HubError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            HubError::Config { .. } => "hub_config",
            HubError::AlreadyStarted => "hub_already_started",
            HubError::Broker(_) => "hub_broker",
            HubError::GraceExceeded { .. } => "hub_grace_exceeded",
        }
    }
}

/// # Errors produced by the broker transport.
///
/// Raised by [`Broker`](crate::Broker) implementations. Relay publish failures
/// are logged and dropped, never retried; subscribe failures surface through
/// [`HubError::Broker`] at startup.
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum BrokerError {
    /// The underlying transport failed (connection lost, broker down, ...).
    #[error("broker transport failure: {message}")]
    Transport {
        /// The underlying failure message.
        message: String,
    },

    /// The channel or connection was closed while in use.
    #[error("broker channel closed")]
    Closed,
}

/// # Errors produced by the payment-provider capability.
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum ProviderError {
    /// The provider could not be reached.
    #[error("provider unreachable: {message}")]
    Transport {
        /// The underlying failure message.
        message: String,
    },

    /// The provider answered but rejected the request.
    #[error("provider rejected request: {message}")]
    Api {
        /// The provider's rejection message.
        message: String,
    },
}

/// # Outcome errors of a terminal-state wait.
///
/// Returned by [`wait_for_terminal`](crate::Hub::wait_for_terminal).
/// [`WaitError::Canceled`] is the *expected* rejection when the watched intent
/// ends in cancellation; callers should branch on [`is_canceled`](WaitError::is_canceled)
/// rather than treating every error as a fault.
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum WaitError {
    /// The intent reached the `canceled` terminal state.
    #[error("payment canceled: {}", .reason.as_deref().unwrap_or("no reason given"))]
    Canceled {
        /// The provider's cancellation reason, if it supplied one.
        reason: Option<String>,
    },

    /// The provider lookup that precedes waiting failed.
    #[error("provider lookup failed: {0}")]
    Provider(#[from] ProviderError),

    /// The registry shut down before a terminal event arrived.
    #[error("watch registry closed before a terminal event arrived")]
    Closed,
}

impl WaitError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use intentwatch::WaitError;
    ///
    /// let err = WaitError::Canceled { reason: None };
    /// assert_eq!(err.as_label(), "wait_canceled");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            WaitError::Canceled { .. } => "wait_canceled",
            WaitError::Provider(_) => "wait_provider",
            WaitError::Closed => "wait_closed",
        }
    }

    /// Indicates the expected rejection: the intent was canceled.
    ///
    /// Returns `false` for provider/transport faults, which callers may want
    /// to retry or surface differently.
    ///
    /// # Example
    /// ```
    /// use intentwatch::WaitError;
    ///
    /// let canceled = WaitError::Canceled { reason: Some("requested_by_customer".into()) };
    /// assert!(canceled.is_canceled());
    ///
    /// let closed = WaitError::Closed;
    /// assert!(!closed.is_canceled());
    /// ```
    pub fn is_canceled(&self) -> bool {
        matches!(self, WaitError::Canceled { .. })
    }
}

/// # Errors produced by charge completion.
///
/// Returned by [`complete_payment`](crate::complete_payment).
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum PaymentError {
    /// The supplied source is not in a chargeable state.
    #[error("source is not in a chargeable state")]
    SourceNotChargeable,

    /// A provider call inside the completion flow failed.
    #[error("provider call failed: {0}")]
    Provider(#[from] ProviderError),
}
