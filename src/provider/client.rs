//! # Payment-provider capability surface.
//!
//! This module defines the [`ProviderClient`] trait — the narrow
//! `retrieve/create/update` capability this crate consumes — together with the
//! closed data model it reads: [`IntentSnapshot`], [`IntentStatus`],
//! [`IntentMetadata`], and the chargeable-source types.
//!
//! The provider itself (HTTP client, auth, retries) is an external
//! collaborator. Implementations plug in behind the trait; the rest of the
//! crate never sees the provider's full schema, only these snapshots.
//!
//! ## Forward compatibility
//! Snapshots deserialize from provider payloads with unknown fields ignored,
//! and [`IntentStatus`] folds unrecognized status strings into
//! [`IntentStatus::Unknown`] instead of failing the whole message.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

/// Lifecycle status of a payment intent, reduced to the states this
/// subsystem reacts to.
///
/// `Succeeded` and `Canceled` are **terminal**: no further transitions are
/// expected, and observing one of them ends the watchable lifetime of the
/// intent in this process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentStatus {
    /// Created, waiting for a payment method or confirmation.
    Pending,
    /// Customer action required (3DS challenge, redirect, ...).
    RequiresAction,
    /// Submitted to the payment network, outcome not yet known.
    Processing,
    /// Terminal: the payment completed.
    Succeeded,
    /// Terminal: the payment was canceled.
    Canceled,
    /// A status this crate does not model. Kept so newer provider payloads
    /// still deserialize and reach watchers.
    #[serde(other)]
    Unknown,
}

impl IntentStatus {
    /// Returns true for the terminal states (`Succeeded`, `Canceled`).
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, IntentStatus::Succeeded | IntentStatus::Canceled)
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            IntentStatus::Pending => "pending",
            IntentStatus::RequiresAction => "requires_action",
            IntentStatus::Processing => "processing",
            IntentStatus::Succeeded => "succeeded",
            IntentStatus::Canceled => "canceled",
            IntentStatus::Unknown => "unknown",
        }
    }
}

/// The metadata subset this crate reads and writes.
///
/// - `payload`: caller-supplied payload identifier, stamped at intent
///   creation by [`initialize_payment`](crate::initialize_payment). Doubles
///   as the idempotency key for webhook-driven charge creation.
/// - `charge`: id of the charge recorded by payment completion; its presence
///   marks the intent as already charged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentMetadata {
    /// Caller-supplied payload identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
    /// Charge id, set once a charge has been created for this intent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub charge: Option<String>,
}

/// Narrow view of a provider payment intent.
///
/// Immutable value object: one snapshot per observed state. Extra provider
/// fields are ignored on deserialize.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentSnapshot {
    /// Provider-assigned intent id.
    pub id: String,
    /// Current lifecycle status.
    pub status: IntentStatus,
    /// Amount in the smallest currency unit.
    pub amount: i64,
    /// ISO currency code (lowercase, provider convention).
    pub currency: String,
    /// Metadata subset (payload id, charge id).
    #[serde(default)]
    pub metadata: IntentMetadata,
    /// Cancellation reason, present once the intent is canceled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancellation_reason: Option<String>,
}

/// Status of a payment source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceStatus {
    /// The source can be charged.
    Chargeable,
    /// Any other source state; not chargeable from this crate's viewpoint.
    #[serde(other)]
    Other,
}

/// Narrow view of a payment source, as delivered by `source.chargeable`
/// webhook events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSnapshot {
    /// Provider-assigned source id.
    pub id: String,
    /// Current source status.
    pub status: SourceStatus,
    /// Intent id this source was created for, if the creator recorded one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_intent_id: Option<String>,
}

/// Parameters for creating a payment intent.
#[derive(Debug, Clone, Default)]
pub struct CreateIntentParams {
    /// Amount in the smallest currency unit.
    pub amount: i64,
    /// ISO currency code.
    pub currency: String,
    /// Initial metadata. [`initialize_payment`](crate::initialize_payment)
    /// stamps `payload` on top of whatever is supplied here.
    pub metadata: IntentMetadata,
}

/// Parameters for creating a charge against a chargeable source.
#[derive(Debug, Clone)]
pub struct ChargeParams {
    /// Source id to charge.
    pub source: String,
    /// Amount in the smallest currency unit (taken from the intent).
    pub amount: i64,
    /// ISO currency code (taken from the intent).
    pub currency: String,
    /// Intent this charge settles; recorded in the charge's metadata.
    pub payment_intent_id: String,
}

/// A created charge.
#[derive(Debug, Clone)]
pub struct Charge {
    /// Provider-assigned charge id.
    pub id: String,
}

/// # The provider capability this crate consumes.
///
/// Kept deliberately narrow: retrieve an intent, create an intent, create a
/// charge (with an explicit idempotency key), update intent metadata.
/// Everything else the provider offers is out of scope.
///
/// Implementations are expected to be cheap to share (`Arc<dyn ProviderClient>`)
/// and internally handle their own connection management.
#[async_trait]
pub trait ProviderClient: Send + Sync + 'static {
    /// Fetches the current snapshot of an intent.
    async fn retrieve_intent(&self, intent_id: &str) -> Result<IntentSnapshot, ProviderError>;

    /// Creates a new payment intent.
    async fn create_intent(&self, params: CreateIntentParams)
        -> Result<IntentSnapshot, ProviderError>;

    /// Creates a charge.
    ///
    /// `idempotency_key` makes webhook redelivery safe: the provider must
    /// treat two creations with the same key as one.
    async fn create_charge(
        &self,
        params: ChargeParams,
        idempotency_key: &str,
    ) -> Result<Charge, ProviderError>;

    /// Merges the given metadata into the intent's metadata.
    async fn update_intent_metadata(
        &self,
        intent_id: &str,
        metadata: IntentMetadata,
    ) -> Result<(), ProviderError>;
}
