//! # Payment initialization and charge completion.
//!
//! Two flows built on top of [`ProviderClient`]:
//!
//! - [`initialize_payment`] creates an intent with `metadata.payload` stamped
//!   to a caller-supplied payload id. That id is what later makes
//!   webhook-driven charge creation idempotent.
//! - [`complete_payment`] settles an intent with a chargeable source: it
//!   creates the charge (idempotently) and records the charge id back on the
//!   intent's metadata.
//!
//! ## Idempotency
//! The charge-creation idempotency key is the intent's `metadata.payload` if
//! present, else the intent id itself. Webhook deliveries are at-least-once;
//! a redelivered `source.chargeable` event replays the same key and the
//! provider deduplicates the charge.
//!
//! ## Skip rules
//! A charge is only created when the intent is still chargeable: not in a
//! terminal state and not already carrying `metadata.charge`. A skipped
//! completion returns `Ok(None)`.

use crate::error::{PaymentError, ProviderError};
use crate::provider::client::{
    Charge, ChargeParams, CreateIntentParams, IntentMetadata, IntentSnapshot, ProviderClient,
    SourceSnapshot, SourceStatus,
};

/// Creates a payment intent with `metadata.payload` set to `payload_id`.
///
/// The payload id travels with the intent through every provider webhook and
/// is handed to watchers via
/// [`ChangeEvent::payload_id`](crate::ChangeEvent::payload_id).
pub async fn initialize_payment(
    provider: &dyn ProviderClient,
    payload_id: &str,
    mut params: CreateIntentParams,
) -> Result<IntentSnapshot, ProviderError> {
    params.metadata.payload = Some(payload_id.to_string());
    provider.create_intent(params).await
}

/// Completes a payment by charging a chargeable source.
///
/// Returns `Ok(Some(charge))` when a charge was created, `Ok(None)` when the
/// intent was already terminal or already charged (nothing to do), and
/// [`PaymentError::SourceNotChargeable`] when the source cannot be charged.
pub async fn complete_payment(
    provider: &dyn ProviderClient,
    intent_id: &str,
    source: &SourceSnapshot,
) -> Result<Option<Charge>, PaymentError> {
    if source.status != SourceStatus::Chargeable {
        return Err(PaymentError::SourceNotChargeable);
    }
    charge_intent(provider, intent_id, source)
        .await
        .map_err(PaymentError::from)
}

/// Webhook-side variant of [`complete_payment`].
///
/// Resolves the intent id from the source itself and skips silently when the
/// source is not chargeable or names no intent — the shape of a raw
/// `source.chargeable` webhook delivery, where "nothing to do" is the common
/// case and not an error.
pub(crate) async fn charge_for_source(
    provider: &dyn ProviderClient,
    source: &SourceSnapshot,
) -> Result<Option<Charge>, ProviderError> {
    if source.status != SourceStatus::Chargeable {
        return Ok(None);
    }
    let intent_id = match source.payment_intent_id.as_deref() {
        Some(id) => id,
        None => return Ok(None),
    };
    charge_intent(provider, intent_id, source).await
}

/// Shared completion core: retrieve, apply skip rules, charge, record.
async fn charge_intent(
    provider: &dyn ProviderClient,
    intent_id: &str,
    source: &SourceSnapshot,
) -> Result<Option<Charge>, ProviderError> {
    let intent = provider.retrieve_intent(intent_id).await?;
    if intent.status.is_terminal() || intent.metadata.charge.is_some() {
        return Ok(None);
    }

    let idempotency_key = intent
        .metadata
        .payload
        .clone()
        .unwrap_or_else(|| intent.id.clone());

    let charge = provider
        .create_charge(
            ChargeParams {
                source: source.id.clone(),
                amount: intent.amount,
                currency: intent.currency.clone(),
                payment_intent_id: intent.id.clone(),
            },
            &idempotency_key,
        )
        .await?;

    provider
        .update_intent_metadata(
            &intent.id,
            IntentMetadata {
                payload: None,
                charge: Some(charge.id.clone()),
            },
        )
        .await?;

    Ok(Some(charge))
}
