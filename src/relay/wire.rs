//! # Cluster wire format.
//!
//! Messages on the cluster channel are UTF-8 JSON objects of the shape
//! `{ "messageId": "...", "paymentIntent": { ... } }`. Publishers and
//! subscribers must agree on exactly this shape; unknown extra fields are
//! ignored on deserialize (forward compatibility).
//!
//! Only change events cross instance boundaries — never watcher identities
//! or wait state. Each instance rebuilds its own registry from the events it
//! observes.

use serde::{Deserialize, Serialize};

use crate::provider::IntentSnapshot;

/// One relayed intent change, as published to the cluster channel.
///
/// `message_id` is assigned exactly once, by the instance that observed the
/// change locally, and is used only for dedup. A message without one fails
/// to deserialize and is dropped by the relay.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireMessage {
    /// Opaque unique token assigned by the publishing instance.
    pub message_id: String,
    /// The intent snapshot the change carries.
    pub payment_intent: IntentSnapshot,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{IntentMetadata, IntentStatus};

    #[test]
    fn test_wire_shape_is_camel_case() {
        let msg = WireMessage {
            message_id: "m-1".to_string(),
            payment_intent: IntentSnapshot {
                id: "pi_1".to_string(),
                status: IntentStatus::Succeeded,
                amount: 2500,
                currency: "usd".to_string(),
                metadata: IntentMetadata::default(),
                cancellation_reason: None,
            },
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"messageId\":\"m-1\""));
        assert!(json.contains("\"paymentIntent\""));
        assert!(json.contains("\"status\":\"succeeded\""));
    }

    #[test]
    fn test_unknown_fields_are_ignored() {
        let json = r#"{
            "messageId": "m-1",
            "paymentIntent": { "id": "pi_1", "status": "pending", "amount": 1, "currency": "usd" },
            "publishedBy": "instance-7"
        }"#;
        let msg: WireMessage = serde_json::from_str(json).expect("must deserialize");
        assert_eq!(msg.message_id, "m-1");
        assert_eq!(msg.payment_intent.id, "pi_1");
    }

    #[test]
    fn test_missing_message_id_is_an_error() {
        let json = r#"{
            "paymentIntent": { "id": "pi_1", "status": "pending", "amount": 1, "currency": "usd" }
        }"#;
        assert!(serde_json::from_str::<WireMessage>(json).is_err());
    }
}
