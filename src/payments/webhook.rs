//! Signed webhook deliveries from the payment processor.
//!
//! The signature is an HMAC-SHA256 of the raw request body keyed with the
//! shared webhook secret, hex encoded in `X-CC-Webhook-Signature`. It is
//! checked against the exact bytes received, before any JSON parsing.

use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::Value;
use sha2::Sha256;

use crate::error::{LedgerError, LedgerResult};

pub const SIGNATURE_HEADER: &str = "x-cc-webhook-signature";
pub const CHARGE_CONFIRMED: &str = "charge:confirmed";

/// SHA-256 digest, hex encoded
const SIGNATURE_HEX_LEN: usize = 64;

type HmacSha256 = Hmac<Sha256>;

pub struct WebhookVerifier {
    secret: Vec<u8>,
}

impl WebhookVerifier {
    pub fn new(secret: &str) -> Self {
        assert!(!secret.is_empty(), "Webhook secret must be configured");
        Self {
            secret: secret.as_bytes().to_vec(),
        }
    }

    /// Authenticates `raw_body` and decodes the event it carries.
    pub fn verify(&self, raw_body: &[u8], signature: Option<&str>) -> LedgerResult<ChargeEvent> {
        let signature = signature
            .map(str::trim)
            .filter(|s| s.len() == SIGNATURE_HEX_LEN)
            .ok_or(LedgerError::InvalidSignature)?;
        let provided = hex::decode(signature).map_err(|_| LedgerError::InvalidSignature)?;

        let mut mac =
            HmacSha256::new_from_slice(&self.secret).map_err(|_| LedgerError::InvalidSignature)?;
        mac.update(raw_body);
        mac.verify_slice(&provided)
            .map_err(|_| LedgerError::InvalidSignature)?;

        let envelope: WebhookEnvelope = serde_json::from_slice(raw_body)
            .map_err(|err| LedgerError::MalformedEvent(format!("body is not an event: {err}")))?;
        Ok(envelope.event)
    }
}

#[derive(Debug, Deserialize)]
struct WebhookEnvelope {
    event: ChargeEvent,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChargeEvent {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub data: ChargeData,
}

impl ChargeEvent {
    pub fn is_confirmed(&self) -> bool {
        self.event_type == CHARGE_CONFIRMED
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChargeData {
    pub code: Option<String>,
    /// Free-form on the processor side; values may arrive as strings or numbers
    #[serde(default)]
    pub metadata: serde_json::Map<String, Value>,
    pub pricing: Option<Pricing>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Pricing {
    pub local: Option<Money>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Money {
    pub amount: String,
    pub currency: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{WEBHOOK_SECRET, charge_event, sign};
    use serde_json::json;

    fn verifier() -> WebhookVerifier {
        WebhookVerifier::new(WEBHOOK_SECRET)
    }

    #[test]
    fn accepts_signature_over_exact_bytes() {
        let body = charge_event(
            CHARGE_CONFIRMED,
            "abc123",
            json!({"user_id": "3", "ngo_id": "1"}),
            "25.00",
        );
        let event = verifier().verify(&body, Some(&sign(&body))).unwrap();
        assert!(event.is_confirmed());
        assert_eq!(event.data.code.as_deref(), Some("abc123"));
        assert_eq!(event.data.metadata["user_id"], "3");
        let local = event.data.pricing.unwrap().local.unwrap();
        assert_eq!(local.amount, "25.00");
        assert_eq!(local.currency, "USD");
    }

    #[test]
    fn rejects_tampered_body_with_original_signature() {
        let body = charge_event(CHARGE_CONFIRMED, "abc123", json!({"user_id": "3", "ngo_id": "1"}), "25.00");
        let signature = sign(&body);
        let tampered = charge_event(CHARGE_CONFIRMED, "abc123", json!({"user_id": "3", "ngo_id": "1"}), "2500.00");
        let err = verifier().verify(&tampered, Some(&signature)).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidSignature));
    }

    #[test]
    fn reserialized_body_does_not_verify() {
        let body = br#"{"event": {"id": "e1", "type": "charge:confirmed", "data": {}}}"#;
        let signature = sign(body);
        let reparsed: Value = serde_json::from_slice(body).unwrap();
        let reserialized = serde_json::to_vec(&reparsed).unwrap();
        assert_ne!(reserialized.as_slice(), body.as_slice());
        assert!(verifier().verify(&reserialized, Some(&signature)).is_err());
        assert!(verifier().verify(body, Some(&signature)).is_ok());
    }

    #[test]
    fn missing_or_garbled_signature_is_rejected() {
        let body = charge_event("charge:created", "abc123", json!({}), "1.00");
        assert!(matches!(verifier().verify(&body, None), Err(LedgerError::InvalidSignature)));
        assert!(matches!(
            verifier().verify(&body, Some("zz")),
            Err(LedgerError::InvalidSignature)
        ));
        let not_hex = "g".repeat(SIGNATURE_HEX_LEN);
        assert!(matches!(
            verifier().verify(&body, Some(&not_hex)),
            Err(LedgerError::InvalidSignature)
        ));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let body = charge_event(CHARGE_CONFIRMED, "abc123", json!({}), "1.00");
        let other = WebhookVerifier::new("a-completely-different-secret");
        assert!(matches!(
            other.verify(&body, Some(&sign(&body))),
            Err(LedgerError::InvalidSignature)
        ));
    }

    #[test]
    fn signed_garbage_is_malformed() {
        let body = b"not json at all";
        let err = verifier().verify(body, Some(&sign(body))).unwrap_err();
        assert!(matches!(err, LedgerError::MalformedEvent(_)));
    }
}
