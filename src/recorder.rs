//! Turns verified `charge:confirmed` deliveries into completed donations.
//!
//! Processors deliver at least once, so a charge code that already has a
//! completed donation is acknowledged as a duplicate and nothing is written.

use serde_json::{Map, Value};
use tracing::{error, info, instrument, warn};

use crate::entities::donation;
use crate::error::{LedgerError, LedgerResult};
use crate::ledger::{ConfirmedCharge, Ledger};
use crate::money::{normalize_currency, parse_amount};
use crate::payments::{ChargeEvent, WebhookVerifier};

const DONOR_KEY: &str = "user_id";
const NGO_KEY: &str = "ngo_id";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    Applied(donation::Model),
    Duplicate { charge_code: String },
    Ignored { event_type: String },
}

impl WebhookOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Applied(_) => "applied",
            Self::Duplicate { .. } => "duplicate",
            Self::Ignored { .. } => "ignored",
        }
    }
}

#[instrument(skip_all, fields(body_len = raw_body.len()))]
pub async fn handle_webhook(
    ledger: &Ledger,
    verifier: &WebhookVerifier,
    raw_body: &[u8],
    signature: Option<&str>,
) -> LedgerResult<WebhookOutcome> {
    let event = verifier.verify(raw_body, signature).inspect_err(|err| {
        warn!(error = %err, "webhook delivery rejected");
    })?;

    if !event.is_confirmed() {
        info!(event_id = %event.id, event_type = %event.event_type, "webhook event ignored");
        return Ok(WebhookOutcome::Ignored {
            event_type: event.event_type,
        });
    }

    let charge = confirmed_charge(&event).inspect_err(|err| {
        warn!(event_id = %event.id, error = %err, "confirmed charge could not be attributed");
    })?;

    if ledger.find_ngo(charge.ngo_id).await?.is_none() {
        error!(
            event_id = %event.id,
            charge_code = %charge.charge_code,
            ngo_id = charge.ngo_id,
            "confirmed charge references unknown ngo, needs reconciliation"
        );
        return Err(LedgerError::MalformedEvent(format!(
            "ngo {} does not exist",
            charge.ngo_id
        )));
    }

    match ledger.record_completed_donation(&charge).await? {
        Some(donation) => {
            info!(
                event_id = %event.id,
                charge_code = %charge.charge_code,
                donation_id = donation.id,
                ngo_id = donation.ngo_id,
                amount = %donation.amount,
                "donation recorded"
            );
            Ok(WebhookOutcome::Applied(donation))
        }
        None => {
            info!(
                event_id = %event.id,
                charge_code = %charge.charge_code,
                "duplicate delivery acknowledged"
            );
            Ok(WebhookOutcome::Duplicate {
                charge_code: charge.charge_code,
            })
        }
    }
}

fn confirmed_charge(event: &ChargeEvent) -> LedgerResult<ConfirmedCharge> {
    let charge_code = event
        .data
        .code
        .as_deref()
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .ok_or_else(|| malformed("charge code missing"))?
        .to_string();

    let donor_id = metadata_id(&event.data.metadata, DONOR_KEY)?;
    let ngo_id = metadata_id(&event.data.metadata, NGO_KEY)?;

    let local = event
        .data
        .pricing
        .as_ref()
        .and_then(|pricing| pricing.local.as_ref())
        .ok_or_else(|| malformed("local pricing missing"))?;
    let amount = parse_amount(&local.amount).map_err(|err| malformed(&err.to_string()))?;
    let currency = normalize_currency(&local.currency).map_err(|err| malformed(&err.to_string()))?;

    Ok(ConfirmedCharge {
        charge_code,
        donor_id,
        ngo_id,
        amount,
        currency,
    })
}

/// Metadata ids travel as strings but are accepted as JSON numbers too.
fn metadata_id(metadata: &Map<String, Value>, key: &str) -> LedgerResult<i64> {
    let id = match metadata.get(key) {
        Some(Value::String(raw)) => raw.trim().parse::<i64>().ok(),
        Some(Value::Number(number)) => number.as_i64(),
        Some(_) => None,
        None => return Err(malformed(&format!("metadata.{key} missing"))),
    };
    id.filter(|id| *id > 0)
        .ok_or_else(|| malformed(&format!("metadata.{key} is not a valid id")))
}

fn malformed(reason: &str) -> LedgerError {
    LedgerError::MalformedEvent(reason.to_string())
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use serde_json::json;

    use super::*;
    use crate::entities::donation::DonationStatus;
    use crate::entities::user::Role;
    use crate::payments::webhook::CHARGE_CONFIRMED;
    use crate::test_utils::{
        WEBHOOK_SECRET, charge_event, seed_ngo, seed_user, setup_ledger, sign,
    };

    fn verifier() -> WebhookVerifier {
        WebhookVerifier::new(WEBHOOK_SECRET)
    }

    async fn ledger_with_ngo() -> (Ledger, i64, i64) {
        let ledger = setup_ledger().await;
        let operator = seed_user(&ledger, "ops", Role::Ngo).await;
        let ngo = seed_ngo(&ledger, operator.id, "Green Earth").await;
        let donor = seed_user(&ledger, "alice", Role::Donor).await;
        (ledger, donor.id, ngo.id)
    }

    #[tokio::test]
    async fn confirmed_charge_becomes_completed_donation() {
        let (ledger, donor_id, ngo_id) = ledger_with_ngo().await;
        let body = charge_event(
            CHARGE_CONFIRMED,
            "abc123",
            json!({"user_id": donor_id.to_string(), "ngo_id": ngo_id.to_string()}),
            "25.00",
        );

        let outcome = handle_webhook(&ledger, &verifier(), &body, Some(&sign(&body)))
            .await
            .unwrap();

        let donation = match outcome {
            WebhookOutcome::Applied(donation) => donation,
            other => panic!("expected applied outcome, got {other:?}"),
        };
        assert_eq!(donation.donor_id, donor_id);
        assert_eq!(donation.ngo_id, ngo_id);
        assert_eq!(donation.amount, Decimal::from(25));
        assert_eq!(donation.currency, "USD");
        assert_eq!(donation.transaction_hash, "abc123");
        assert_eq!(donation.status, DonationStatus::Completed);
    }

    #[tokio::test]
    async fn metadata_strings_round_trip_into_donation() {
        let ledger = setup_ledger().await;
        let operator = seed_user(&ledger, "ops", Role::Ngo).await;
        let ngo = seed_ngo(&ledger, operator.id, "Green Earth").await;
        seed_user(&ledger, "bob", Role::Donor).await;
        let donor = seed_user(&ledger, "carol", Role::Donor).await;
        assert_eq!((donor.id, ngo.id), (3, 1));

        let body = charge_event(
            CHARGE_CONFIRMED,
            "rt-1",
            json!({"user_id": "3", "ngo_id": "1"}),
            "25.00",
        );
        handle_webhook(&ledger, &verifier(), &body, Some(&sign(&body)))
            .await
            .unwrap();

        let stored = ledger.find_completed_donation("rt-1").await.unwrap().unwrap();
        assert_eq!(stored.donor_id, 3);
        assert_eq!(stored.ngo_id, 1);
        assert_eq!(stored.amount, Decimal::new(2500, 2));
        assert_eq!(stored.status, DonationStatus::Completed);
    }

    #[tokio::test]
    async fn checkout_then_confirmation_records_exactly_once() {
        use crate::checkout::fake::FakeGateway;
        use crate::checkout::{CheckoutRequest, initiate_checkout};
        use crate::test_utils::principal;

        let ledger = setup_ledger().await;
        let first_ops = seed_user(&ledger, "first-ops", Role::Ngo).await;
        let second_ops = seed_user(&ledger, "second-ops", Role::Ngo).await;
        seed_ngo(&ledger, first_ops.id, "First").await;
        let ngo = seed_ngo(&ledger, second_ops.id, "Second").await;
        seed_user(&ledger, "d3", Role::Donor).await;
        seed_user(&ledger, "d4", Role::Donor).await;
        let donor = seed_user(&ledger, "d5", Role::Donor).await;
        assert_eq!((donor.id, ngo.id), (5, 2));

        let gateway = FakeGateway::default();
        let session = initiate_checkout(
            &ledger,
            &gateway,
            &principal(&donor),
            CheckoutRequest {
                amount: Decimal::from(50),
                currency: "USD".to_string(),
                ngo_id: 2,
            },
        )
        .await
        .unwrap();
        let metadata = gateway.recorded()[0].metadata.clone();
        assert_eq!((metadata.user_id.as_str(), metadata.ngo_id.as_str()), ("5", "2"));

        let body = charge_event(
            CHARGE_CONFIRMED,
            &session.charge_code,
            json!({"user_id": metadata.user_id, "ngo_id": metadata.ngo_id}),
            "50.00",
        );
        let signature = sign(&body);
        handle_webhook(&ledger, &verifier(), &body, Some(&signature))
            .await
            .unwrap();
        let replay = handle_webhook(&ledger, &verifier(), &body, Some(&signature))
            .await
            .unwrap();
        assert_eq!(replay.label(), "duplicate");

        let donations = ledger.donations_by_ngo(2).await.unwrap();
        assert_eq!(donations.len(), 1);
        assert_eq!(donations[0].donor_id, 5);
        assert_eq!(donations[0].amount, Decimal::from(50));
        assert_eq!(donations[0].transaction_hash, "abc123");
        assert_eq!(donations[0].status, DonationStatus::Completed);
    }

    #[tokio::test]
    async fn numeric_metadata_ids_are_accepted() {
        let (ledger, donor_id, ngo_id) = ledger_with_ngo().await;
        let body = charge_event(
            CHARGE_CONFIRMED,
            "num-ids",
            json!({"user_id": donor_id, "ngo_id": ngo_id}),
            "10",
        );
        let outcome = handle_webhook(&ledger, &verifier(), &body, Some(&sign(&body)))
            .await
            .unwrap();
        assert_eq!(outcome.label(), "applied");
    }

    #[tokio::test]
    async fn redelivery_is_acknowledged_without_second_row() {
        let (ledger, donor_id, ngo_id) = ledger_with_ngo().await;
        let body = charge_event(
            CHARGE_CONFIRMED,
            "abc123",
            json!({"user_id": donor_id.to_string(), "ngo_id": ngo_id.to_string()}),
            "25.00",
        );
        let signature = sign(&body);

        let first = handle_webhook(&ledger, &verifier(), &body, Some(&signature))
            .await
            .unwrap();
        let second = handle_webhook(&ledger, &verifier(), &body, Some(&signature))
            .await
            .unwrap();

        assert_eq!(first.label(), "applied");
        assert_eq!(
            second,
            WebhookOutcome::Duplicate {
                charge_code: "abc123".to_string()
            }
        );
        assert_eq!(ledger.donations_by_ngo(ngo_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn concurrent_deliveries_record_once() {
        let (ledger, donor_id, ngo_id) = ledger_with_ngo().await;
        let body = charge_event(
            CHARGE_CONFIRMED,
            "race",
            json!({"user_id": donor_id.to_string(), "ngo_id": ngo_id.to_string()}),
            "5.00",
        );
        let signature = sign(&body);
        let verifier = verifier();

        let (a, b) = tokio::join!(
            handle_webhook(&ledger, &verifier, &body, Some(&signature)),
            handle_webhook(&ledger, &verifier, &body, Some(&signature)),
        );

        let labels = [a.unwrap().label(), b.unwrap().label()];
        assert!(labels.contains(&"applied"));
        assert!(labels.contains(&"duplicate"));
        assert_eq!(ledger.donations_by_ngo(ngo_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn missing_ngo_metadata_is_malformed_and_writes_nothing() {
        let (ledger, donor_id, ngo_id) = ledger_with_ngo().await;
        let body = charge_event(
            CHARGE_CONFIRMED,
            "no-ngo",
            json!({"user_id": donor_id.to_string()}),
            "25.00",
        );
        let err = handle_webhook(&ledger, &verifier(), &body, Some(&sign(&body)))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::MalformedEvent(_)));
        assert!(ledger.donations_by_ngo(ngo_id).await.unwrap().is_empty());
        assert!(ledger.donations_by_donor(donor_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_ngo_and_bad_pricing_are_malformed() {
        let (ledger, donor_id, _) = ledger_with_ngo().await;

        let unknown = charge_event(
            CHARGE_CONFIRMED,
            "ghost",
            json!({"user_id": donor_id.to_string(), "ngo_id": "999"}),
            "25.00",
        );
        let err = handle_webhook(&ledger, &verifier(), &unknown, Some(&sign(&unknown)))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::MalformedEvent(_)));

        let negative = charge_event(
            CHARGE_CONFIRMED,
            "negative",
            json!({"user_id": donor_id.to_string(), "ngo_id": "1"}),
            "-3.00",
        );
        let err = handle_webhook(&ledger, &verifier(), &negative, Some(&sign(&negative)))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::MalformedEvent(_)));
    }

    #[tokio::test]
    async fn other_event_types_are_ignored() {
        let (ledger, donor_id, ngo_id) = ledger_with_ngo().await;
        let body = charge_event(
            "charge:pending",
            "abc123",
            json!({"user_id": donor_id.to_string(), "ngo_id": ngo_id.to_string()}),
            "25.00",
        );
        let outcome = handle_webhook(&ledger, &verifier(), &body, Some(&sign(&body)))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            WebhookOutcome::Ignored {
                event_type: "charge:pending".to_string()
            }
        );
        assert!(ledger.donations_by_ngo(ngo_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn forged_delivery_changes_nothing() {
        let (ledger, donor_id, ngo_id) = ledger_with_ngo().await;
        let body = charge_event(
            CHARGE_CONFIRMED,
            "forged",
            json!({"user_id": donor_id.to_string(), "ngo_id": ngo_id.to_string()}),
            "1000.00",
        );
        let forged = "0".repeat(64);
        let err = handle_webhook(&ledger, &verifier(), &body, Some(&forged))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidSignature));
        assert!(ledger.donations_by_ngo(ngo_id).await.unwrap().is_empty());
    }
}
