//! Outbound payment-processor seam and inbound webhook verification.

mod commerce;
pub mod webhook;

pub use commerce::CommerceClient;
pub use webhook::{ChargeEvent, WebhookVerifier};

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::LedgerResult;

pub const CHARGE_NAME: &str = "NGO Donation";
pub const CHARGE_DESCRIPTION: &str = "Donation via blockchain technology";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocalPrice {
    pub amount: String,
    pub currency: String,
}

/// Attribution carried through the processor and echoed back in webhooks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargeMetadata {
    pub user_id: String,
    pub ngo_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChargeRequest {
    pub name: String,
    pub description: String,
    pub local_price: LocalPrice,
    pub pricing_type: &'static str,
    pub metadata: ChargeMetadata,
}

impl ChargeRequest {
    pub fn donation(amount: Decimal, currency: &str, donor_id: i64, ngo_id: i64) -> Self {
        Self {
            name: CHARGE_NAME.to_string(),
            description: CHARGE_DESCRIPTION.to_string(),
            local_price: LocalPrice {
                amount: amount.normalize().to_string(),
                currency: currency.to_string(),
            },
            pricing_type: "fixed_price",
            metadata: ChargeMetadata {
                user_id: donor_id.to_string(),
                ngo_id: ngo_id.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Charge {
    pub code: String,
    pub hosted_url: String,
}

/// Creates charges at the external payment processor.
///
/// Implementations must not retry a request whose outcome is unknown: the
/// charge may already exist processor-side.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_charge(&self, request: &ChargeRequest) -> LedgerResult<Charge>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn donation_charge_carries_attribution_metadata() {
        let request = ChargeRequest::donation(Decimal::new(5000, 2), "USD", 5, 2);
        assert_eq!(request.local_price.amount, "50");
        assert_eq!(request.metadata.user_id, "5");
        assert_eq!(request.metadata.ngo_id, "2");

        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["pricing_type"], "fixed_price");
        assert_eq!(body["local_price"]["currency"], "USD");
        assert_eq!(body["metadata"]["user_id"], "5");
    }
}
