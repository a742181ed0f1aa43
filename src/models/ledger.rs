use chrono::{DateTime, FixedOffset};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::checkout::CheckoutSession;
use crate::entities::donation::{self, DonationStatus};
use crate::entities::withdrawal::{self, WithdrawalStatus};
use crate::entities::ngo;
use crate::ledger::NgoBalance;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NgoView {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub description: String,
    pub registration_number: String,
    pub sector: String,
    pub location: String,
    pub contact_email: String,
    pub contact_phone: String,
    pub impact_score: Decimal,
    pub created_at: DateTime<FixedOffset>,
}

impl From<ngo::Model> for NgoView {
    fn from(model: ngo::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            name: model.name,
            description: model.description,
            registration_number: model.registration_number,
            sector: model.sector,
            location: model.location,
            contact_email: model.contact_email,
            contact_phone: model.contact_phone,
            impact_score: model.impact_score,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DonationView {
    pub id: i64,
    pub donor_id: i64,
    pub ngo_id: i64,
    pub amount: Decimal,
    pub currency: String,
    pub transaction_hash: String,
    pub status: DonationStatus,
    pub created_at: DateTime<FixedOffset>,
}

impl From<donation::Model> for DonationView {
    fn from(model: donation::Model) -> Self {
        Self {
            id: model.id,
            donor_id: model.donor_id,
            ngo_id: model.ngo_id,
            amount: model.amount,
            currency: model.currency,
            transaction_hash: model.transaction_hash,
            status: model.status,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalView {
    pub id: i64,
    pub ngo_id: i64,
    pub amount: Decimal,
    pub purpose: String,
    pub status: WithdrawalStatus,
    pub created_at: DateTime<FixedOffset>,
}

impl From<withdrawal::Model> for WithdrawalView {
    fn from(model: withdrawal::Model) -> Self {
        Self {
            id: model.id,
            ngo_id: model.ngo_id,
            amount: model.amount,
            purpose: model.purpose,
            status: model.status,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceView {
    pub ngo_id: i64,
    pub received: Decimal,
    pub committed: Decimal,
    pub available: Decimal,
}

impl BalanceView {
    pub fn new(ngo_id: i64, balance: NgoBalance) -> Self {
        Self {
            ngo_id,
            received: balance.received,
            committed: balance.committed,
            available: balance.available,
        }
    }
}

/// Donor-declared donation; the status is always `pending` server side.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDonationRequest {
    pub ngo_id: i64,
    pub amount: Decimal,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub transaction_hash: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutBody {
    pub amount: Decimal,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub ngo_id: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub redirect_url: String,
    pub charge_code: String,
}

impl From<CheckoutSession> for CheckoutResponse {
    fn from(session: CheckoutSession) -> Self {
        Self {
            redirect_url: session.redirect_url,
            charge_code: session.charge_code,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateWithdrawalRequest {
    pub amount: Decimal,
    pub purpose: String,
    pub ngo_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub status: &'static str,
}

fn default_currency() -> String {
    "USD".to_string()
}
