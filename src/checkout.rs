//! Checkout initiation: turns a donor's intent into a processor charge.
//!
//! No donation row is written here. A donation only exists once the
//! processor confirms the charge through the webhook.

use rust_decimal::Decimal;
use tracing::{info, instrument};

use crate::auth::Principal;
use crate::entities::user::Role;
use crate::error::LedgerResult;
use crate::ledger::Ledger;
use crate::money::{normalize_currency, validate_amount};
use crate::payments::{ChargeRequest, PaymentGateway};

#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub amount: Decimal,
    pub currency: String,
    pub ngo_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSession {
    pub redirect_url: String,
    pub charge_code: String,
}

#[instrument(skip(ledger, gateway), fields(donor_id = principal.user_id))]
pub async fn initiate_checkout(
    ledger: &Ledger,
    gateway: &dyn PaymentGateway,
    principal: &Principal,
    request: CheckoutRequest,
) -> LedgerResult<CheckoutSession> {
    principal.require(Role::Donor)?;
    let amount = validate_amount(request.amount)?;
    let currency = normalize_currency(&request.currency)?;
    ledger.require_ngo(request.ngo_id).await?;

    let charge_request = ChargeRequest::donation(amount, &currency, principal.user_id, request.ngo_id);
    let charge = gateway.create_charge(&charge_request).await?;

    info!(
        charge_code = %charge.code,
        ngo_id = request.ngo_id,
        %amount,
        %currency,
        "checkout charge created"
    );

    Ok(CheckoutSession {
        redirect_url: charge.hosted_url,
        charge_code: charge.code,
    })
}
