//! NGO directory and donation listings.

use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::info;

use crate::auth::Principal;
use crate::entities::user::Role;
use crate::entities::{donation, ngo};
use crate::error::{LedgerError, LedgerResult};
use crate::ledger::{Ledger, NewDonation, NewNgo};
use crate::money::{normalize_currency, sanitize_reference, validate_amount};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NgoProfile {
    pub name: String,
    pub description: String,
    pub registration_number: String,
    pub sector: String,
    pub location: String,
    pub contact_email: String,
    pub contact_phone: String,
}

#[derive(Debug, Clone)]
pub struct PendingDonation {
    pub ngo_id: i64,
    pub amount: Decimal,
    pub currency: String,
    pub reference: String,
}

pub async fn register_ngo(
    ledger: &Ledger,
    principal: &Principal,
    profile: NgoProfile,
) -> LedgerResult<ngo::Model> {
    principal.require(Role::Ngo)?;

    let contact_email = field("contactEmail", &profile.contact_email, 254)?;
    if !contact_email.contains('@') {
        return Err(LedgerError::validation("contactEmail must be an email address"));
    }

    let created = ledger
        .create_ngo(NewNgo {
            user_id: principal.user_id,
            name: field("name", &profile.name, 128)?,
            description: field("description", &profile.description, 10_000)?,
            registration_number: field("registrationNumber", &profile.registration_number, 64)?,
            sector: field("sector", &profile.sector, 64)?,
            location: field("location", &profile.location, 128)?,
            contact_email,
            contact_phone: field("contactPhone", &profile.contact_phone, 32)?,
        })
        .await?;

    info!(ngo_id = created.id, owner = principal.user_id, "ngo registered");
    Ok(created)
}

pub async fn list_ngos(ledger: &Ledger) -> LedgerResult<Vec<ngo::Model>> {
    ledger.list_ngos().await
}

pub async fn get_ngo(ledger: &Ledger, ngo_id: i64) -> LedgerResult<ngo::Model> {
    ledger.require_ngo(ngo_id).await
}

/// Records a donor-declared donation. It stays `pending`; only a confirmed
/// processor charge produces a `completed` donation.
pub async fn record_pending_donation(
    ledger: &Ledger,
    principal: &Principal,
    input: PendingDonation,
) -> LedgerResult<donation::Model> {
    principal.require(Role::Donor)?;
    let amount = validate_amount(input.amount)?;
    let currency = normalize_currency(&input.currency)?;
    let reference = sanitize_reference(&input.reference)?;
    ledger.require_ngo(input.ngo_id).await?;

    let created = ledger
        .create_pending_donation(NewDonation {
            donor_id: principal.user_id,
            ngo_id: input.ngo_id,
            amount,
            currency,
            reference,
        })
        .await?;
    info!(donation_id = created.id, ngo_id = created.ngo_id, "pending donation recorded");
    Ok(created)
}

pub async fn donations_for_ngo(
    ledger: &Ledger,
    _principal: &Principal,
    ngo_id: i64,
) -> LedgerResult<Vec<donation::Model>> {
    ledger.require_ngo(ngo_id).await?;
    ledger.donations_by_ngo(ngo_id).await
}

pub async fn donations_for_donor(
    ledger: &Ledger,
    principal: &Principal,
    donor_id: i64,
) -> LedgerResult<Vec<donation::Model>> {
    if principal.user_id != donor_id {
        return Err(LedgerError::forbidden("donations of another donor"));
    }
    ledger.donations_by_donor(donor_id).await
}

fn field(name: &str, value: &str, max_len: usize) -> LedgerResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(LedgerError::validation(format!("{name} is required")));
    }
    if trimmed.chars().count() > max_len {
        return Err(LedgerError::validation(format!(
            "{name} exceeds {max_len} characters"
        )));
    }
    Ok(trimmed.to_string())
}
