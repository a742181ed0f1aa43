//! NGO withdrawal requests against recorded donations.
//!
//! Requests are created `pending`; approval happens outside this service.

use rust_decimal::Decimal;
use tracing::{info, instrument};

use crate::auth::Principal;
use crate::config::WithdrawalConfig;
use crate::entities::user::Role;
use crate::entities::{ngo, withdrawal};
use crate::error::{LedgerError, LedgerResult};
use crate::ledger::{Ledger, NewWithdrawal, NgoBalance};
use crate::money::validate_amount;

pub const MAX_PURPOSE_LEN: usize = 1_000;

#[derive(Debug, Clone)]
pub struct WithdrawalRequest {
    pub amount: Decimal,
    pub purpose: String,
    /// Optional; must name the principal's own NGO when present
    pub ngo_id: Option<i64>,
}

#[instrument(skip(ledger, config, request), fields(user_id = principal.user_id))]
pub async fn request_withdrawal(
    ledger: &Ledger,
    config: &WithdrawalConfig,
    principal: &Principal,
    request: WithdrawalRequest,
) -> LedgerResult<withdrawal::Model> {
    let ngo = owned_ngo(ledger, principal).await?;
    if let Some(requested) = request.ngo_id {
        if requested != ngo.id {
            return Err(LedgerError::forbidden(format!(
                "NGO {requested} is not owned by this account"
            )));
        }
    }

    let amount = validate_amount(request.amount)?;
    let purpose = request.purpose.trim();
    if purpose.is_empty() {
        return Err(LedgerError::validation("purpose is required"));
    }
    if purpose.len() > MAX_PURPOSE_LEN {
        return Err(LedgerError::validation(format!(
            "purpose exceeds {MAX_PURPOSE_LEN} characters"
        )));
    }

    let input = NewWithdrawal {
        ngo_id: ngo.id,
        amount,
        purpose: purpose.to_string(),
    };
    let created = if config.enforce_balance {
        ledger.create_withdrawal_within_balance(input).await?
    } else {
        ledger.create_withdrawal(input).await?
    };

    info!(
        withdrawal_id = created.id,
        ngo_id = created.ngo_id,
        amount = %created.amount,
        "withdrawal requested"
    );
    Ok(created)
}

pub async fn list_withdrawals(
    ledger: &Ledger,
    principal: &Principal,
    ngo_id: i64,
) -> LedgerResult<Vec<withdrawal::Model>> {
    let ngo = owned_ngo_matching(ledger, principal, ngo_id).await?;
    ledger.withdrawals_by_ngo(ngo.id).await
}

pub async fn ngo_balance(
    ledger: &Ledger,
    principal: &Principal,
    ngo_id: i64,
) -> LedgerResult<NgoBalance> {
    let ngo = owned_ngo_matching(ledger, principal, ngo_id).await?;
    ledger.balance(ngo.id).await
}

async fn owned_ngo(ledger: &Ledger, principal: &Principal) -> LedgerResult<ngo::Model> {
    principal.require(Role::Ngo)?;
    ledger
        .find_ngo_by_owner(principal.user_id)
        .await?
        .ok_or_else(|| LedgerError::not_found("NGO for user", principal.user_id))
}

async fn owned_ngo_matching(
    ledger: &Ledger,
    principal: &Principal,
    ngo_id: i64,
) -> LedgerResult<ngo::Model> {
    let target = ledger.require_ngo(ngo_id).await?;
    if principal.role != Role::Ngo || target.user_id != principal.user_id {
        return Err(LedgerError::forbidden(format!(
            "NGO {ngo_id} is not owned by this account"
        )));
    }
    Ok(target)
}
