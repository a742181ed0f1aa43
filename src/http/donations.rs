use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::auth::Principal;
use crate::checkout::{self, CheckoutRequest};
use crate::directory::{self, PendingDonation};
use crate::models::ledger::{CheckoutBody, CheckoutResponse, CreateDonationRequest, DonationView};
use crate::state::AppState;

use super::HttpError;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_donation))
        .route("/checkout", post(create_checkout))
        .route("/ngo/{ngo_id}", get(donations_by_ngo))
        .route("/donor/{donor_id}", get(donations_by_donor))
}

async fn create_donation(
    State(state): State<AppState>,
    principal: Principal,
    Json(payload): Json<CreateDonationRequest>,
) -> Result<(StatusCode, Json<DonationView>), HttpError> {
    let donation = directory::record_pending_donation(
        &state.ledger,
        &principal,
        PendingDonation {
            ngo_id: payload.ngo_id,
            amount: payload.amount,
            currency: payload.currency,
            reference: payload.transaction_hash,
        },
    )
    .await?;
    Ok((StatusCode::CREATED, Json(donation.into())))
}

async fn create_checkout(
    State(state): State<AppState>,
    principal: Principal,
    Json(payload): Json<CheckoutBody>,
) -> Result<Json<CheckoutResponse>, HttpError> {
    let session = checkout::initiate_checkout(
        &state.ledger,
        state.payments.as_ref(),
        &principal,
        CheckoutRequest {
            amount: payload.amount,
            currency: payload.currency,
            ngo_id: payload.ngo_id,
        },
    )
    .await?;
    Ok(Json(session.into()))
}

async fn donations_by_ngo(
    Path(ngo_id): Path<i64>,
    State(state): State<AppState>,
    principal: Principal,
) -> Result<Json<Vec<DonationView>>, HttpError> {
    let donations = directory::donations_for_ngo(&state.ledger, &principal, ngo_id).await?;
    Ok(Json(donations.into_iter().map(DonationView::from).collect()))
}

async fn donations_by_donor(
    Path(donor_id): Path<i64>,
    State(state): State<AppState>,
    principal: Principal,
) -> Result<Json<Vec<DonationView>>, HttpError> {
    let donations = directory::donations_for_donor(&state.ledger, &principal, donor_id).await?;
    Ok(Json(donations.into_iter().map(DonationView::from).collect()))
}
