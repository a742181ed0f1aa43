use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::auth::Principal;
use crate::models::ledger::{CreateWithdrawalRequest, WithdrawalView};
use crate::state::AppState;
use crate::withdrawal::{self, WithdrawalRequest};

use super::HttpError;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_withdrawal))
        .route("/ngo/{ngo_id}", get(withdrawals_by_ngo))
}

async fn create_withdrawal(
    State(state): State<AppState>,
    principal: Principal,
    Json(payload): Json<CreateWithdrawalRequest>,
) -> Result<(StatusCode, Json<WithdrawalView>), HttpError> {
    let created = withdrawal::request_withdrawal(
        &state.ledger,
        &state.withdrawals,
        &principal,
        WithdrawalRequest {
            amount: payload.amount,
            purpose: payload.purpose,
            ngo_id: payload.ngo_id,
        },
    )
    .await?;
    Ok((StatusCode::CREATED, Json(created.into())))
}

async fn withdrawals_by_ngo(
    Path(ngo_id): Path<i64>,
    State(state): State<AppState>,
    principal: Principal,
) -> Result<Json<Vec<WithdrawalView>>, HttpError> {
    let withdrawals = withdrawal::list_withdrawals(&state.ledger, &principal, ngo_id).await?;
    Ok(Json(withdrawals.into_iter().map(WithdrawalView::from).collect()))
}
