use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};

use crate::auth::Principal;
use crate::directory::{self, NgoProfile};
use crate::models::ledger::{BalanceView, NgoView};
use crate::state::AppState;
use crate::withdrawal;

use super::HttpError;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_ngos).post(create_ngo))
        .route("/{ngo_id}", get(get_ngo))
        .route("/{ngo_id}/balance", get(get_balance))
}

async fn list_ngos(State(state): State<AppState>) -> Result<Json<Vec<NgoView>>, HttpError> {
    let ngos = directory::list_ngos(&state.ledger).await?;
    Ok(Json(ngos.into_iter().map(NgoView::from).collect()))
}

async fn get_ngo(
    Path(ngo_id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<NgoView>, HttpError> {
    let ngo = directory::get_ngo(&state.ledger, ngo_id).await?;
    Ok(Json(ngo.into()))
}

async fn create_ngo(
    State(state): State<AppState>,
    principal: Principal,
    Json(payload): Json<NgoProfile>,
) -> Result<(StatusCode, Json<NgoView>), HttpError> {
    let ngo = directory::register_ngo(&state.ledger, &principal, payload).await?;
    Ok((StatusCode::CREATED, Json(ngo.into())))
}

async fn get_balance(
    Path(ngo_id): Path<i64>,
    State(state): State<AppState>,
    principal: Principal,
) -> Result<Json<BalanceView>, HttpError> {
    let balance = withdrawal::ngo_balance(&state.ledger, &principal, ngo_id).await?;
    Ok(Json(BalanceView::new(ngo_id, balance)))
}
