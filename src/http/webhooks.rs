//! Payment processor callbacks. The body is taken as raw bytes so the
//! signature is checked against exactly what was sent.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::post;
use axum::{Json, Router};

use crate::models::ledger::WebhookAck;
use crate::payments::webhook::SIGNATURE_HEADER;
use crate::recorder;
use crate::state::AppState;

use super::HttpError;

pub fn router() -> Router<AppState> {
    Router::new().route("/coinbase", post(receive_charge_event))
}

async fn receive_charge_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, HttpError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());
    let outcome = recorder::handle_webhook(&state.ledger, &state.webhooks, &body, signature).await?;
    Ok(Json(WebhookAck {
        status: outcome.label(),
    }))
}
