use std::time::Duration;

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::http::Method;
use axum::http::StatusCode;
use axum::http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::error::LedgerError;
use crate::state::AppState;

mod accounts;
mod donations;
mod extract;
mod ngos;
mod webhooks;
mod withdrawals;

pub use extract::SessionToken;

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([ACCEPT, AUTHORIZATION, CONTENT_TYPE])
        .max_age(Duration::from_secs(3600));

    let api = Router::new()
        .merge(accounts::router())
        .nest("/ngos", ngos::router())
        .nest("/donations", donations::router())
        .nest("/withdrawals", withdrawals::router())
        .nest("/webhooks", webhooks::router());

    Router::new()
        .route("/health", get(health_live))
        .route("/health/ready", get(health_ready))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn health_live(State(state): State<AppState>) -> Result<Json<HealthResponse>, HttpError> {
    let response = HealthResponse {
        status: "live",
        uptime_seconds: state.start_time.elapsed().as_secs(),
    };
    Ok(Json(response))
}

async fn health_ready(State(state): State<AppState>) -> Result<Json<ReadyResponse>, HttpError> {
    state.ledger.ping().await.map_err(|err| {
        error!("Readiness probe failed: {err}");
        HttpError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "database unavailable".to_string(),
        )
    })?;

    let response = ReadyResponse {
        status: "ready",
        active_sessions: state.auth.sessions().entry_count(),
    };
    Ok(Json(response))
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_seconds: u64,
}

#[derive(Debug, Serialize)]
struct ReadyResponse {
    status: &'static str,
    active_sessions: u64,
}

#[derive(Debug)]
pub struct HttpError {
    status: StatusCode,
    message: String,
}

impl HttpError {
    pub fn new(status: StatusCode, message: String) -> Self {
        assert!(status != StatusCode::OK, "Error status cannot be 200");
        assert!(!message.is_empty(), "Error message cannot be empty");
        Self { status, message }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<LedgerError> for HttpError {
    fn from(err: LedgerError) -> Self {
        let status = match &err {
            LedgerError::Unauthenticated | LedgerError::InvalidSignature => StatusCode::UNAUTHORIZED,
            LedgerError::Forbidden(_) => StatusCode::FORBIDDEN,
            LedgerError::Validation(_) | LedgerError::MalformedEvent(_) => StatusCode::BAD_REQUEST,
            LedgerError::NotFound { .. } => StatusCode::NOT_FOUND,
            LedgerError::Conflict(_) => StatusCode::CONFLICT,
            LedgerError::InsufficientFunds { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            LedgerError::PaymentProvider(_) => StatusCode::BAD_GATEWAY,
            LedgerError::Database(_) | LedgerError::Internal(_) => {
                error!("Request failed: {err}");
                return Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                );
            }
        };
        Self::new(status, err.to_string())
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        info!("HTTP error: {}", self.message);
        let body = Json(ErrorBody {
            error: self.message,
        });
        (self.status, body).into_response()
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ledger_errors_map_to_statuses() {
        let cases = [
            (LedgerError::Unauthenticated, StatusCode::UNAUTHORIZED),
            (LedgerError::forbidden("nope"), StatusCode::FORBIDDEN),
            (LedgerError::validation("bad"), StatusCode::BAD_REQUEST),
            (LedgerError::not_found("NGO", 4), StatusCode::NOT_FOUND),
            (LedgerError::Conflict("taken".into()), StatusCode::CONFLICT),
            (
                LedgerError::InsufficientFunds {
                    requested: "10".into(),
                    available: "5".into(),
                },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (LedgerError::InvalidSignature, StatusCode::UNAUTHORIZED),
            (LedgerError::MalformedEvent("x".into()), StatusCode::BAD_REQUEST),
            (LedgerError::PaymentProvider("down".into()), StatusCode::BAD_GATEWAY),
            (LedgerError::Internal("boom".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, expected) in cases {
            assert_eq!(HttpError::from(err).status(), expected);
        }
    }

    #[test]
    fn internal_details_are_not_exposed() {
        let err = HttpError::from(LedgerError::Internal("connection string leaked".into()));
        assert_eq!(err.message, "internal server error");
    }
}
