use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::auth::{LoginInput, Principal, RegisterInput};
use crate::models::accounts::{LoginRequest, RegisterRequest, SessionResponse, UserView};
use crate::state::AppState;

use super::{HttpError, SessionToken};

const TOKEN_TYPE: &str = "Bearer";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/user", get(current_user))
}

async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<SessionResponse>), HttpError> {
    let user = state
        .auth
        .register(RegisterInput {
            username: payload.username,
            password: payload.password,
            role: payload.role,
        })
        .await?;
    let token = state
        .auth
        .sessions()
        .issue(Principal {
            user_id: user.id,
            role: user.role,
        })
        .await;

    let response = SessionResponse {
        token,
        token_type: TOKEN_TYPE,
        user: user.into(),
    };
    Ok((StatusCode::CREATED, Json(response)))
}

async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<SessionResponse>, HttpError> {
    let output = state
        .auth
        .login(LoginInput {
            username: payload.username,
            password: payload.password,
        })
        .await?;
    Ok(Json(SessionResponse {
        token: output.token,
        token_type: TOKEN_TYPE,
        user: output.user.into(),
    }))
}

async fn logout(State(state): State<AppState>, SessionToken(token): SessionToken) -> StatusCode {
    state.auth.logout(&token).await;
    StatusCode::NO_CONTENT
}

async fn current_user(
    State(state): State<AppState>,
    principal: Principal,
) -> Result<Json<UserView>, HttpError> {
    let user = state.auth.current_user(&principal).await?;
    Ok(Json(user.into()))
}
