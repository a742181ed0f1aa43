//! Registration, login and logout orchestration.

use std::sync::Arc;

use tracing::{info, warn};

use crate::entities::user;
use crate::error::{LedgerError, LedgerResult};
use crate::ledger::{Ledger, NewUser};

use super::{Principal, SessionStore, parse_role, password};

const MIN_USERNAME_LEN: usize = 3;
const MAX_USERNAME_LEN: usize = 64;
const MIN_PASSWORD_LEN: usize = 8;
const MAX_PASSWORD_LEN: usize = 256;

#[derive(Debug)]
pub struct RegisterInput {
    pub username: String,
    pub password: String,
    pub role: String,
}

#[derive(Debug)]
pub struct LoginInput {
    pub username: String,
    pub password: String,
}

#[derive(Debug)]
pub struct LoginOutput {
    /// Opaque bearer token for the `Authorization` header
    pub token: String,
    pub user: user::Model,
}

#[derive(Clone)]
pub struct AuthService {
    ledger: Ledger,
    sessions: Arc<SessionStore>,
    pepper: Option<Arc<str>>,
}

impl AuthService {
    pub fn new(ledger: Ledger, sessions: Arc<SessionStore>, pepper: Option<String>) -> Self {
        Self {
            ledger,
            sessions,
            pepper: pepper.map(Arc::from),
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub async fn register(&self, input: RegisterInput) -> LedgerResult<user::Model> {
        let username = validate_username(&input.username)?;
        validate_password(&input.password)?;
        let role = parse_role(&input.role)?;

        if self.ledger.find_user_by_username(&username).await?.is_some() {
            return Err(LedgerError::Conflict(format!(
                "username {username} is already taken"
            )));
        }

        let pepper = self.pepper.clone();
        let password = input.password;
        let password_hash = tokio::task::spawn_blocking(move || {
            password::hash_password(&password, pepper.as_deref())
        })
        .await
        .map_err(|err| LedgerError::Internal(format!("hashing task failed: {err}")))??;

        let created = self
            .ledger
            .create_user(NewUser {
                username,
                password_hash,
                role,
            })
            .await?;
        info!(user_id = created.id, role = created.role.as_str(), "user registered");
        Ok(created)
    }

    pub async fn login(&self, input: LoginInput) -> LedgerResult<LoginOutput> {
        if input.username.is_empty() || input.password.is_empty() {
            return Err(LedgerError::validation("username and password are required"));
        }

        let found = self.ledger.find_user_by_username(input.username.trim()).await?;
        let stored_hash = found
            .as_ref()
            .map_or_else(|| password::UNKNOWN_USER_HASH.to_string(), |user| user.password_hash.clone());

        let pepper = self.pepper.clone();
        let password = input.password;
        let valid = tokio::task::spawn_blocking(move || {
            password::verify_password(&password, &stored_hash, pepper.as_deref())
        })
        .await
        .map_err(|err| LedgerError::Internal(format!("verification task failed: {err}")))??;

        let found = match found {
            Some(user) if valid => user,
            Some(user) => {
                warn!(user_id = user.id, "login rejected: bad credentials");
                return Err(LedgerError::Unauthenticated);
            }
            None => {
                warn!("login rejected: unknown username");
                return Err(LedgerError::Unauthenticated);
            }
        };

        let token = self
            .sessions
            .issue(Principal {
                user_id: found.id,
                role: found.role,
            })
            .await;
        Ok(LoginOutput { token, user: found })
    }

    pub async fn logout(&self, token: &str) {
        self.sessions.revoke(token).await;
    }

    pub async fn authenticate(&self, token: &str) -> LedgerResult<Principal> {
        self.sessions
            .resolve(token)
            .await
            .ok_or(LedgerError::Unauthenticated)
    }

    pub async fn current_user(&self, principal: &Principal) -> LedgerResult<user::Model> {
        self.ledger
            .find_user(principal.user_id)
            .await?
            .ok_or(LedgerError::Unauthenticated)
    }
}

fn validate_username(value: &str) -> LedgerResult<String> {
    let trimmed = value.trim();
    let length = trimmed.chars().count();
    if !(MIN_USERNAME_LEN..=MAX_USERNAME_LEN).contains(&length) {
        return Err(LedgerError::validation(format!(
            "username must be {MIN_USERNAME_LEN}-{MAX_USERNAME_LEN} characters"
        )));
    }
    if trimmed.chars().any(char::is_whitespace) {
        return Err(LedgerError::validation("username must not contain whitespace"));
    }
    Ok(trimmed.to_string())
}

fn validate_password(value: &str) -> LedgerResult<()> {
    let length = value.chars().count();
    if !(MIN_PASSWORD_LEN..=MAX_PASSWORD_LEN).contains(&length) {
        return Err(LedgerError::validation(format!(
            "password must be {MIN_PASSWORD_LEN}-{MAX_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}
