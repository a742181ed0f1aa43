//! Error taxonomy shared by the ledger, checkout, webhook and withdrawal paths.

use sea_orm::DbErr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("authentication required")]
    Unauthenticated,

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("invalid input: {0}")]
    Validation(String),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("insufficient funds: requested {requested}, available {available}")]
    InsufficientFunds { requested: String, available: String },

    #[error("webhook signature is invalid")]
    InvalidSignature,

    #[error("malformed webhook event: {0}")]
    MalformedEvent(String),

    #[error("payment provider error: {0}")]
    PaymentProvider(String),

    #[error("database error: {0}")]
    Database(#[from] DbErr),

    #[error("internal error: {0}")]
    Internal(String),
}

impl LedgerError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;
