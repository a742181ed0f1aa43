//! Authentication gate: identities, roles and the principal handed to
//! every mutating operation.

pub mod password;
pub mod service;
pub mod session;

pub use service::{AuthService, LoginInput, LoginOutput, RegisterInput};
pub use session::SessionStore;

use crate::entities::user::Role;
use crate::error::{LedgerError, LedgerResult};

/// Authenticated identity attached to an inbound request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub user_id: i64,
    pub role: Role,
}

impl Principal {
    pub fn require(&self, role: Role) -> LedgerResult<()> {
        if self.role == role {
            Ok(())
        } else {
            Err(LedgerError::forbidden(format!(
                "{} role required",
                role.as_str()
            )))
        }
    }
}

pub fn parse_role(value: &str) -> LedgerResult<Role> {
    match value.trim().to_ascii_lowercase().as_str() {
        "donor" => Ok(Role::Donor),
        "ngo" => Ok(Role::Ngo),
        other => Err(LedgerError::validation(format!("unknown role: {other}"))),
    }
}
