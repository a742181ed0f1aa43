//! Password hashing and verification using Argon2id.

use argon2::password_hash::SaltString;
use argon2::password_hash::rand_core::OsRng;
use argon2::{Argon2, PasswordHasher, PasswordVerifier};

use crate::error::{LedgerError, LedgerResult};

/// Stand-in hash for logins naming an unknown user, so that path pays the
/// same Argon2 cost as a wrong password. Parameters match `Argon2::default()`.
pub const UNKNOWN_USER_HASH: &str =
    "$argon2id$v=19$m=19456,t=2,p=1$c29tZXNhbHRzb21lc2FsdA$AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";

/// Hash a password into a PHC string with a fresh random salt.
///
/// If `pepper` is provided it is prepended to the password; verification
/// must use the same pepper.
pub fn hash_password(password: &str, pepper: Option<&str>) -> LedgerResult<String> {
    let peppered: String;
    let input = match pepper {
        Some(p) => {
            peppered = format!("{p}{password}");
            peppered.as_bytes()
        }
        None => password.as_bytes(),
    };

    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(input, &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| LedgerError::Internal(format!("password hashing failed: {e}")))
}

/// Verify a plaintext password against a stored PHC hash.
///
/// Returns `Ok(false)` on mismatch and an error only when the stored hash
/// cannot be parsed. Argon2 compares digests in constant time.
pub fn verify_password(password: &str, hash: &str, pepper: Option<&str>) -> LedgerResult<bool> {
    let peppered: String;
    let input = match pepper {
        Some(p) => {
            peppered = format!("{p}{password}");
            peppered.as_bytes()
        }
        None => password.as_bytes(),
    };

    let parsed_hash = argon2::PasswordHash::new(hash)
        .map_err(|e| LedgerError::Internal(format!("invalid stored hash: {e}")))?;

    match Argon2::default().verify_password(input, &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(LedgerError::Internal(format!("password verification failed: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn correct_password_matches() {
        let hash = hash_password("hunter2hunter2", None).unwrap();
        assert!(verify_password("hunter2hunter2", &hash, None).unwrap());
    }

    #[test]
    fn wrong_password_does_not_match() {
        let hash = hash_password("hunter2hunter2", None).unwrap();
        assert!(!verify_password("wrong-password", &hash, None).unwrap());
    }

    #[test]
    fn salts_differ_between_hashes() {
        let first = hash_password("same-password", None).unwrap();
        let second = hash_password("same-password", None).unwrap();
        assert_ne!(first, second);
        assert!(first.starts_with("$argon2id$"));
    }

    #[test]
    fn pepper_is_applied() {
        let hash = hash_password("hunter2hunter2", Some("pepper!")).unwrap();
        assert!(verify_password("hunter2hunter2", &hash, Some("pepper!")).unwrap());
        assert!(!verify_password("hunter2hunter2", &hash, None).unwrap());
    }

    #[test]
    fn unknown_user_hash_has_default_cost_and_never_matches() {
        let parsed = argon2::PasswordHash::new(UNKNOWN_USER_HASH).unwrap();
        let params = argon2::Params::try_from(&parsed).unwrap();
        let defaults = argon2::Params::default();
        assert_eq!(parsed.algorithm.as_str(), "argon2id");
        assert_eq!(params.m_cost(), defaults.m_cost());
        assert_eq!(params.t_cost(), defaults.t_cost());
        assert_eq!(params.p_cost(), defaults.p_cost());

        assert!(!verify_password("hunter2hunter2", UNKNOWN_USER_HASH, None).unwrap());
        assert!(!verify_password("hunter2hunter2", UNKNOWN_USER_HASH, Some("pepper!")).unwrap());
    }

    #[test]
    fn malformed_hash_returns_error() {
        assert!(verify_password("pw", "not-a-hash", None).is_err());
    }
}
