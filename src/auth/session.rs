//! Opaque bearer sessions held in a TTL-bounded cache.

use std::time::Duration;

use argon2::password_hash::rand_core::{OsRng, RngCore};
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use moka::future::Cache;

use super::Principal;

const TOKEN_BYTES: usize = 32;
const MAX_TOKEN_LEN: usize = 128;

pub struct SessionStore {
    sessions: Cache<String, Principal>,
}

impl SessionStore {
    pub fn new(ttl: Duration, max_capacity: u64) -> Self {
        assert!(ttl >= Duration::from_secs(1), "Session TTL must be positive");
        assert!(max_capacity > 0, "Session capacity must be positive");

        let sessions = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(ttl)
            .build();
        Self { sessions }
    }

    pub async fn issue(&self, principal: Principal) -> String {
        let mut bytes = [0u8; TOKEN_BYTES];
        OsRng.fill_bytes(&mut bytes);
        let token = URL_SAFE_NO_PAD.encode(bytes);
        self.sessions.insert(token.clone(), principal).await;
        token
    }

    pub async fn resolve(&self, token: &str) -> Option<Principal> {
        if token.is_empty() || token.len() > MAX_TOKEN_LEN {
            return None;
        }
        self.sessions.get(token).await
    }

    pub async fn revoke(&self, token: &str) {
        self.sessions.invalidate(token).await;
    }

    pub fn entry_count(&self) -> u64 {
        self.sessions.entry_count()
    }
}
