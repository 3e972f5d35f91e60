//! Shared API types: router context, per-request session, token helpers.

use std::sync::Arc;

use chrono::{Local, NaiveDate, NaiveDateTime};

use crate::core_state::{CoreState, TokenHash, UserContext};

/// Shared context for all API routes and middleware.
#[derive(Clone)]
pub struct ApiContext {
    pub core: Arc<CoreState>,
}

impl ApiContext {
    pub fn new(core: Arc<CoreState>) -> Self {
        Self { core }
    }
}

// ═══════════════════════════════════════════════════════════
// Auth session: injected by auth middleware
// ═══════════════════════════════════════════════════════════

/// The caller's bearer session, resolved by `require_auth`.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub token_hash: TokenHash,
    pub user: UserContext,
}

impl AuthSession {
    pub fn user_id(&self) -> &str {
        &self.user.user_id
    }
}

/// SHA-256 of a bearer token. Only hashes are kept server-side.
pub fn hash_token(token: &str) -> TokenHash {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().into()
}

/// Generate a random bearer token (URL-safe base64, 32 bytes of entropy).
pub fn generate_token() -> String {
    use base64::Engine;
    let bytes: [u8; 32] = rand::random();
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub fn now() -> NaiveDateTime {
    Local::now().naive_local()
}
