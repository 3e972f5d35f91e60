//! Identity collaborator: sign-up, sign-in, sign-out, an auth-state
//! subscription yielding the current user id (or `None`), and a stream of
//! per-user sign-in/sign-out events.
//!
//! `LocalIdentity` keeps PBKDF2-SHA256 password hashes in the `credentials`
//! table and writes the `Users/{uid}` profile document on sign-up.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use pbkdf2::pbkdf2_hmac;
use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tokio::sync::{broadcast, watch};
use uuid::Uuid;
use zeroize::Zeroizing;

use crate::config;
use crate::db::{self, DatabaseError, SqliteDocumentStore};
use crate::models::UserProfile;

const SALT_LENGTH: usize = 16;
const HASH_LENGTH: usize = 32;
const MIN_PASSWORD_LENGTH: usize = 6;

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("An account with this email already exists")]
    EmailInUse,
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("{0}")]
    Validation(String),
    #[error("Identity store error: {0}")]
    Store(#[from] DatabaseError),
}

/// An authenticated user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub uid: String,
    pub email: String,
}

/// One auth transition of one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    SignedIn(String),
    SignedOut(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct SignUpRequest {
    pub name: String,
    pub phone: String,
    pub email: String,
    pub password: String,
}

/// Identity operations the app relies on.
pub trait IdentityProvider: Send + Sync {
    fn sign_up(&self, request: &SignUpRequest) -> Result<AuthUser, IdentityError>;
    fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, IdentityError>;
    fn sign_out(&self, uid: &str);
    fn current_user(&self) -> Option<String>;
    /// Auth-state changes: the most recently signed-in user id, or `None`.
    fn subscribe(&self) -> watch::Receiver<Option<String>>;
    /// Every sign-in and sign-out, in order, tagged with the user id.
    fn auth_events(&self) -> broadcast::Receiver<AuthEvent>;
}

// ═══════════════════════════════════════════════════════════
// Password hashing
// ═══════════════════════════════════════════════════════════

fn generate_salt() -> [u8; SALT_LENGTH] {
    use rand::RngCore;
    let mut salt = [0u8; SALT_LENGTH];
    rand::thread_rng().fill_bytes(&mut salt);
    salt
}

fn derive_hash(password: &str, salt: &[u8], iterations: u32) -> Zeroizing<[u8; HASH_LENGTH]> {
    let mut out = Zeroizing::new([0u8; HASH_LENGTH]);
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut *out);
    out
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn validate_sign_up(request: &SignUpRequest) -> Result<(), IdentityError> {
    if request.name.trim().is_empty()
        || request.phone.trim().is_empty()
        || request.email.trim().is_empty()
        || request.password.is_empty()
    {
        return Err(IdentityError::Validation("Please fill in all fields.".into()));
    }
    let email = normalize_email(&request.email);
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => {}
        _ => return Err(IdentityError::Validation("Invalid email address.".into())),
    }
    if request.password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(IdentityError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters."
        )));
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════
// LocalIdentity
// ═══════════════════════════════════════════════════════════

pub struct LocalIdentity {
    store: Arc<SqliteDocumentStore>,
    iterations: u32,
    state: watch::Sender<Option<String>>,
    events: broadcast::Sender<AuthEvent>,
}

impl LocalIdentity {
    pub fn new(store: Arc<SqliteDocumentStore>, iterations: u32) -> Self {
        let (state, _) = watch::channel(None);
        let (events, _) = broadcast::channel(config::AUTH_EVENT_CAPACITY);
        Self {
            store,
            iterations,
            state,
            events,
        }
    }

    fn set_current(&self, uid: Option<String>) {
        self.state.send_replace(uid);
    }

    fn publish(&self, event: AuthEvent) {
        // Err only means nobody is listening.
        let _ = self.events.send(event);
    }
}

impl IdentityProvider for LocalIdentity {
    fn sign_up(&self, request: &SignUpRequest) -> Result<AuthUser, IdentityError> {
        validate_sign_up(request)?;

        let email = normalize_email(&request.email);
        let uid = Uuid::new_v4().simple().to_string();
        let salt = generate_salt();
        let hash = derive_hash(&request.password, &salt, self.iterations);

        let inserted = self.store.with_conn(|conn| {
            let exists: Option<String> = conn
                .query_row(
                    "SELECT user_id FROM credentials WHERE email = ?1",
                    params![email],
                    |row| row.get(0),
                )
                .optional()?;
            if exists.is_some() {
                return Ok(false);
            }
            conn.execute(
                "INSERT INTO credentials (user_id, email, password_salt, password_hash, iterations)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    uid,
                    email,
                    STANDARD.encode(salt),
                    STANDARD.encode(&hash[..]),
                    self.iterations,
                ],
            )?;
            Ok(true)
        })?;

        if !inserted {
            tracing::warn!("Sign-up rejected: email already registered");
            return Err(IdentityError::EmailInUse);
        }

        let profile = UserProfile {
            id: String::new(),
            name: Some(request.name.trim().to_string()),
            phone: Some(request.phone.trim().to_string()),
            email: Some(email.clone()),
            push_token: None,
        };
        db::set_user(self.store.as_ref(), &uid, &profile)?;

        tracing::info!(uid = %uid, "User signed up");
        self.set_current(Some(uid.clone()));
        self.publish(AuthEvent::SignedIn(uid.clone()));
        Ok(AuthUser { uid, email })
    }

    fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, IdentityError> {
        let email = normalize_email(email);

        let row: Option<(String, String, String, u32)> = self.store.with_conn(|conn| {
            Ok(conn
                .query_row(
                    "SELECT user_id, password_salt, password_hash, iterations
                     FROM credentials WHERE email = ?1",
                    params![email],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
                )
                .optional()?)
        })?;

        let Some((uid, salt, stored, iterations)) = row else {
            tracing::warn!("Sign-in failed: unknown email");
            return Err(IdentityError::InvalidCredentials);
        };

        let salt = STANDARD
            .decode(salt)
            .map_err(|e| DatabaseError::ConstraintViolation(format!("corrupt salt: {e}")))?;
        let stored = STANDARD
            .decode(stored)
            .map_err(|e| DatabaseError::ConstraintViolation(format!("corrupt hash: {e}")))?;
        let candidate = derive_hash(password, &salt, iterations);

        if !bool::from(candidate[..].ct_eq(stored.as_slice())) {
            tracing::warn!(uid = %uid, "Sign-in failed: wrong password");
            return Err(IdentityError::InvalidCredentials);
        }

        tracing::info!(uid = %uid, "User signed in");
        self.set_current(Some(uid.clone()));
        self.publish(AuthEvent::SignedIn(uid.clone()));
        Ok(AuthUser { uid, email })
    }

    fn sign_out(&self, uid: &str) {
        let was_current = self.state.borrow().as_deref() == Some(uid);
        if was_current {
            self.set_current(None);
        }
        self.publish(AuthEvent::SignedOut(uid.to_string()));
        tracing::info!(uid, "User signed out");
    }

    fn current_user(&self) -> Option<String> {
        self.state.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<Option<String>> {
        self.state.subscribe()
    }

    fn auth_events(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }
}
