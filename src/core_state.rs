//! Shared application state.
//!
//! `CoreState` owns the three collaborators (document store, identity,
//! notifications), the reference-data cache and the registry of signed-in
//! user contexts. Each context holds the signed-in user and the selected
//! child; it is created on sign-in, dropped on sign-out, and changed only
//! through `select_child`.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::NaiveDate;
use serde::Serialize;
use tokio::sync::broadcast;

use crate::cache::TtlCache;
use crate::config::{self, AppConfig};
use crate::db::{self, DataStore, DatabaseError, SqliteDocumentStore};
use crate::identity::{AuthEvent, AuthUser, IdentityError, IdentityProvider, LocalIdentity};
use crate::models::VaccineSchedule;
use crate::notifications::{LocalNotifier, Notifier};

/// Hash of a bearer token; contexts are keyed by it.
pub type TokenHash = [u8; 32];

// ═══════════════════════════════════════════════════════════
// Errors
// ═══════════════════════════════════════════════════════════

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Not signed in")]
    NoActiveSession,
    #[error("No child selected")]
    NoSelectedChild,
    #[error("{0}")]
    Validation(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Slot {label} on {date} is no longer available")]
    SlotUnavailable { date: NaiveDate, label: String },
    #[error("Identity error: {0}")]
    Identity(#[from] IdentityError),
    #[error("Lock poisoned")]
    LockPoisoned,
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

// ═══════════════════════════════════════════════════════════
// User context
// ═══════════════════════════════════════════════════════════

/// The signed-in user and their currently selected child.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserContext {
    pub user_id: String,
    pub email: String,
    pub selected_child_id: Option<String>,
}

impl UserContext {
    pub fn new(user: &AuthUser) -> Self {
        Self {
            user_id: user.uid.clone(),
            email: user.email.clone(),
            selected_child_id: None,
        }
    }

    pub fn require_child(&self) -> Result<&str, CoreError> {
        self.selected_child_id
            .as_deref()
            .ok_or(CoreError::NoSelectedChild)
    }
}

// ═══════════════════════════════════════════════════════════
// CoreState
// ═══════════════════════════════════════════════════════════

pub struct CoreState {
    store: Arc<dyn DataStore>,
    identity: Arc<dyn IdentityProvider>,
    notifier: Arc<dyn Notifier>,
    contexts: RwLock<HashMap<TokenHash, UserContext>>,
    schedule_cache: TtlCache<Vec<VaccineSchedule>>,
    /// Set when the bundled in-process notifier is in use.
    local_notifier: Option<Arc<LocalNotifier>>,
}

impl CoreState {
    pub fn new(
        store: Arc<dyn DataStore>,
        identity: Arc<dyn IdentityProvider>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            identity,
            notifier,
            contexts: RwLock::new(HashMap::new()),
            schedule_cache: TtlCache::new(Duration::from_secs(config::SCHEDULE_CACHE_TTL_SECS)),
            local_notifier: None,
        }
    }

    /// Build the bundled collaborators over an opened SQLite store.
    pub fn with_sqlite(store: SqliteDocumentStore, pbkdf2_iterations: u32) -> Self {
        let store = Arc::new(store);
        let identity = Arc::new(LocalIdentity::new(Arc::clone(&store), pbkdf2_iterations));
        let notifier = Arc::new(LocalNotifier::new(store.clone()));
        let mut core = Self::new(store, identity, notifier.clone());
        core.local_notifier = Some(notifier);
        core
    }

    /// Open the file-backed store under the configured data directory.
    pub fn open(config: &AppConfig) -> Result<Self, CoreError> {
        std::fs::create_dir_all(&config.data_dir).map_err(|e| {
            DatabaseError::ConstraintViolation(format!(
                "cannot create data dir {}: {e}",
                config.data_dir.display()
            ))
        })?;
        let store = SqliteDocumentStore::open(&config.database_path())?;
        tracing::info!(path = %config.database_path().display(), "Document store opened");
        Ok(Self::with_sqlite(store, config.pbkdf2_iterations))
    }

    pub fn open_in_memory(pbkdf2_iterations: u32) -> Result<Self, CoreError> {
        Ok(Self::with_sqlite(
            SqliteDocumentStore::open_in_memory()?,
            pbkdf2_iterations,
        ))
    }

    // ── Collaborators ───────────────────────────────────────

    pub fn store(&self) -> &dyn DataStore {
        self.store.as_ref()
    }

    pub fn identity(&self) -> &dyn IdentityProvider {
        self.identity.as_ref()
    }

    pub fn notifier(&self) -> &dyn Notifier {
        self.notifier.as_ref()
    }

    /// The master vaccine schedule, served from cache while fresh.
    pub fn vaccine_schedule(&self) -> Result<Arc<Vec<VaccineSchedule>>, CoreError> {
        Ok(self
            .schedule_cache
            .get_or_fetch(|| db::list_schedule(self.store()))?)
    }

    pub fn invalidate_schedule(&self) {
        self.schedule_cache.invalidate();
    }

    // ── User contexts ───────────────────────────────────────

    /// Register a context for a freshly authenticated user.
    pub fn begin_session(&self, token_hash: TokenHash, user: &AuthUser) -> Result<(), CoreError> {
        let mut contexts = self.contexts.write().map_err(|_| CoreError::LockPoisoned)?;
        contexts.insert(token_hash, UserContext::new(user));
        Ok(())
    }

    pub fn context(&self, token_hash: &TokenHash) -> Result<Option<UserContext>, CoreError> {
        let contexts = self.contexts.read().map_err(|_| CoreError::LockPoisoned)?;
        Ok(contexts.get(token_hash).cloned())
    }

    /// Drop one session and tell the identity provider.
    pub fn end_session(&self, token_hash: &TokenHash) -> Result<Option<UserContext>, CoreError> {
        let removed = {
            let mut contexts = self.contexts.write().map_err(|_| CoreError::LockPoisoned)?;
            contexts.remove(token_hash)
        };
        if let Some(ctx) = &removed {
            self.identity.sign_out(&ctx.user_id);
        }
        Ok(removed)
    }

    /// Drop every session of a user (auth state went to signed-out).
    pub fn clear_user(&self, user_id: &str) -> Result<usize, CoreError> {
        let mut contexts = self.contexts.write().map_err(|_| CoreError::LockPoisoned)?;
        let before = contexts.len();
        contexts.retain(|_, ctx| ctx.user_id != user_id);
        Ok(before - contexts.len())
    }

    /// Set the selected child after checking the user owns it.
    pub fn select_child(
        &self,
        token_hash: &TokenHash,
        child_id: &str,
    ) -> Result<UserContext, CoreError> {
        let user_id = self
            .context(token_hash)?
            .ok_or(CoreError::NoActiveSession)?
            .user_id;

        if db::get_child(self.store(), &user_id, child_id)?.is_none() {
            return Err(CoreError::NotFound(format!("Child {child_id}")));
        }

        let mut contexts = self.contexts.write().map_err(|_| CoreError::LockPoisoned)?;
        let ctx = contexts
            .get_mut(token_hash)
            .ok_or(CoreError::NoActiveSession)?;
        ctx.selected_child_id = Some(child_id.to_string());
        Ok(ctx.clone())
    }

    /// Forget a deleted child in every context that had it selected.
    pub fn forget_child(&self, child_id: &str) {
        if let Ok(mut contexts) = self.contexts.write() {
            for ctx in contexts.values_mut() {
                if ctx.selected_child_id.as_deref() == Some(child_id) {
                    ctx.selected_child_id = None;
                }
            }
        }
    }

    /// Start delivering due local notifications every `period`.
    /// `None` when notifications go to an external service.
    pub fn spawn_notification_delivery(
        &self,
        period: Duration,
    ) -> Option<tokio::task::JoinHandle<()>> {
        self.local_notifier
            .as_ref()
            .map(|n| Arc::clone(n).spawn_delivery_loop(period))
    }

    /// Follow the identity provider's auth events: when a user signs out
    /// through the provider, that user's contexts are torn down.
    pub fn watch_auth_state(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        let mut rx = self.identity.auth_events();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(AuthEvent::SignedOut(uid)) => match self.clear_user(&uid) {
                        Ok(n) if n > 0 => {
                            tracing::info!(user = %uid, n, "Cleared contexts after sign-out")
                        }
                        Ok(_) => {}
                        Err(e) => tracing::warn!(error = %e, "Failed to clear contexts"),
                    },
                    Ok(AuthEvent::SignedIn(_)) => {}
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        tracing::warn!(missed, "Auth event watcher lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::SignUpRequest;
    use crate::models::Child;

    fn test_core() -> Arc<CoreState> {
        Arc::new(CoreState::open_in_memory(1_000).unwrap())
    }

    fn sign_up(core: &CoreState, email: &str) -> AuthUser {
        core.identity()
            .sign_up(&SignUpRequest {
                name: "Test".into(),
                phone: "0700000000".into(),
                email: email.into(),
                password: "password1".into(),
            })
            .unwrap()
    }

    fn add_child(core: &CoreState, user_id: &str) -> String {
        let child = Child {
            id: String::new(),
            name: Some("Nila".into()),
            gender: None,
            birthday: NaiveDate::from_ymd_opt(2025, 1, 1),
            measurements: Default::default(),
        };
        db::insert_child(core.store(), user_id, &child).unwrap()
    }

    #[test]
    fn session_lifecycle() {
        let core = test_core();
        let user = sign_up(&core, "a@b.lk");
        let hash = [7u8; 32];

        core.begin_session(hash, &user).unwrap();
        let ctx = core.context(&hash).unwrap().unwrap();
        assert_eq!(ctx.user_id, user.uid);
        assert!(ctx.selected_child_id.is_none());

        core.end_session(&hash).unwrap();
        assert!(core.context(&hash).unwrap().is_none());
        assert!(core.identity().current_user().is_none());
    }

    #[test]
    fn select_child_requires_ownership() {
        let core = test_core();
        let owner = sign_up(&core, "owner@b.lk");
        let other = sign_up(&core, "other@b.lk");
        let child_id = add_child(&core, &owner.uid);

        let owner_hash = [1u8; 32];
        let other_hash = [2u8; 32];
        core.begin_session(owner_hash, &owner).unwrap();
        core.begin_session(other_hash, &other).unwrap();

        let ctx = core.select_child(&owner_hash, &child_id).unwrap();
        assert_eq!(ctx.require_child().unwrap(), child_id);

        let err = core.select_child(&other_hash, &child_id).unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));
    }

    #[test]
    fn require_child_without_selection() {
        let ctx = UserContext {
            user_id: "u".into(),
            email: "e".into(),
            selected_child_id: None,
        };
        assert!(matches!(ctx.require_child(), Err(CoreError::NoSelectedChild)));
    }

    #[test]
    fn forget_child_clears_selection() {
        let core = test_core();
        let user = sign_up(&core, "a@b.lk");
        let child_id = add_child(&core, &user.uid);
        let hash = [3u8; 32];
        core.begin_session(hash, &user).unwrap();
        core.select_child(&hash, &child_id).unwrap();

        core.forget_child(&child_id);
        assert!(core.context(&hash).unwrap().unwrap().selected_child_id.is_none());
    }

    #[test]
    fn schedule_is_cached_until_invalidated() {
        let core = test_core();
        assert!(core.vaccine_schedule().unwrap().is_empty());

        db::insert_schedule_entry(core.store(), "bcg", &VaccineSchedule::default()).unwrap();
        assert!(core.vaccine_schedule().unwrap().is_empty());

        core.invalidate_schedule();
        assert_eq!(core.vaccine_schedule().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn provider_sign_out_clears_contexts() {
        let core = test_core();
        let user = sign_up(&core, "a@b.lk");
        core.begin_session([9u8; 32], &user).unwrap();

        let handle = Arc::clone(&core).watch_auth_state();
        core.identity().sign_out(&user.uid);

        for _ in 0..50 {
            if core.context(&[9u8; 32]).unwrap().is_none() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(core.context(&[9u8; 32]).unwrap().is_none());
        handle.abort();
    }

    #[tokio::test]
    async fn sign_out_only_clears_that_user() {
        let core = test_core();
        let a = sign_up(&core, "a@b.lk");
        core.begin_session([1u8; 32], &a).unwrap();

        let handle = Arc::clone(&core).watch_auth_state();
        tokio::task::yield_now().await;

        // B signs in and out before the watcher gets to run again.
        let b = sign_up(&core, "b@b.lk");
        core.begin_session([2u8; 32], &b).unwrap();
        core.end_session(&[2u8; 32]).unwrap();

        for _ in 0..20 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(core.context(&[1u8; 32]).unwrap().unwrap().user_id, a.uid);
        assert!(core.context(&[2u8; 32]).unwrap().is_none());
        handle.abort();
    }
}
