//! Push-notification collaborator.
//!
//! Device-token registration and local notification scheduling. Callers
//! treat every operation as fire-and-forget: a failure is logged and the
//! business action carries on.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::db::{self, DataStore, DatabaseError};

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Invalid device token")]
    InvalidToken,
    #[error("Notification store error: {0}")]
    Store(#[from] DatabaseError),
    #[error("Notification state lock poisoned")]
    LockPoisoned,
}

/// A notification delivered on the device at `fire_at` (local time).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalNotification {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub body: String,
    pub fire_at: NaiveDateTime,
}

pub trait Notifier: Send + Sync {
    fn register_device(&self, user_id: &str, token: &str) -> Result<(), NotifyError>;
    fn schedule(&self, notification: LocalNotification) -> Result<(), NotifyError>;
    fn cancel(&self, id: &str) -> Result<(), NotifyError>;
    fn is_scheduled(&self, id: &str) -> bool;
}

/// In-process notifier: device tokens are saved on the user document,
/// scheduled notifications are held in memory and delivered to the log.
pub struct LocalNotifier {
    store: Arc<dyn DataStore>,
    scheduled: Mutex<HashMap<String, LocalNotification>>,
}

impl LocalNotifier {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self {
            store,
            scheduled: Mutex::new(HashMap::new()),
        }
    }

    /// Remove and deliver every notification due at `now`.
    pub fn deliver_due(&self, now: NaiveDateTime) -> Vec<LocalNotification> {
        let Ok(mut scheduled) = self.scheduled.lock() else {
            tracing::warn!("Notification state lock poisoned, skipping delivery");
            return Vec::new();
        };

        let due: Vec<String> = scheduled
            .values()
            .filter(|n| n.fire_at <= now)
            .map(|n| n.id.clone())
            .collect();

        let mut delivered: Vec<LocalNotification> =
            due.iter().filter_map(|id| scheduled.remove(id)).collect();
        delivered.sort_by(|a, b| a.fire_at.cmp(&b.fire_at));

        for n in &delivered {
            tracing::info!(id = %n.id, user = %n.user_id, title = %n.title, "Delivering notification");
        }
        delivered
    }

    /// Poll for due notifications until the runtime shuts down.
    pub fn spawn_delivery_loop(self: Arc<Self>, period: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                self.deliver_due(chrono::Local::now().naive_local());
            }
        })
    }
}

impl Notifier for LocalNotifier {
    fn register_device(&self, user_id: &str, token: &str) -> Result<(), NotifyError> {
        let token = token.trim();
        if token.is_empty() || token.len() > 512 {
            return Err(NotifyError::InvalidToken);
        }
        db::update_push_token(self.store.as_ref(), user_id, token)?;
        tracing::info!(user_id, "Registered push token");
        Ok(())
    }

    fn schedule(&self, notification: LocalNotification) -> Result<(), NotifyError> {
        let mut scheduled = self.scheduled.lock().map_err(|_| NotifyError::LockPoisoned)?;
        tracing::debug!(id = %notification.id, fire_at = %notification.fire_at, "Scheduled notification");
        scheduled.insert(notification.id.clone(), notification);
        Ok(())
    }

    fn cancel(&self, id: &str) -> Result<(), NotifyError> {
        let mut scheduled = self.scheduled.lock().map_err(|_| NotifyError::LockPoisoned)?;
        if scheduled.remove(id).is_some() {
            tracing::debug!(id, "Cancelled notification");
        }
        Ok(())
    }

    fn is_scheduled(&self, id: &str) -> bool {
        self.scheduled
            .lock()
            .map(|s| s.contains_key(id))
            .unwrap_or(false)
    }
}
