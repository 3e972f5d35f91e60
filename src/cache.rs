//! Read-through cache for reference data.
//!
//! The vaccine schedule is shared, read-only lookup data consulted by the
//! vaccine list, the record views and every reminder computation. It is
//! fetched once and kept for a fixed TTL. User-owned data is never cached.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::db::DatabaseError;

struct CacheEntry<T> {
    value: Arc<T>,
    fetched_at: Instant,
}

/// Single-value cache with time-based expiry.
pub struct TtlCache<T> {
    ttl: Duration,
    entry: Mutex<Option<CacheEntry<T>>>,
}

impl<T> TtlCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entry: Mutex::new(None),
        }
    }

    /// Return the cached value, or run `fetch` and cache its result.
    ///
    /// A failed fetch leaves the cache empty; the error goes to the caller.
    pub fn get_or_fetch(
        &self,
        fetch: impl FnOnce() -> Result<T, DatabaseError>,
    ) -> Result<Arc<T>, DatabaseError> {
        let mut entry = self.entry.lock().map_err(|_| DatabaseError::LockPoisoned)?;

        if let Some(cached) = entry.as_ref() {
            if cached.fetched_at.elapsed() < self.ttl {
                return Ok(Arc::clone(&cached.value));
            }
        }

        let value = Arc::new(fetch()?);
        *entry = Some(CacheEntry {
            value: Arc::clone(&value),
            fetched_at: Instant::now(),
        });
        Ok(value)
    }

    /// Drop the cached value so the next read refetches.
    pub fn invalidate(&self) {
        if let Ok(mut entry) = self.entry.lock() {
            *entry = None;
        }
    }
}
