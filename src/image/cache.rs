//! Time-limited cache of resolution outcomes.
//!
//! Entries live in the shared [`KeyValueStore`] under `animal-image-{subject}`.
//! Every storage or serialization failure is logged and treated as a miss or
//! a no-op write.

use std::sync::Arc;

use tracing::{debug, warn};

use super::{CacheEntry, ImageCandidate};
use crate::clock::{DAY_MS, now_millis};
use crate::store::KeyValueStore;

/// Entries older than this are evicted on read.
pub const CACHE_TTL_MS: i64 = DAY_MS;

const KEY_PREFIX: &str = "animal-image-";

/// Store key for a subject key.
#[must_use]
pub fn cache_key(subject_key: &str) -> String {
    format!("{KEY_PREFIX}{subject_key}")
}

#[derive(Clone)]
pub struct ImageCache {
    store: Arc<dyn KeyValueStore>,
}

impl std::fmt::Debug for ImageCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageCache").finish_non_exhaustive()
    }
}

impl ImageCache {
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Returns the live entry for `subject_key`, if any.
    pub async fn get(&self, subject_key: &str) -> Option<CacheEntry> {
        self.get_at(subject_key, now_millis()).await
    }

    /// [`get`](Self::get) against an explicit clock.
    pub async fn get_at(&self, subject_key: &str, now: i64) -> Option<CacheEntry> {
        let key = cache_key(subject_key);
        let raw = match self.store.get(&key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(error) => {
                warn!(key = %key, error = %error, "image cache read failed");
                return None;
            }
        };

        let entry: CacheEntry = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(error) => {
                warn!(key = %key, error = %error, "discarding unreadable image cache entry");
                self.evict(&key).await;
                return None;
            }
        };

        if now - entry.timestamp > CACHE_TTL_MS {
            debug!(key = %key, age_ms = now - entry.timestamp, "image cache entry expired");
            self.evict(&key).await;
            return None;
        }
        Some(entry)
    }

    /// Stores an outcome stamped with the current time, replacing any prior entry.
    pub async fn put(&self, subject_key: &str, selected: Option<String>, candidates: Vec<ImageCandidate>) {
        self.put_at(subject_key, selected, candidates, now_millis()).await;
    }

    /// [`put`](Self::put) against an explicit clock.
    pub async fn put_at(
        &self,
        subject_key: &str,
        selected: Option<String>,
        candidates: Vec<ImageCandidate>,
        now: i64,
    ) {
        let key = cache_key(subject_key);
        let entry = CacheEntry {
            selected,
            candidates,
            timestamp: now,
        };
        let raw = match serde_json::to_string(&entry) {
            Ok(raw) => raw,
            Err(error) => {
                warn!(key = %key, error = %error, "image cache entry not serializable");
                return;
            }
        };
        if let Err(error) = self.store.set(&key, &raw).await {
            warn!(key = %key, error = %error, "image cache write failed");
        }
    }

    async fn evict(&self, key: &str) {
        if let Err(error) = self.store.remove(key).await {
            warn!(key = %key, error = %error, "image cache eviction failed");
        }
    }
}
