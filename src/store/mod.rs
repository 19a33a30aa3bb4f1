//! Device-local key-value persistence.
//!
//! The catalog records, favorites and the image cache all live in one flat
//! keyed table. Each record owns its own key, so writers only touch what they
//! change; last write wins.
//!
//! # Overview
//!
//! - [`KeyValueStore`] - Async trait every backend implements
//! - [`SqliteStore`] - `SQLite`-backed store on top of [`Database`]
//! - [`MemoryStore`] - Concurrent in-memory store (tests, ephemeral runs)
//! - [`StoreError`] - Operation error types
//!
//! Both backends enforce a per-value byte quota ([`DEFAULT_QUOTA_BYTES`]).

mod error;
mod memory;

pub use error::{StoreDbErrorKind, StoreError};
pub use memory::MemoryStore;

use async_trait::async_trait;
use sqlx::Row;
use tracing::instrument;

use crate::db::Database;

/// Default per-value quota (5 MiB).
pub const DEFAULT_QUOTA_BYTES: usize = 5 * 1024 * 1024;

/// Data-access contract for flat keyed storage.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Reads the value stored under `key`.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Writes `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Deletes `key`. Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// `SQLite`-backed key-value store.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    db: Database,
    quota_bytes: usize,
}

impl SqliteStore {
    /// Creates a store over the given database with the default quota.
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self::with_quota(db, DEFAULT_QUOTA_BYTES)
    }

    /// Creates a store with an explicit per-value quota in bytes.
    #[must_use]
    pub fn with_quota(db: Database, quota_bytes: usize) -> Self {
        Self { db, quota_bytes }
    }

    /// Returns the number of stored keys.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the query fails.
    pub async fn len(&self) -> Result<i64, StoreError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM kv_store")
            .fetch_one(self.db.pool())
            .await?;
        Ok(row.get("n"))
    }
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    #[instrument(skip(self))]
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let row = sqlx::query("SELECT value FROM kv_store WHERE key = ?")
            .bind(key)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(row.map(|r| r.get("value")))
    }

    #[instrument(skip(self, value), fields(size = value.len()))]
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        if value.len() > self.quota_bytes {
            return Err(StoreError::quota_exceeded(key, value.len(), self.quota_bytes));
        }

        sqlx::query(
            r"INSERT INTO kv_store (key, value, updated_at)
              VALUES (?, ?, strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
              ON CONFLICT(key) DO UPDATE SET
                  value = excluded.value,
                  updated_at = excluded.updated_at",
        )
        .bind(key)
        .bind(value)
        .execute(self.db.pool())
        .await?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM kv_store WHERE key = ?")
            .bind(key)
            .execute(self.db.pool())
            .await?;
        Ok(())
    }
}
