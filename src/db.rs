//! `SQLite` pool backing the catalog and the image cache.
//!
//! Opening a [`Database`] creates the file when missing, switches it to WAL so
//! a listing can read while a refresh writes, and applies the `kv_store`
//! migration. [`crate::store::SqliteStore`] is the only consumer.
//!
//! ```no_run
//! use animal_catalog_core::{Database, DatabaseOptions};
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = Database::new(Path::new("catalog.db"), DatabaseOptions::default()).await?;
//! db.close().await;
//! # Ok(())
//! # }
//! ```

use std::path::Path;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use thiserror::Error;
use tracing::{debug, instrument};

/// Pool size when the config file does not set `db_max_connections`.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Lock wait before a write gives up with `SQLITE_BUSY`.
pub const DEFAULT_BUSY_TIMEOUT_MS: u32 = 5000;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("cannot open catalog database: {0}\n  Suggestion: Check that the --db path is writable")]
    Connection(#[from] sqlx::Error),

    #[error("catalog database schema upgrade failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Pool tuning knobs, usually sourced from the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatabaseOptions {
    pub max_connections: u32,
    /// `busy_timeout` in milliseconds.
    pub busy_timeout_ms: u32,
}

impl Default for DatabaseOptions {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }
}

/// Shared handle to the catalog database. Cloning shares the pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens (or creates) the database file at `db_path` and migrates it.
    ///
    /// # Errors
    ///
    /// [`DbError::Connection`] if the file cannot be opened,
    /// [`DbError::Migration`] if the schema cannot be applied.
    #[instrument(skip(db_path, options), fields(path = %db_path.display()))]
    pub async fn new(db_path: &Path, options: DatabaseOptions) -> Result<Self, DbError> {
        let connect = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_millis(u64::from(options.busy_timeout_ms)));

        let pool = SqlitePoolOptions::new()
            .max_connections(options.max_connections.max(1))
            .connect_with(connect)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;
        debug!(max_connections = options.max_connections, "catalog database ready");
        Ok(Self { pool })
    }

    /// Single-connection in-memory database. Every connection to
    /// `sqlite::memory:` is a separate database, so the pool is capped at one.
    ///
    /// # Errors
    ///
    /// Same as [`Database::new`].
    #[instrument]
    pub async fn new_in_memory() -> Result<Self, DbError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// True when the journal mode is WAL. In-memory databases report `memory`.
    ///
    /// # Errors
    ///
    /// [`DbError::Connection`] if the pragma query fails.
    pub async fn is_wal_enabled(&self) -> Result<bool, DbError> {
        let (mode,): (String,) = sqlx::query_as("PRAGMA journal_mode").fetch_one(&self.pool).await?;
        Ok(mode.eq_ignore_ascii_case("wal"))
    }

    /// Closes every pooled connection and waits for them to finish.
    pub async fn close(self) {
        self.pool.close().await;
    }
}
