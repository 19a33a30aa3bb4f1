//! Errors from [`crate::store::KeyValueStore`] backends.

use std::fmt;

use thiserror::Error;

/// Coarse class of a failed `SQLite` call, used for log fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreDbErrorKind {
    BusyOrLocked,
    ConstraintViolation,
    PoolTimeout,
    PoolClosed,
    Io,
    Protocol,
    Other,
}

impl StoreDbErrorKind {
    #[must_use]
    pub fn from_sqlx(error: &sqlx::Error) -> Self {
        match error {
            sqlx::Error::PoolTimedOut => Self::PoolTimeout,
            sqlx::Error::PoolClosed => Self::PoolClosed,
            sqlx::Error::Io(_) => Self::Io,
            sqlx::Error::Protocol(_) => Self::Protocol,
            sqlx::Error::Database(db_error) => Self::from_database(db_error.as_ref()),
            _ => Self::Other,
        }
    }

    fn from_database(db_error: &(dyn sqlx::error::DatabaseError + 'static)) -> Self {
        // Primary result codes: 5 = SQLITE_BUSY, 6 = SQLITE_LOCKED.
        let code = db_error.code();
        let code = code.as_deref().unwrap_or_default();
        if matches!(code, "5" | "6" | "SQLITE_BUSY" | "SQLITE_LOCKED") {
            Self::BusyOrLocked
        } else if db_error.is_unique_violation() || code.starts_with("SQLITE_CONSTRAINT") {
            Self::ConstraintViolation
        } else if db_error.message().contains("database is locked") {
            Self::BusyOrLocked
        } else {
            Self::Other
        }
    }
}

impl fmt::Display for StoreDbErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::BusyOrLocked => "busy_or_locked",
            Self::ConstraintViolation => "constraint_violation",
            Self::PoolTimeout => "pool_timeout",
            Self::PoolClosed => "pool_closed",
            Self::Io => "io",
            Self::Protocol => "protocol",
            Self::Other => "other",
        })
    }
}

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("store read/write failed ({kind}): {message}")]
    Database { kind: StoreDbErrorKind, message: String },

    /// A single value exceeded the per-value byte quota.
    #[error(
        "value for '{key}' is {size} bytes, over the {limit} byte quota\n  Suggestion: Clear cached images or remove unused animals"
    )]
    QuotaExceeded { key: String, size: usize, limit: usize },
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database {
            kind: StoreDbErrorKind::from_sqlx(&err),
            message: err.to_string(),
        }
    }
}

impl StoreError {
    #[must_use]
    pub fn quota_exceeded(key: &str, size: usize, limit: usize) -> Self {
        Self::QuotaExceeded {
            key: key.to_string(),
            size,
            limit,
        }
    }

    #[must_use]
    pub fn database_kind(&self) -> Option<StoreDbErrorKind> {
        match self {
            Self::Database { kind, .. } => Some(*kind),
            Self::QuotaExceeded { .. } => None,
        }
    }

    #[must_use]
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, Self::QuotaExceeded { .. })
    }
}
