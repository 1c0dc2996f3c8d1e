//! # Database Error Types
//!
//! Error types for database operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                      Error Propagation                              │
//! │                                                                     │
//! │  SQLite Error (sqlx::Error)                                         │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  DbError (this module) ← adds context and categorization            │
//! │       ▲                                                             │
//! │       │                                                             │
//! │  CoreError (atlas-core) ← business rule violations pass through     │
//! │                           transparently, message unchanged          │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Business errors (insufficient stock, unknown product, conflict) are
//! `CoreError` values wrapped in `DbError::Domain`; callers can match on
//! them without losing the distinction from infrastructure failures.

use atlas_core::CoreError;
use thiserror::Error;

/// Database operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// A business rule rejected the operation. The message comes straight
    /// from the domain error.
    #[error(transparent)]
    Domain(#[from] CoreError),

    /// Unique constraint violation.
    ///
    /// ## When This Occurs
    /// - Inserting a duplicate SKU
    /// - Any UNIQUE index violation
    #[error("duplicate {field}: already exists")]
    UniqueViolation { field: String },

    /// Foreign key constraint violation.
    #[error("foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// Database connection failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("query failed: {0}")]
    QueryFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("connection pool exhausted")]
    PoolExhausted,

    /// Internal database error.
    #[error("internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Whether this error is a business rule violation (safe to show to the
    /// caller as-is) rather than an infrastructure failure.
    pub fn is_domain(&self) -> bool {
        matches!(self, DbError::Domain(_))
    }

    /// Whether this error is SQLite reporting a lock held by a concurrent
    /// writer (SQLITE_BUSY / SQLITE_BUSY_SNAPSHOT / SQLITE_LOCKED).
    ///
    /// Under WAL a deferred transaction takes its read snapshot at the
    /// first read; if another writer commits before our UPDATE, the lock
    /// upgrade fails with a busy error rather than a zero-row guard miss.
    /// Write loops treat both the same way: roll back and retry.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DbError::QueryFailed(msg)
                if msg.contains("database is locked")
                    || msg.contains("database table is locked")
        )
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::Database     → analyze message for constraint type
/// sqlx::Error::PoolTimedOut → DbError::PoolExhausted
/// Other                     → DbError::Internal
/// ```
///
/// `RowNotFound` deliberately maps to Internal: repositories use
/// `fetch_optional` and raise typed `CoreError::*NotFound` themselves, so a
/// bare RowNotFound here means a repository bug.
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                // SQLite constraint messages:
                // "UNIQUE constraint failed: <table>.<column>"
                // "FOREIGN KEY constraint failed"
                if msg.contains("UNIQUE constraint failed") {
                    let field = msg
                        .split("UNIQUE constraint failed: ")
                        .nth(1)
                        .unwrap_or("unknown")
                        .to_string();
                    DbError::UniqueViolation { field }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;
