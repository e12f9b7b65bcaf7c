//! # Database Error Types
//!
//! Error types for ledger store operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)          ValidationError / CoreError       │
//! │       │                                      │                          │
//! │       ▼                                      ▼                          │
//! │  DbError (this module) ← classified: NotFound, Busy (retryable), ...   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  with_retry ← Busy past the retry budget becomes TransactionConflict   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ApiError ← { code, message } for the dashboard                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;
use thiserror::Error;

use glow_core::{CoreError, ValidationError};

/// SQLite result codes that mean "another writer got there first".
///
/// 5 BUSY, 6 LOCKED, 261 BUSY_RECOVERY, 262 LOCKED_SHAREDCACHE,
/// 517 BUSY_SNAPSHOT, 773 BUSY_TIMEOUT.
const SQLITE_CONFLICT_CODES: &[&str] = &["5", "6", "261", "262", "517", "773"];

/// Ledger store errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// A referenced customer, product, sale or other record is missing.
    ///
    /// ## When This Occurs
    /// - Draft sale names a customer or product that does not exist
    /// - Payment posted against an unknown sale
    /// - The sale's customer was removed
    ///
    /// Not retryable: the caller must surface it to the user.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// The optimistic-concurrency retry budget ran out.
    ///
    /// Nothing was written; the whole operation is safe to run again.
    #[error("{operation} conflicted with concurrent writes after {attempts} attempts")]
    TransactionConflict { operation: String, attempts: u32 },

    /// Malformed input, rejected before any store call.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A domain rule failed against freshly read state.
    #[error(transparent)]
    Domain(#[from] CoreError),

    /// The store reported a write conflict (busy / locked / stale snapshot).
    /// Retried by [`crate::retry::with_retry`]; callers only see it when an
    /// operation runs outside the retry loop.
    #[error("Write conflict: {0}")]
    Busy(String),

    /// Unique constraint violation.
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Foreign key constraint violation.
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Configuration could not be read or is inconsistent.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// True when the failed attempt should be re-run from scratch.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DbError::Busy(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, DbError::NotFound { .. })
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound        → DbError::NotFound
/// Database (BUSY/LOCKED/SNAPSHOT) → DbError::Busy   (retryable)
/// Database (UNIQUE)               → DbError::UniqueViolation
/// Database (FOREIGN KEY)          → DbError::ForeignKeyViolation
/// sqlx::Error::PoolTimedOut       → DbError::PoolExhausted
/// Other                           → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Record", "unknown"),

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message().to_string();
                let code = db_err.code().map(|c| c.into_owned());

                let is_conflict = code
                    .as_deref()
                    .map(|c| SQLITE_CONFLICT_CODES.contains(&c))
                    .unwrap_or(false)
                    || msg.contains("database is locked")
                    || msg.contains("database table is locked");

                if is_conflict {
                    DbError::Busy(msg)
                } else if db_err.is_unique_violation() {
                    // "UNIQUE constraint failed: <table>.<column>"
                    let field = msg
                        .split("UNIQUE constraint failed: ")
                        .nth(1)
                        .unwrap_or("unknown")
                        .to_string();
                    DbError::UniqueViolation {
                        field,
                        value: "unknown".to_string(),
                    }
                } else if db_err.is_foreign_key_violation() {
                    DbError::ForeignKeyViolation { message: msg }
                } else {
                    DbError::QueryFailed(msg)
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

impl From<serde_json::Error> for DbError {
    fn from(err: serde_json::Error) -> Self {
        DbError::Internal(format!("Serialization failed: {}", err))
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

// =============================================================================
// API Error
// =============================================================================

/// Error returned to UI event handlers.
///
/// ```json
/// { "code": "NOT_FOUND", "message": "Product not found: 9b2c..." }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Referenced record is missing; do not retry blindly.
    NotFound,

    /// Input or domain rule rejected.
    ValidationError,

    /// Concurrent writes won; the whole operation may be retried.
    TransactionConflict,

    /// Store failure.
    DatabaseError,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { .. } => ApiError::new(ErrorCode::NotFound, err.to_string()),
            DbError::Validation(e) => ApiError::new(ErrorCode::ValidationError, e.to_string()),
            DbError::Domain(e) => ApiError::new(ErrorCode::ValidationError, e.to_string()),
            DbError::UniqueViolation { .. } => {
                ApiError::new(ErrorCode::ValidationError, err.to_string())
            }
            DbError::TransactionConflict { .. } | DbError::Busy(_) => ApiError::new(
                ErrorCode::TransactionConflict,
                "The record was changed by someone else. Please try again.",
            ),
            DbError::ForeignKeyViolation { message } => {
                tracing::error!("Foreign key violation: {}", message);
                ApiError::new(ErrorCode::ValidationError, "Invalid reference")
            }
            other => {
                tracing::error!("Ledger store failure: {}", other);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}
