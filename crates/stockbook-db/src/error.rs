//! # Database Error Types
//!
//! Error types for storage operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)        CoreError (stock, validation)       │
//! │       │                                  │                              │
//! │       ▼                                  ▼                              │
//! │  DbError (this module) ◄─────────────────┘                              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbError::kind() → ErrorKind  (what a caller maps to a response)       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use stockbook_core::{CoreError, ValidationError};
use thiserror::Error;

/// Coarse classification of every failure a caller can see.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Malformed or invariant-breaking input. Nothing was written.
    Validation,
    /// A stock row would go negative. Nothing was written.
    InsufficientStock,
    /// A referenced entity does not exist.
    NotFound,
    /// Unique or foreign key constraint hit by a concurrent or stale write.
    Conflict,
    /// Anything else: connection, migration, I/O, config.
    Storage,
}

/// Storage operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// Domain rule failure raised inside a transaction.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Entity not found in database.
    ///
    /// ## When This Occurs
    /// - `fetch_optional` returns no row for an id the caller supplied
    /// - A purchase or sale line references an unknown product or location
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation.
    ///
    /// ## When This Occurs
    /// - Duplicate barcode or location name
    /// - Duplicate section name within a channel
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Foreign key constraint violation.
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// Database connection failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Configuration file or environment could not be used.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal database error.
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

    /// Creates a UniqueViolation error.
    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Classifies the error for callers.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DbError::Core(CoreError::Validation(_)) => ErrorKind::Validation,
            DbError::Core(CoreError::InsufficientStock { .. }) => ErrorKind::InsufficientStock,
            DbError::Core(CoreError::ProductNotFound(_)) | DbError::NotFound { .. } => {
                ErrorKind::NotFound
            }
            DbError::UniqueViolation { .. } | DbError::ForeignKeyViolation { .. } => {
                ErrorKind::Conflict
            }
            DbError::ConnectionFailed(_)
            | DbError::MigrationFailed(_)
            | DbError::QueryFailed(_)
            | DbError::PoolExhausted
            | DbError::Config(_)
            | DbError::Internal(_) => ErrorKind::Storage,
        }
    }
}

impl From<ValidationError> for DbError {
    fn from(err: ValidationError) -> Self {
        DbError::Core(CoreError::Validation(err))
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound
/// sqlx::Error::Database       → Analyze message for constraint type
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: "Record".to_string(),
                id: "unknown".to_string(),
            },

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                // UNIQUE constraint: "UNIQUE constraint failed: <table>.<column>"
                // FK constraint: "FOREIGN KEY constraint failed"
                if msg.contains("UNIQUE constraint failed") {
                    let field = msg
                        .split("UNIQUE constraint failed: ")
                        .nth(1)
                        .unwrap_or("unknown")
                        .to_string();
                    DbError::UniqueViolation {
                        field,
                        value: "unknown".to_string(),
                    }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else {
                    DbError::QueryFailed(msg.to_string())
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

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        let stock: DbError = CoreError::InsufficientStock {
            product_id: "P".into(),
            location_id: "L".into(),
            available: 1,
            requested: 2,
        }
        .into();
        assert_eq!(stock.kind(), ErrorKind::InsufficientStock);

        let invalid: DbError = ValidationError::required("items").into();
        assert_eq!(invalid.kind(), ErrorKind::Validation);

        assert_eq!(DbError::not_found("Sale", "x").kind(), ErrorKind::NotFound);
        assert_eq!(DbError::duplicate("barcode", "X").kind(), ErrorKind::Conflict);
        assert_eq!(DbError::PoolExhausted.kind(), ErrorKind::Storage);
    }

    #[test]
    fn test_error_kind_serializes_screaming_snake() {
        let json = serde_json::to_string(&ErrorKind::InsufficientStock).unwrap();
        assert_eq!(json, "\"INSUFFICIENT_STOCK\"");
    }
}
