//! # Database Error Types
//!
//! Error types for database operations and the ledger built on them.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)          CoreError (dues-core)              │
//! │       │                                   │                             │
//! │       ▼                                   ▼                             │
//! │  DbError ◄──────────── DbError::Domain ◄──┘                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  `?` out of the unit of work → transaction dropped → ROLLBACK          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use dues_core::{CoreError, InvariantViolation, ValidationError};
use thiserror::Error;
use tracing::error;

/// Database operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in database.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation.
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

    /// Transaction failed.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Domain rule rejected the operation (validation, invariant, ...).
    #[error(transparent)]
    Domain(#[from] CoreError),

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

    /// Wraps an invariant violation, logging it loudly.
    ///
    /// Every ledger inconsistency goes through here so none is silently
    /// swallowed.
    pub fn invariant(violation: InvariantViolation) -> Self {
        error!(
            member_id = %violation.member_id,
            month = %violation.month,
            rule = %violation.rule,
            expected = violation.expected,
            actual = violation.actual,
            "Ledger invariant violated; aborting unit of work"
        );
        DbError::Domain(CoreError::Invariant(violation))
    }

    /// True for validation failures (rejected before any mutation).
    pub fn is_validation(&self) -> bool {
        matches!(self, DbError::Domain(CoreError::Validation(_)))
    }

    /// True for invariant violations.
    pub fn is_invariant(&self) -> bool {
        matches!(self, DbError::Domain(CoreError::Invariant(_)))
    }
}

impl From<ValidationError> for DbError {
    fn from(err: ValidationError) -> Self {
        DbError::Domain(CoreError::Validation(err))
    }
}

impl From<InvariantViolation> for DbError {
    fn from(violation: InvariantViolation) -> Self {
        DbError::invariant(violation)
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

                // "UNIQUE constraint failed: <table>.<column>"
                // "FOREIGN KEY constraint failed"
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
    use dues_core::InvariantRule;

    #[test]
    fn test_validation_maps_to_domain() {
        let err: DbError = ValidationError::Required {
            field: "member_id".to_string(),
        }
        .into();
        assert!(err.is_validation());
        assert!(!err.is_invariant());
        assert_eq!(err.to_string(), "Validation error: member_id is required");
    }

    #[test]
    fn test_invariant_maps_to_domain() {
        let err = DbError::invariant(InvariantViolation::new(
            "m-1",
            "2026-05",
            InvariantRule::PaidWithoutTransactions,
            0,
            1,
        ));
        assert!(err.is_invariant());
    }
}
