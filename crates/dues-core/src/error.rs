//! # Error Types
//!
//! Domain-specific error types for dues-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  dues-core errors (this file)                                          │
//! │  ├── CoreError          - General domain errors                        │
//! │  ├── ValidationError    - Input validation failures (no mutation)      │
//! │  └── InvariantViolation - Ledger inconsistency (fatal, rolls back)     │
//! │                                                                         │
//! │  dues-db errors (separate crate)                                       │
//! │  └── DbError            - Database operation failures                  │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → caller                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! "Nothing to pay" and "nothing to cancel" are not errors at all; they are
//! reported through `LedgerOutcome::NoChange`.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

use crate::types::{BillingModel, TransactionDirection};

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Member id does not exist.
    #[error("Member not found: {0}")]
    MemberNotFound(String),

    /// Event id does not exist.
    #[error("Event not found: {0}")]
    EventNotFound(String),

    /// A registration cannot change while its fee is settled.
    ///
    /// ## When This Occurs
    /// - Withdrawing a registration whose attendance fee is flagged paid
    #[error("Registration for member {member_id} is locked: {reason}")]
    RegistrationLocked { member_id: String, reason: String },

    /// Operation targets the other billing model.
    ///
    /// ## When This Occurs
    /// - `mark_paid_single` on a FIXED member, `cancel_fixed_payment` on a
    ///   SINGLE member, and so on
    #[error("Member {member_id} is billed {actual:?}, operation requires {expected:?}")]
    BillingModelMismatch {
        member_id: String,
        expected: BillingModel,
        actual: BillingModel,
    },

    /// Billing model cannot change once dues have been recorded.
    #[error("Billing model of member {0} is locked by existing dues records")]
    BillingModelLocked(String),

    /// The configured dues category exists with the other direction.
    #[error("Finance category '{name}' is {actual:?}, dues require {expected:?}")]
    CategoryDirectionMismatch {
        name: String,
        expected: TransactionDirection,
        actual: TransactionDirection,
    },

    /// Ledger state is inconsistent. Never auto-corrected.
    #[error("Invariant violation: {0}")]
    Invariant(#[from] InvariantViolation),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any mutation starts.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., malformed month string).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Invariant Violation
// =============================================================================

/// Which ledger rule was broken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum InvariantRule {
    /// `total_paid` differs from the sum of linked transaction amounts.
    ReconciliationMismatch,
    /// `paid_count` differs from the sum of linked transaction counts.
    PaidCountMismatch,
    /// Record says paid but has no linked transactions.
    PaidWithoutTransactions,
    /// Record has transactions but says unpaid.
    UnpaidWithTransactions,
    /// Paid attendance flags don't match the ledger's covered count.
    FlagCoverageMismatch,
    /// A reversal would drive a total below zero.
    NegativeBalance,
}

impl fmt::Display for InvariantRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InvariantRule::ReconciliationMismatch => "reconciliation mismatch",
            InvariantRule::PaidCountMismatch => "paid count mismatch",
            InvariantRule::PaidWithoutTransactions => "paid without transactions",
            InvariantRule::UnpaidWithTransactions => "unpaid with transactions",
            InvariantRule::FlagCoverageMismatch => "flag coverage mismatch",
            InvariantRule::NegativeBalance => "negative balance",
        };
        f.write_str(name)
    }
}

/// A broken ledger invariant for one (member, month).
///
/// Carries enough context to find the offending rows. The db layer logs it at
/// `error!` level and aborts the enclosing unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize, TS)]
#[ts(export)]
#[error("{rule} for member {member_id} in {month}: expected {expected}, found {actual}")]
pub struct InvariantViolation {
    pub member_id: String,
    pub month: String,
    pub rule: InvariantRule,
    pub expected: i64,
    pub actual: i64,
}

impl InvariantViolation {
    pub fn new(
        member_id: impl Into<String>,
        month: impl fmt::Display,
        rule: InvariantRule,
        expected: i64,
        actual: i64,
    ) -> Self {
        InvariantViolation {
            member_id: member_id.into(),
            month: month.to_string(),
            rule,
            expected,
            actual,
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
