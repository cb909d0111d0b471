//! # Reconciliation
//!
//! The dues state machine and the checks that keep the ledger honest.
//!
//! ## Dues State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │             first payment               pay remaining                   │
//! │  NoRecord ────────────────► PartiallyPaid ───────────► FullyReconciled  │
//! │     ▲                            │  ▲                        │          │
//! │     │  reverse last payment      │  │  reverse a later       │          │
//! │     │  (total back to 0)         │  │  payment               │          │
//! │     └────────────────────────────┘  └────────────────────────┘          │
//! │     ▲                                                        │          │
//! │     └────────────────────────────────────────────────────────┘          │
//! │                 reverse everything (FIXED cancel)                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Invariants
//! - `record.total_paid_cents == Σ tx.amount_cents`
//! - `record.paid_count == Σ tx.covered_count`
//! - `record.is_paid` iff at least one linked transaction exists
//! - SINGLE: paid flags for the month == `record.paid_count`
//! - FIXED: no record ⇒ no paid flags
//!
//! Checks report violations; they never repair them.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{InvariantRule, InvariantViolation};
use crate::types::{AttendanceFeeFlag, BillingModel, MonthlyDuesRecord, TransactionRecord};

// =============================================================================
// Dues State
// =============================================================================

/// Where a (member, month) stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum DuesState {
    /// No dues record; nothing paid.
    NoRecord,
    /// A record exists but covers fewer events than are owed.
    PartiallyPaid,
    /// Covered events meet or exceed what is owed.
    FullyReconciled,
}

impl DuesState {
    /// Classifies a (member, month) from its record and owed event count.
    pub fn classify(record: Option<&MonthlyDuesRecord>, owed_count: i64) -> Self {
        match record {
            None => DuesState::NoRecord,
            Some(r) if r.paid_count >= owed_count => DuesState::FullyReconciled,
            Some(_) => DuesState::PartiallyPaid,
        }
    }
}

// =============================================================================
// Record Checks
// =============================================================================

/// Verifies a dues record against its linked transactions.
pub fn check_record(
    record: &MonthlyDuesRecord,
    transactions: &[TransactionRecord],
) -> Result<(), InvariantViolation> {
    let violation = |rule, expected, actual| {
        InvariantViolation::new(&record.member_id, &record.month, rule, expected, actual)
    };

    let sum_amount: i64 = transactions.iter().map(|t| t.amount_cents).sum();
    if sum_amount != record.total_paid_cents {
        return Err(violation(
            InvariantRule::ReconciliationMismatch,
            sum_amount,
            record.total_paid_cents,
        ));
    }

    let sum_count: i64 = transactions.iter().map(|t| t.covered_count).sum();
    if sum_count != record.paid_count {
        return Err(violation(
            InvariantRule::PaidCountMismatch,
            sum_count,
            record.paid_count,
        ));
    }

    let tx_count = transactions.len() as i64;
    if record.is_paid && tx_count == 0 {
        return Err(violation(InvariantRule::PaidWithoutTransactions, 0, 1));
    }
    if !record.is_paid && tx_count > 0 {
        return Err(violation(InvariantRule::UnpaidWithTransactions, 1, 0));
    }

    Ok(())
}

/// Verifies that paid attendance flags are backed by the ledger.
///
/// * `flags` - every qualifying flag for the member and month
pub fn check_flag_coverage(
    member_id: &str,
    month: &str,
    model: BillingModel,
    record: Option<&MonthlyDuesRecord>,
    flags: &[AttendanceFeeFlag],
) -> Result<(), InvariantViolation> {
    let paid_flags = flags.iter().filter(|f| f.paid).count() as i64;

    let expected = match (model, record) {
        (_, None) => 0,
        (BillingModel::Single, Some(r)) => r.paid_count,
        // A FIXED payment covers the whole month; registrations added after
        // it stay unpaid until the next settlement, so any number is valid.
        (BillingModel::Fixed, Some(_)) => return Ok(()),
    };

    if paid_flags != expected {
        return Err(InvariantViolation::new(
            member_id,
            month,
            InvariantRule::FlagCoverageMismatch,
            expected,
            paid_flags,
        ));
    }
    Ok(())
}

// =============================================================================
// Flag Selection
// =============================================================================

/// Picks up to `n` unpaid flags, earliest event first.
///
/// Ties on date fall back to event id so the choice is deterministic.
pub fn earliest_unpaid(flags: &[AttendanceFeeFlag], n: usize) -> Vec<&AttendanceFeeFlag> {
    let mut unpaid: Vec<&AttendanceFeeFlag> = flags.iter().filter(|f| !f.paid).collect();
    unpaid.sort_by(|a, b| {
        a.event_date
            .cmp(&b.event_date)
            .then_with(|| a.event_id.cmp(&b.event_id))
    });
    unpaid.truncate(n);
    unpaid
}

/// Picks up to `n` paid flags, latest event first.
///
/// Reversal fallback for transactions with no recorded coverage. A late
/// registration for an earlier event breaks the chronological order of paid
/// flags, so this is not an exact inverse of [`earliest_unpaid`].
pub fn latest_paid(flags: &[AttendanceFeeFlag], n: usize) -> Vec<&AttendanceFeeFlag> {
    let mut paid: Vec<&AttendanceFeeFlag> = flags.iter().filter(|f| f.paid).collect();
    paid.sort_by(|a, b| {
        b.event_date
            .cmp(&a.event_date)
            .then_with(|| b.event_id.cmp(&a.event_id))
    });
    paid.truncate(n);
    paid
}

// =============================================================================
// Unit Tests
// =============================================================================
