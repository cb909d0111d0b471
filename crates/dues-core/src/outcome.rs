//! # Operation Outcomes
//!
//! Result payloads of the ledger operations, shaped for the admin UI.
//!
//! Every mutating operation answers with [`LedgerOutcome`], which keeps
//! "nothing happened" apart from "it failed" (an `Err`) and from "it worked"
//! (`Applied`).

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::month::BillingMonth;
use crate::reconcile::DuesState;
use crate::types::BillingModel;

// =============================================================================
// Ledger Outcome
// =============================================================================

/// Outcome of a mutating ledger operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum LedgerOutcome<T> {
    /// State changed and was committed.
    Applied(T),
    /// Nothing to do; no state was touched.
    NoChange(NoChangeReason),
}

impl<T> LedgerOutcome<T> {
    pub fn is_applied(&self) -> bool {
        matches!(self, LedgerOutcome::Applied(_))
    }

    /// The applied payload, if any.
    pub fn applied(self) -> Option<T> {
        match self {
            LedgerOutcome::Applied(value) => Some(value),
            LedgerOutcome::NoChange(_) => None,
        }
    }

    pub fn no_change_reason(&self) -> Option<NoChangeReason> {
        match self {
            LedgerOutcome::Applied(_) => None,
            LedgerOutcome::NoChange(reason) => Some(*reason),
        }
    }

    /// Maps the applied payload, keeping the no-change reason.
    pub fn map<U, F>(self, f: F) -> LedgerOutcome<U>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            LedgerOutcome::Applied(value) => LedgerOutcome::Applied(f(value)),
            LedgerOutcome::NoChange(reason) => LedgerOutcome::NoChange(reason),
        }
    }
}

/// Why an operation left the ledger untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum NoChangeReason {
    /// No qualifying events, so the owed amount is zero.
    NothingOwed,
    /// Every owed event is already covered.
    AlreadySettled,
    /// No dues record (or no transaction) to reverse.
    NothingToReverse,
}

// =============================================================================
// Payloads
// =============================================================================

/// Result of `mark_paid_fixed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct FixedPosting {
    /// Amount of the new transaction; zero when only flags were repaired.
    pub posted_amount: Money,
    /// False when an identical transaction already existed.
    pub transaction_posted: bool,
    /// Attendance flags switched to paid by this call.
    pub flags_marked: i64,
    pub new_total: Money,
}

/// Result of `mark_paid_single`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SinglePosting {
    /// Events paid for by this call, after clamping.
    pub posted_count: i64,
    pub posted_amount: Money,
    pub new_total: Money,
}

/// Result of `cancel_fixed_payment`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct FixedReversal {
    pub reversed_amount: Money,
    pub transactions_removed: i64,
    pub flags_reopened: i64,
}

/// Result of `cancel_last_single_payment`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SingleReversal {
    pub reversed_count: i64,
    pub reversed_amount: Money,
    /// Zero when the dues record was deleted.
    pub new_total: Money,
}

/// Result of `mark_paid`, tagged by the member's billing model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum DuesPosting {
    Fixed(FixedPosting),
    Single(SinglePosting),
}

/// Result of `cancel_payment`, tagged by the member's billing model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum DuesReversal {
    Fixed(FixedReversal),
    Single(SingleReversal),
}

// =============================================================================
// Monthly Summary
// =============================================================================

/// Read-only dues position of one member for one month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MonthlySummary {
    pub member_id: String,
    pub display_name: String,
    #[ts(as = "String")]
    pub month: BillingMonth,
    pub billing_model: BillingModel,
    pub unit_fee: Money,
    /// Billable events (scheduled for FIXED, registered for SINGLE).
    pub owed_count: i64,
    pub owed: Money,
    pub paid: Money,
    /// `owed - paid`, floored at zero.
    pub outstanding: Money,
    /// Events covered by the ledger.
    pub paid_count: i64,
    /// Attendance flags currently marked paid.
    pub paid_flags: i64,
    pub state: DuesState,
}

impl MonthlySummary {
    pub fn is_outstanding(&self) -> bool {
        self.outstanding.is_positive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_json_shape() {
        let applied: LedgerOutcome<SinglePosting> = LedgerOutcome::Applied(SinglePosting {
            posted_count: 3,
            posted_amount: Money::from_cents(660),
            new_total: Money::from_cents(660),
        });
        let json = serde_json::to_value(&applied).unwrap();
        assert_eq!(json["status"], "applied");
        assert_eq!(json["detail"]["posted_count"], 3);

        let noop: LedgerOutcome<SinglePosting> =
            LedgerOutcome::NoChange(NoChangeReason::AlreadySettled);
        let json = serde_json::to_value(&noop).unwrap();
        assert_eq!(json["status"], "no_change");
        assert_eq!(json["detail"], "already_settled");
    }

    #[test]
    fn test_outcome_accessors() {
        let applied: LedgerOutcome<i64> = LedgerOutcome::Applied(7);
        assert!(applied.is_applied());
        assert_eq!(applied.no_change_reason(), None);
        assert_eq!(applied.applied(), Some(7));

        let noop: LedgerOutcome<i64> = LedgerOutcome::NoChange(NoChangeReason::NothingOwed);
        assert_eq!(noop.no_change_reason(), Some(NoChangeReason::NothingOwed));
        assert_eq!(noop.applied(), None);
    }

    #[test]
    fn test_map_keeps_reason() {
        let noop: LedgerOutcome<SinglePosting> =
            LedgerOutcome::NoChange(NoChangeReason::NothingOwed);
        let mapped = noop.map(DuesPosting::Single);
        assert_eq!(mapped.no_change_reason(), Some(NoChangeReason::NothingOwed));

        let applied = LedgerOutcome::Applied(FixedReversal {
            reversed_amount: Money::from_cents(720),
            transactions_removed: 1,
            flags_reopened: 2,
        })
        .map(DuesReversal::Fixed);
        let json = serde_json::to_value(&applied).unwrap();
        assert_eq!(json["detail"]["model"], "fixed");
        assert_eq!(json["detail"]["transactions_removed"], 1);
    }
}
