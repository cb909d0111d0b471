//! # Dues Ledger Service
//!
//! The transactional operations of the dues ledger.
//!
//! ## Operations
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  payment.rs     mark_paid_fixed          mark_paid_single               │
//! │  reversal.rs    cancel_fixed_payment     cancel_last_single_payment     │
//! │  reporting.rs   monthly_summary  month_overview  unpaid_members  audit  │
//! │  (here)         mark_paid / cancel_payment  (dispatch by billing model) │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Shape of a Mutating Operation
//! ```text
//! validate input                      ─► Err(Validation), nothing touched
//! begin unit of work
//! lock (member, month)                ─► concurrent posters wait here
//! load member, check billing model
//! load record + flags, check invariants ─► Err(Invariant), rolled back
//! nothing to do?                      ─► Ok(NoChange(reason)), rolled back
//! write transaction / record / flags
//! re-check invariants
//! commit                              ─► Ok(Applied(..))
//! ```

mod payment;
mod reporting;
mod reversal;

use dues_core::validation::validate_member_id;
use dues_core::{
    BillingModel, BillingRates, CoreError, DuesPosting, DuesReversal, LedgerOutcome, Member,
    ValidationError,
};
use tracing::debug;

use crate::config::LedgerConfig;
use crate::error::DbResult;
use crate::pool::Database;
use crate::repository::category::CategoryLookup;
use crate::repository::ledger_store::LedgerStore;

/// Dues ledger bound to a database and a fee schedule.
#[derive(Debug, Clone)]
pub struct DuesLedger {
    db: Database,
    rates: BillingRates,
    categories: CategoryLookup,
}

impl DuesLedger {
    pub fn new(db: Database, config: &LedgerConfig) -> Self {
        DuesLedger {
            db,
            rates: config.rates,
            categories: CategoryLookup::income(config.dues_category.clone()),
        }
    }

    /// Fee schedule in effect.
    pub fn rates(&self) -> &BillingRates {
        &self.rates
    }

    /// Marks dues paid, choosing the engine from the member's billing model.
    ///
    /// FIXED members ignore `count`. SINGLE members must give one.
    pub async fn mark_paid(
        &self,
        member_id: &str,
        month: &str,
        count: Option<i64>,
    ) -> DbResult<LedgerOutcome<DuesPosting>> {
        let member = self.member_for_dispatch(member_id).await?;

        match member.billing_model {
            BillingModel::Fixed => {
                if count.is_some() {
                    debug!(member_id = %member.id, "Count ignored for FIXED member");
                }
                Ok(self
                    .mark_paid_fixed(&member.id, month)
                    .await?
                    .map(DuesPosting::Fixed))
            }
            BillingModel::Single => {
                let count = count.ok_or_else(|| ValidationError::Required {
                    field: "count".to_string(),
                })?;
                Ok(self
                    .mark_paid_single(&member.id, month, count)
                    .await?
                    .map(DuesPosting::Single))
            }
        }
    }

    /// Cancels a dues payment, choosing the engine from the billing model.
    pub async fn cancel_payment(
        &self,
        member_id: &str,
        month: &str,
    ) -> DbResult<LedgerOutcome<DuesReversal>> {
        let member = self.member_for_dispatch(member_id).await?;

        match member.billing_model {
            BillingModel::Fixed => Ok(self
                .cancel_fixed_payment(&member.id, month)
                .await?
                .map(DuesReversal::Fixed)),
            BillingModel::Single => Ok(self
                .cancel_last_single_payment(&member.id, month)
                .await?
                .map(DuesReversal::Single)),
        }
    }

    async fn member_for_dispatch(&self, member_id: &str) -> DbResult<Member> {
        let member_id = validate_member_id(member_id)?;
        self.db
            .roster()
            .get_member(&member_id)
            .await?
            .ok_or_else(|| CoreError::MemberNotFound(member_id).into())
    }
}

/// Loads a member inside a unit of work and checks its billing model.
async fn load_member(
    store: &mut LedgerStore<'_>,
    member_id: &str,
    expected: BillingModel,
) -> DbResult<Member> {
    let member = store
        .find_member(member_id)
        .await?
        .ok_or_else(|| CoreError::MemberNotFound(member_id.to_string()))?;

    if member.billing_model != expected {
        return Err(CoreError::BillingModelMismatch {
            member_id: member.id,
            expected,
            actual: member.billing_model,
        }
        .into());
    }
    Ok(member)
}
