//! # Reporting View
//!
//! Read-only aggregation of the ledger for unpaid lists and payment
//! reminders. Every report runs in a unit of work that is rolled back, so
//! it sees one consistent snapshot and never writes.

use dues_core::reconcile::{self, DuesState};
use dues_core::validation::{validate_member_id, validate_month};
use dues_core::{
    AttendanceFeeFlag, BillingMonth, CoreError, FlagFilter, InvariantViolation, Member,
    MonthlyDuesRecord, MonthlySummary, TransactionRecord,
};
use tracing::{debug, error, info, warn};

use super::DuesLedger;
use crate::error::{DbError, DbResult};
use crate::repository::ledger_store::LedgerStore;

/// Everything the ledger holds for one (member, month).
struct MonthSnapshot {
    record: Option<MonthlyDuesRecord>,
    transactions: Vec<TransactionRecord>,
    flags: Vec<AttendanceFeeFlag>,
}

impl MonthSnapshot {
    async fn load(
        store: &mut LedgerStore<'_>,
        member_id: &str,
        month: BillingMonth,
    ) -> DbResult<Self> {
        let record = store.find_monthly_record(member_id, month).await?;
        let transactions = match &record {
            Some(r) => store.find_transactions_for(&r.id).await?,
            None => Vec::new(),
        };
        let flags = store
            .find_qualifying_attendance(member_id, month, FlagFilter::All)
            .await?;

        Ok(MonthSnapshot {
            record,
            transactions,
            flags,
        })
    }

    fn violations(&self, member: &Member, month: BillingMonth) -> Vec<InvariantViolation> {
        let mut found = Vec::new();
        if let Some(record) = &self.record {
            if let Err(v) = reconcile::check_record(record, &self.transactions) {
                found.push(v);
            }
        }
        if let Err(v) = reconcile::check_flag_coverage(
            &member.id,
            &month.to_string(),
            member.billing_model,
            self.record.as_ref(),
            &self.flags,
        ) {
            found.push(v);
        }
        found
    }

    fn summarize(
        &self,
        ledger: &DuesLedger,
        member: &Member,
        month: BillingMonth,
        scheduled: i64,
    ) -> MonthlySummary {
        let model = member.billing_model;
        let registrations = self.flags.len() as i64;
        let owed_count = ledger.rates.owed_count(model, scheduled, registrations);
        let owed = ledger.rates.amount_owed(model, scheduled, registrations);
        let paid = self
            .record
            .as_ref()
            .map(MonthlyDuesRecord::total_paid)
            .unwrap_or_default();

        MonthlySummary {
            member_id: member.id.clone(),
            display_name: member.display_name.clone(),
            month,
            billing_model: model,
            unit_fee: ledger.rates.unit_fee(model),
            owed_count,
            owed,
            paid,
            outstanding: owed.saturating_sub_floor(paid),
            paid_count: self.record.as_ref().map_or(0, |r| r.paid_count),
            paid_flags: self.flags.iter().filter(|f| f.paid).count() as i64,
            state: DuesState::classify(self.record.as_ref(), owed_count),
        }
    }
}

impl DuesLedger {
    /// Owed, paid and outstanding for one member and month.
    ///
    /// Fails with an invariant error rather than report numbers from an
    /// inconsistent ledger.
    pub async fn monthly_summary(&self, member_id: &str, month: &str) -> DbResult<MonthlySummary> {
        let member_id = validate_member_id(member_id)?;
        let month = validate_month(month)?;

        let mut uow = self.db.begin().await?;
        let mut store = uow.ledger();

        let member = store
            .find_member(&member_id)
            .await?
            .ok_or_else(|| CoreError::MemberNotFound(member_id.clone()))?;
        let scheduled = store.count_scheduled_events(month).await?;
        let snapshot = MonthSnapshot::load(&mut store, &member.id, month).await?;

        if let Some(violation) = snapshot.violations(&member, month).into_iter().next() {
            return Err(DbError::invariant(violation));
        }
        let summary = snapshot.summarize(self, &member, month, scheduled);
        uow.rollback().await?;

        debug!(
            member_id = %summary.member_id,
            %month,
            owed = summary.owed.cents(),
            paid = summary.paid.cents(),
            "Monthly summary computed"
        );
        Ok(summary)
    }

    /// Summaries for every active member and anyone with dues activity in
    /// the month, sorted by name.
    pub async fn month_overview(&self, month: &str) -> DbResult<Vec<MonthlySummary>> {
        let month = validate_month(month)?;

        let mut uow = self.db.begin().await?;
        let mut store = uow.ledger();

        let scheduled = store.count_scheduled_events(month).await?;
        let members = store.members_for_month(month).await?;

        let mut summaries = Vec::with_capacity(members.len());
        for member in &members {
            let snapshot = MonthSnapshot::load(&mut store, &member.id, month).await?;
            if let Some(violation) = snapshot.violations(member, month).into_iter().next() {
                return Err(DbError::invariant(violation));
            }
            summaries.push(snapshot.summarize(self, member, month, scheduled));
        }
        uow.rollback().await?;

        debug!(%month, members = summaries.len(), "Month overview computed");
        Ok(summaries)
    }

    /// Members with an outstanding balance for the month.
    pub async fn unpaid_members(&self, month: &str) -> DbResult<Vec<MonthlySummary>> {
        let unpaid: Vec<MonthlySummary> = self
            .month_overview(month)
            .await?
            .into_iter()
            .filter(MonthlySummary::is_outstanding)
            .collect();

        info!(month, count = unpaid.len(), "Unpaid members listed");
        Ok(unpaid)
    }

    /// Checks every dues record and paid flag of the month.
    ///
    /// Violations are logged and returned, never corrected.
    pub async fn audit_month(&self, month: &str) -> DbResult<Vec<InvariantViolation>> {
        let month = validate_month(month)?;

        let mut uow = self.db.begin().await?;
        let mut store = uow.ledger();

        let members = store.members_for_month(month).await?;
        let mut violations = Vec::new();
        for member in &members {
            let snapshot = MonthSnapshot::load(&mut store, &member.id, month).await?;
            violations.extend(snapshot.violations(member, month));

            // Counts are stored, so this is only a hint that fees changed.
            if let Some(record) = &snapshot.record {
                let fee = self.rates.unit_fee(member.billing_model);
                if record.total_paid().exact_units_of(fee).is_none() {
                    warn!(
                        member_id = %member.id,
                        %month,
                        total = record.total_paid_cents,
                        fee = fee.cents(),
                        "Dues total is not a whole number of current unit fees"
                    );
                }
            }
        }
        uow.rollback().await?;

        for v in &violations {
            error!(
                member_id = %v.member_id,
                month = %v.month,
                rule = %v.rule,
                expected = v.expected,
                actual = v.actual,
                "Ledger audit found an inconsistency"
            );
        }
        info!(%month, members = members.len(), violations = violations.len(), "Ledger audit finished");
        Ok(violations)
    }
}
