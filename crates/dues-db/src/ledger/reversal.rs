//! # Reversal Engine
//!
//! Cancels dues payments: removes ledger transactions, recomputes or deletes
//! the monthly dues record and reopens exactly the flags the removed
//! transactions covered.
//!
//! ## Order of Reopening
//! ```text
//! flags (by event date):   [P] [P] [P] [ ] [ ]      P = paid
//!                            ▲           │
//!           mark_paid_single fills ──────┘ earliest unpaid first
//!           cancel_last_single_payment reopens the registrations recorded
//!           in `transaction_coverage` for the reversed transaction
//! ```
//!
//! A late registration for an earlier event can be paid after later events,
//! so paid flags are not always a chronological prefix. Transactions without
//! recorded coverage fall back to reopening the latest-dated paid flags.

use dues_core::reconcile::{self, latest_paid};
use dues_core::validation::{validate_member_id, validate_month};
use dues_core::{
    AttendanceFeeFlag, BillingModel, FixedReversal, FlagFilter, InvariantRule,
    InvariantViolation, LedgerOutcome, Money, NoChangeReason, SingleReversal,
};
use tracing::{debug, info};

use super::{load_member, DuesLedger};
use crate::error::{DbError, DbResult};

impl DuesLedger {
    /// Reverses a FIXED member's dues for the month entirely.
    ///
    /// Deletes every linked transaction and the dues record, and reopens
    /// every paid qualifying flag of the month.
    pub async fn cancel_fixed_payment(
        &self,
        member_id: &str,
        month: &str,
    ) -> DbResult<LedgerOutcome<FixedReversal>> {
        let member_id = validate_member_id(member_id)?;
        let month = validate_month(month)?;

        let mut uow = self.db.begin().await?;
        let mut store = uow.ledger();
        store.lock_month(&member_id, month).await?;
        load_member(&mut store, &member_id, BillingModel::Fixed).await?;

        let Some(record) = store.find_monthly_record(&member_id, month).await? else {
            debug!(member_id = %member_id, %month, "No dues record to cancel");
            return Ok(LedgerOutcome::NoChange(NoChangeReason::NothingToReverse));
        };

        let transactions = store.find_transactions_for(&record.id).await?;
        reconcile::check_record(&record, &transactions)?;
        if !record.is_paid {
            debug!(member_id = %member_id, %month, "Dues record not paid; nothing to cancel");
            return Ok(LedgerOutcome::NoChange(NoChangeReason::NothingToReverse));
        }

        for transaction in &transactions {
            store.delete_transaction(&transaction.id).await?;
        }
        store.delete_monthly_record(&record.id).await?;

        let paid = store
            .find_qualifying_attendance(&member_id, month, FlagFilter::PaidOnly)
            .await?;
        let ids: Vec<&str> = paid.iter().map(|f| f.registration_id.as_str()).collect();
        let reopened = store.set_fee_paid(&ids, false).await?;

        uow.commit().await?;

        info!(
            member_id = %member_id,
            %month,
            amount = record.total_paid_cents,
            count = reopened,
            "FIXED dues cancelled"
        );
        Ok(LedgerOutcome::Applied(FixedReversal {
            reversed_amount: record.total_paid(),
            transactions_removed: transactions.len() as i64,
            flags_reopened: reopened as i64,
        }))
    }

    /// Undoes the most recent SINGLE payment for the month.
    ///
    /// Only the latest transaction is ever reversed. The dues record is
    /// deleted once its total returns to zero.
    pub async fn cancel_last_single_payment(
        &self,
        member_id: &str,
        month: &str,
    ) -> DbResult<LedgerOutcome<SingleReversal>> {
        let member_id = validate_member_id(member_id)?;
        let month = validate_month(month)?;

        let mut uow = self.db.begin().await?;
        let mut store = uow.ledger();
        store.lock_month(&member_id, month).await?;
        load_member(&mut store, &member_id, BillingModel::Single).await?;

        let Some(mut record) = store.find_monthly_record(&member_id, month).await? else {
            debug!(member_id = %member_id, %month, "No dues record to cancel");
            return Ok(LedgerOutcome::NoChange(NoChangeReason::NothingToReverse));
        };
        store.verify_record(&record).await?;

        let Some(last) = store.latest_transaction_for(&record.id).await? else {
            debug!(member_id = %member_id, %month, "No dues transaction to cancel");
            return Ok(LedgerOutcome::NoChange(NoChangeReason::NothingToReverse));
        };

        let flags = store
            .find_qualifying_attendance(&member_id, month, FlagFilter::All)
            .await?;
        reconcile::check_flag_coverage(
            &member_id,
            &month.to_string(),
            BillingModel::Single,
            Some(&record),
            &flags,
        )?;

        let reversed = last.covered_count;
        let new_total = record.total_paid_cents - last.amount_cents;
        let new_count = record.paid_count - reversed;
        if new_total < 0 || new_count < 0 {
            return Err(DbError::invariant(InvariantViolation::new(
                &member_id,
                month,
                InvariantRule::NegativeBalance,
                0,
                new_total.min(new_count),
            )));
        }

        store.delete_transaction(&last.id).await?;

        if new_total == 0 {
            store.delete_monthly_record(&record.id).await?;
        } else {
            let remaining = store.find_transactions_for(&record.id).await?;
            record.total_paid_cents = new_total;
            record.paid_count = new_count;
            record.is_paid = !remaining.is_empty();
            if !record.is_paid {
                record.paid_at = None;
            }
            store.save_monthly_record(&record).await?;
            reconcile::check_record(&record, &remaining)?;
        }

        let covered = store.coverage_for(&last.id).await?;
        let picked = flags_to_reopen(&flags, &covered, reversed as usize);
        if (picked.len() as i64) < reversed {
            return Err(DbError::invariant(InvariantViolation::new(
                &member_id,
                month,
                InvariantRule::FlagCoverageMismatch,
                reversed,
                picked.len() as i64,
            )));
        }
        store.set_fee_paid(&picked, false).await?;

        uow.commit().await?;

        info!(
            member_id = %member_id,
            %month,
            amount = last.amount_cents,
            count = reversed,
            total = new_total,
            "SINGLE dues payment cancelled"
        );
        Ok(LedgerOutcome::Applied(SingleReversal {
            reversed_count: reversed,
            reversed_amount: last.amount(),
            new_total: Money::from_cents(new_total),
        }))
    }
}

/// Paid flags the reversed transaction covered.
///
/// Transactions posted with recorded coverage reopen exactly those
/// registrations; a covered registration that is no longer paid and
/// qualifying is dropped, so the caller sees a short list. Without recorded
/// coverage the latest-dated paid flags are reopened.
fn flags_to_reopen<'a>(
    flags: &'a [AttendanceFeeFlag],
    covered: &[String],
    n: usize,
) -> Vec<&'a str> {
    if covered.is_empty() {
        return latest_paid(flags, n)
            .into_iter()
            .map(|f| f.registration_id.as_str())
            .collect();
    }

    flags
        .iter()
        .filter(|f| f.paid && covered.contains(&f.registration_id))
        .map(|f| f.registration_id.as_str())
        .take(n)
        .collect()
}

#[cfg(test)]
mod tests {
    use dues_core::{CoreError, EventType, Member};

    use crate::test_support::{date, Fixture};

    use super::*;

    async fn single_with_events(fx: &Fixture, days: &[u32]) -> (Member, Vec<String>) {
        let member = fx.member("Single", BillingModel::Single).await;
        let mut ids = Vec::new();
        for day in days {
            let event = fx.event(EventType::Practice, date(2026, 5, *day)).await;
            fx.attend(&member, &event).await;
            ids.push(event.id);
        }
        (member, ids)
    }

    async fn coverage_rows(fx: &Fixture) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM transaction_coverage")
            .fetch_one(fx.db.pool())
            .await
            .unwrap()
    }

    // -------------------------------------------------------------------------
    // SINGLE
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_single_cancel_reverses_whole_payment_and_deletes_record() {
        let fx = Fixture::new().await;
        let (member, _) = single_with_events(&fx, &[5, 12, 19]).await;

        fx.ledger.mark_paid_single(&member.id, "2026-05", 5).await.unwrap();

        let reversal = fx
            .ledger
            .cancel_last_single_payment(&member.id, "2026-05")
            .await
            .unwrap()
            .applied()
            .unwrap();

        assert_eq!(reversal.reversed_count, 3);
        assert_eq!(reversal.reversed_amount.cents(), 660);
        assert_eq!(reversal.new_total, Money::zero());
        assert!(fx.record(&member, "2026-05").await.is_none());
        assert!(fx.transactions(&member, "2026-05").await.is_empty());
        assert!(fx.paid_events(&member, "2026-05").await.is_empty());
    }

    #[tokio::test]
    async fn test_single_cancel_undoes_only_latest_payment() {
        let fx = Fixture::new().await;
        let (member, ids) = single_with_events(&fx, &[3, 10, 17, 24]).await;

        fx.ledger.mark_paid_single(&member.id, "2026-05", 1).await.unwrap();
        fx.ledger.mark_paid_single(&member.id, "2026-05", 2).await.unwrap();

        let reversal = fx
            .ledger
            .cancel_last_single_payment(&member.id, "2026-05")
            .await
            .unwrap()
            .applied()
            .unwrap();
        assert_eq!(reversal.reversed_count, 2);
        assert_eq!(reversal.new_total.cents(), 220);

        let record = fx.record(&member, "2026-05").await.unwrap();
        assert_eq!(record.total_paid_cents, 220);
        assert_eq!(record.paid_count, 1);
        assert!(record.is_paid);
        assert_eq!(fx.paid_events(&member, "2026-05").await, vec![ids[0].clone()]);
    }

    #[tokio::test]
    async fn test_single_cancel_reopens_latest_events_first() {
        let fx = Fixture::new().await;
        let (member, ids) = single_with_events(&fx, &[3, 10, 17, 24, 31]).await;

        // Pay two, then two more, then cancel the second payment
        fx.ledger.mark_paid_single(&member.id, "2026-05", 2).await.unwrap();
        fx.ledger.mark_paid_single(&member.id, "2026-05", 2).await.unwrap();
        fx.ledger
            .cancel_last_single_payment(&member.id, "2026-05")
            .await
            .unwrap();

        assert_eq!(
            fx.paid_events(&member, "2026-05").await,
            vec![ids[0].clone(), ids[1].clone()]
        );
    }

    #[tokio::test]
    async fn test_single_pay_cancel_round_trip_restores_state() {
        let fx = Fixture::new().await;
        let (member, _) = single_with_events(&fx, &[5, 12, 19, 26]).await;

        fx.ledger.mark_paid_single(&member.id, "2026-05", 1).await.unwrap();
        let before_record = fx.record(&member, "2026-05").await.unwrap();
        let before_flags = fx.paid_events(&member, "2026-05").await;

        fx.ledger.mark_paid_single(&member.id, "2026-05", 2).await.unwrap();
        fx.ledger
            .cancel_last_single_payment(&member.id, "2026-05")
            .await
            .unwrap();

        let after_record = fx.record(&member, "2026-05").await.unwrap();
        assert_eq!(after_record.id, before_record.id);
        assert_eq!(after_record.total_paid_cents, before_record.total_paid_cents);
        assert_eq!(after_record.paid_count, before_record.paid_count);
        assert_eq!(fx.paid_events(&member, "2026-05").await, before_flags);
        assert_eq!(fx.transactions(&member, "2026-05").await.len(), 1);
    }

    #[tokio::test]
    async fn test_single_cancel_reopens_late_earlier_registration() {
        let fx = Fixture::new().await;
        let (member, ids) = single_with_events(&fx, &[5, 12, 19]).await;
        fx.ledger.mark_paid_single(&member.id, "2026-05", 2).await.unwrap();
        let before = fx.paid_events(&member, "2026-05").await;
        assert_eq!(before, vec![ids[0].clone(), ids[1].clone()]);

        // Registered late for an event dated before the paid ones
        let early = fx.event(EventType::Practice, date(2026, 5, 3)).await;
        fx.attend(&member, &early).await;
        fx.ledger.mark_paid_single(&member.id, "2026-05", 1).await.unwrap();
        assert_eq!(
            fx.paid_events(&member, "2026-05").await,
            vec![early.id.clone(), ids[0].clone(), ids[1].clone()]
        );

        let reversal = fx
            .ledger
            .cancel_last_single_payment(&member.id, "2026-05")
            .await
            .unwrap()
            .applied()
            .unwrap();
        assert_eq!(reversal.reversed_count, 1);
        assert_eq!(fx.paid_events(&member, "2026-05").await, before);

        let record = fx.record(&member, "2026-05").await.unwrap();
        assert_eq!(record.paid_count, 2);
        assert_eq!(record.total_paid_cents, 440);
    }

    #[tokio::test]
    async fn test_single_cancel_without_coverage_reopens_latest_dated() {
        let fx = Fixture::new().await;
        let (member, ids) = single_with_events(&fx, &[5, 12, 19]).await;
        fx.ledger.mark_paid_single(&member.id, "2026-05", 1).await.unwrap();
        fx.ledger.mark_paid_single(&member.id, "2026-05", 1).await.unwrap();
        fx.exec("DELETE FROM transaction_coverage").await;

        fx.ledger
            .cancel_last_single_payment(&member.id, "2026-05")
            .await
            .unwrap();

        assert_eq!(fx.paid_events(&member, "2026-05").await, vec![ids[0].clone()]);
    }

    #[tokio::test]
    async fn test_single_cancel_removes_coverage_rows() {
        let fx = Fixture::new().await;
        let (member, _) = single_with_events(&fx, &[5, 12]).await;
        fx.ledger.mark_paid_single(&member.id, "2026-05", 2).await.unwrap();

        assert_eq!(coverage_rows(&fx).await, 2);

        fx.ledger
            .cancel_last_single_payment(&member.id, "2026-05")
            .await
            .unwrap();
        assert_eq!(coverage_rows(&fx).await, 0);
    }

    #[tokio::test]
    async fn test_single_cancel_without_record_is_noop() {
        let fx = Fixture::new().await;
        let (member, _) = single_with_events(&fx, &[5]).await;

        let outcome = fx
            .ledger
            .cancel_last_single_payment(&member.id, "2026-05")
            .await
            .unwrap();
        assert_eq!(outcome.no_change_reason(), Some(NoChangeReason::NothingToReverse));
    }

    #[tokio::test]
    async fn test_single_cancel_counts_survive_fee_change() {
        let fx = Fixture::new().await;
        let (member, _) = single_with_events(&fx, &[5, 12, 19]).await;
        fx.ledger.mark_paid_single(&member.id, "2026-05", 2).await.unwrap();

        // Fee raised after the payment was taken
        let config = crate::config::LedgerConfig {
            rates: dues_core::BillingRates::new(Money::from_cents(180), Money::from_cents(300)),
            ..Default::default()
        };
        let repriced = fx.db.ledger(&config);

        let reversal = repriced
            .cancel_last_single_payment(&member.id, "2026-05")
            .await
            .unwrap()
            .applied()
            .unwrap();
        assert_eq!(reversal.reversed_count, 2);
        assert_eq!(reversal.reversed_amount.cents(), 440);
        assert!(fx.paid_events(&member, "2026-05").await.is_empty());
    }

    #[tokio::test]
    async fn test_single_cancel_refuses_uncovered_count() {
        let fx = Fixture::new().await;
        let (member, _) = single_with_events(&fx, &[5, 12]).await;
        fx.ledger.mark_paid_single(&member.id, "2026-05", 2).await.unwrap();

        // Ledger claims more events than there are paid flags
        fx.exec("UPDATE finance_transactions SET covered_count = 3").await;
        fx.exec("UPDATE monthly_dues SET paid_count = 3").await;

        let err = fx
            .ledger
            .cancel_last_single_payment(&member.id, "2026-05")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::Invariant(InvariantViolation {
                rule: InvariantRule::FlagCoverageMismatch,
                ..
            }))
        ));

        // Rolled back: transaction still there
        assert_eq!(fx.transactions(&member, "2026-05").await.len(), 1);
    }

    #[tokio::test]
    async fn test_single_cancel_rejects_fixed_member() {
        let fx = Fixture::new().await;
        let member = fx.member("Fixed", BillingModel::Fixed).await;

        let err = fx
            .ledger
            .cancel_last_single_payment(&member.id, "2026-05")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::BillingModelMismatch { .. })
        ));
    }

    // -------------------------------------------------------------------------
    // FIXED
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_fixed_cancel_removes_everything() {
        let fx = Fixture::new().await;
        let member = fx.member("Fixed", BillingModel::Fixed).await;
        let e1 = fx.event(EventType::Practice, date(2026, 5, 5)).await;
        let e2 = fx.event(EventType::Match, date(2026, 5, 9)).await;
        fx.attend(&member, &e1).await;
        fx.attend(&member, &e2).await;

        fx.ledger.mark_paid_fixed(&member.id, "2026-05").await.unwrap();
        let reversal = fx
            .ledger
            .cancel_fixed_payment(&member.id, "2026-05")
            .await
            .unwrap()
            .applied()
            .unwrap();

        assert_eq!(reversal.reversed_amount.cents(), 360);
        assert_eq!(reversal.transactions_removed, 1);
        assert_eq!(reversal.flags_reopened, 2);
        assert!(fx.record(&member, "2026-05").await.is_none());
        assert!(fx.paid_events(&member, "2026-05").await.is_empty());

        let left: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM finance_transactions")
            .fetch_one(fx.db.pool())
            .await
            .unwrap();
        assert_eq!(left, 0);

        // Second cancel has nothing left to do
        let again = fx
            .ledger
            .cancel_fixed_payment(&member.id, "2026-05")
            .await
            .unwrap();
        assert_eq!(again.no_change_reason(), Some(NoChangeReason::NothingToReverse));
    }

    #[tokio::test]
    async fn test_fixed_cancel_after_top_up_removes_both_transactions() {
        let fx = Fixture::new().await;
        let member = fx.member("Fixed", BillingModel::Fixed).await;
        fx.event(EventType::Practice, date(2026, 5, 5)).await;
        fx.ledger.mark_paid_fixed(&member.id, "2026-05").await.unwrap();
        fx.event(EventType::Practice, date(2026, 5, 12)).await;
        fx.ledger.mark_paid_fixed(&member.id, "2026-05").await.unwrap();

        let reversal = fx
            .ledger
            .cancel_fixed_payment(&member.id, "2026-05")
            .await
            .unwrap()
            .applied()
            .unwrap();
        assert_eq!(reversal.transactions_removed, 2);
        assert_eq!(reversal.reversed_amount.cents(), 360);
    }

    #[tokio::test]
    async fn test_fixed_cancel_leaves_other_months_alone() {
        let fx = Fixture::new().await;
        let member = fx.member("Fixed", BillingModel::Fixed).await;
        let may = fx.event(EventType::Practice, date(2026, 5, 5)).await;
        let june = fx.event(EventType::Practice, date(2026, 6, 2)).await;
        fx.attend(&member, &may).await;
        fx.attend(&member, &june).await;

        fx.ledger.mark_paid_fixed(&member.id, "2026-05").await.unwrap();
        fx.ledger.mark_paid_fixed(&member.id, "2026-06").await.unwrap();
        fx.ledger.cancel_fixed_payment(&member.id, "2026-05").await.unwrap();

        assert!(fx.record(&member, "2026-05").await.is_none());
        assert!(fx.record(&member, "2026-06").await.is_some());
        assert_eq!(fx.paid_events(&member, "2026-06").await, vec![june.id]);
    }
}
