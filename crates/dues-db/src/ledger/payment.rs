//! # Payment Poster
//!
//! Marks dues paid: posts one ledger transaction, upserts the monthly dues
//! record and flips attendance fee flags, all in one unit of work.
//!
//! ## FIXED vs SINGLE
//! ```text
//! FIXED   owed = fee × events scheduled in the month
//!         one payment covers the whole month, every flag flipped
//!         resubmission finds the (record, amount, category) triple → no
//!         second transaction, flags repaired if needed
//!
//! SINGLE  owed = fee × member's own qualifying registrations
//!         each payment covers `count` more events, clamped to what's unpaid
//!         flags flipped earliest event first
//! ```

use chrono::Utc;
use dues_core::billing::clamp_single_request;
use dues_core::reconcile::{self, earliest_unpaid};
use dues_core::validation::{validate_member_id, validate_month, validate_requested_count};
use dues_core::{
    BillingModel, FixedPosting, FlagFilter, InvariantRule, InvariantViolation, LedgerOutcome,
    Money, NoChangeReason, SinglePosting, TransactionRecord,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{load_member, DuesLedger};
use crate::error::{DbError, DbResult};

impl DuesLedger {
    /// Settles a FIXED member's dues for the month.
    ///
    /// ## Returns
    /// * `Applied` - a transaction was posted, or flags were repaired
    /// * `NoChange(NothingOwed)` - no qualifying events scheduled
    /// * `NoChange(AlreadySettled)` - already paid and every flag set
    pub async fn mark_paid_fixed(
        &self,
        member_id: &str,
        month: &str,
    ) -> DbResult<LedgerOutcome<FixedPosting>> {
        let member_id = validate_member_id(member_id)?;
        let month = validate_month(month)?;

        let mut uow = self.db.begin().await?;
        let mut store = uow.ledger();
        store.lock_month(&member_id, month).await?;
        load_member(&mut store, &member_id, BillingModel::Fixed).await?;

        let scheduled = store.count_scheduled_events(month).await?;
        if scheduled == 0 {
            debug!(member_id = %member_id, %month, "No qualifying events scheduled");
            return Ok(LedgerOutcome::NoChange(NoChangeReason::NothingOwed));
        }
        let owed = self.rates.amount_owed(BillingModel::Fixed, scheduled, 0);

        let existing = store.find_monthly_record(&member_id, month).await?;
        let flags = store
            .find_qualifying_attendance(&member_id, month, FlagFilter::All)
            .await?;
        if let Some(record) = &existing {
            store.verify_record(record).await?;
        }
        reconcile::check_flag_coverage(
            &member_id,
            &month.to_string(),
            BillingModel::Fixed,
            existing.as_ref(),
            &flags,
        )?;

        let category = self.categories.resolve(store.conn()).await?;
        let unpaid: Vec<&str> = flags
            .iter()
            .filter(|f| !f.paid)
            .map(|f| f.registration_id.as_str())
            .collect();

        if let Some(record) = &existing {
            let duplicate = store
                .find_transaction(&record.id, owed.cents(), &category.id)
                .await?
                .is_some();

            let covers_schedule = record.paid_count >= scheduled;
            if duplicate || covers_schedule || record.total_paid() >= owed {
                if unpaid.is_empty() {
                    debug!(member_id = %member_id, %month, "FIXED dues already settled");
                    return Ok(LedgerOutcome::NoChange(NoChangeReason::AlreadySettled));
                }

                let marked = store.set_fee_paid(&unpaid, true).await?;
                let new_total = record.total_paid();
                uow.commit().await?;

                info!(
                    member_id = %member_id,
                    %month,
                    count = marked,
                    "FIXED dues already posted; attendance flags brought up to date"
                );
                return Ok(LedgerOutcome::Applied(FixedPosting {
                    posted_amount: Money::zero(),
                    transaction_posted: false,
                    flags_marked: marked as i64,
                    new_total,
                }));
            }
        }

        // New record, or a top-up for events scheduled since the last
        // payment. Top-ups are priced per uncovered event at the current fee.
        let mut record = match existing {
            Some(record) => record,
            None => store.get_or_create_monthly_record(&member_id, month).await?,
        };
        let covered = scheduled - record.paid_count;
        let amount = self
            .rates
            .unit_fee(BillingModel::Fixed)
            .multiply_quantity(covered);
        let now = Utc::now();

        let transaction = TransactionRecord {
            id: Uuid::new_v4().to_string(),
            amount_cents: amount.cents(),
            direction: category.direction,
            category_id: category.id.clone(),
            monthly_dues_id: Some(record.id.clone()),
            event_id: None,
            covered_count: covered,
            note: Some(format!("{} dues {} ({} events)", category.name, month, scheduled)),
            created_at: now,
        };
        store.insert_transaction(&transaction).await?;

        record.total_paid_cents += amount.cents();
        record.paid_count += covered;
        record.is_paid = true;
        record.paid_at = Some(now);
        store.save_monthly_record(&record).await?;

        let marked = store.set_fee_paid(&unpaid, true).await?;
        store.verify_record(&record).await?;
        uow.commit().await?;

        info!(
            member_id = %member_id,
            %month,
            amount = amount.cents(),
            count = covered,
            "FIXED dues posted"
        );
        Ok(LedgerOutcome::Applied(FixedPosting {
            posted_amount: amount,
            transaction_posted: true,
            flags_marked: marked as i64,
            new_total: record.total_paid(),
        }))
    }

    /// Pays for `requested` more of a SINGLE member's qualifying events.
    ///
    /// The request is clamped to the events still unpaid. The earliest
    /// unpaid events are the ones marked paid.
    ///
    /// ## Returns
    /// * `Applied` - with the clamped count and the new running total
    /// * `NoChange(NothingOwed)` - no qualifying registrations this month
    /// * `NoChange(AlreadySettled)` - every registration already paid
    pub async fn mark_paid_single(
        &self,
        member_id: &str,
        month: &str,
        requested: i64,
    ) -> DbResult<LedgerOutcome<SinglePosting>> {
        let member_id = validate_member_id(member_id)?;
        let month = validate_month(month)?;
        let requested = validate_requested_count(requested)?;

        let mut uow = self.db.begin().await?;
        let mut store = uow.ledger();
        store.lock_month(&member_id, month).await?;
        load_member(&mut store, &member_id, BillingModel::Single).await?;

        let existing = store.find_monthly_record(&member_id, month).await?;
        let flags = store
            .find_qualifying_attendance(&member_id, month, FlagFilter::All)
            .await?;
        if let Some(record) = &existing {
            store.verify_record(record).await?;
        }
        reconcile::check_flag_coverage(
            &member_id,
            &month.to_string(),
            BillingModel::Single,
            existing.as_ref(),
            &flags,
        )?;

        let qualifying = flags.len() as i64;
        let already_paid = existing.as_ref().map_or(0, |r| r.paid_count);
        let count = clamp_single_request(requested, qualifying, already_paid);

        if count == 0 {
            let reason = if qualifying == 0 {
                NoChangeReason::NothingOwed
            } else {
                NoChangeReason::AlreadySettled
            };
            debug!(member_id = %member_id, %month, ?reason, "Nothing left to pay");
            return Ok(LedgerOutcome::NoChange(reason));
        }
        if count < requested {
            warn!(
                member_id = %member_id,
                %month,
                requested,
                count,
                "Payment request clamped to unpaid events"
            );
        }

        let picked_flags = earliest_unpaid(&flags, count as usize);
        let picked: Vec<&str> = picked_flags
            .iter()
            .map(|f| f.registration_id.as_str())
            .collect();
        if (picked.len() as i64) < count {
            return Err(DbError::invariant(InvariantViolation::new(
                &member_id,
                month,
                InvariantRule::FlagCoverageMismatch,
                count,
                picked.len() as i64,
            )));
        }

        let category = self.categories.resolve(store.conn()).await?;
        let mut record = match existing {
            Some(record) => record,
            None => store.get_or_create_monthly_record(&member_id, month).await?,
        };
        let amount: Money = picked_flags
            .iter()
            .map(|f| self.rates.fee_for_event(BillingModel::Single, f.event_type))
            .sum();
        let now = Utc::now();

        let transaction = TransactionRecord {
            id: Uuid::new_v4().to_string(),
            amount_cents: amount.cents(),
            direction: category.direction,
            category_id: category.id.clone(),
            monthly_dues_id: Some(record.id.clone()),
            event_id: None,
            covered_count: count,
            note: Some(format!("{} dues {} ({} events)", category.name, month, count)),
            created_at: now,
        };
        store.insert_transaction(&transaction).await?;
        store.record_coverage(&transaction.id, &picked).await?;

        record.total_paid_cents += amount.cents();
        record.paid_count += count;
        record.is_paid = true;
        record.paid_at = Some(now);
        store.save_monthly_record(&record).await?;

        store.set_fee_paid(&picked, true).await?;
        store.verify_record(&record).await?;
        uow.commit().await?;

        info!(
            member_id = %member_id,
            %month,
            amount = amount.cents(),
            count,
            total = record.total_paid_cents,
            "SINGLE dues posted"
        );
        Ok(LedgerOutcome::Applied(SinglePosting {
            posted_count: count,
            posted_amount: amount,
            new_total: record.total_paid(),
        }))
    }
}
