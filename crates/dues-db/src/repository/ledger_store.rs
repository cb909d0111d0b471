//! # Ledger Store
//!
//! Owns the three reconciled record types: attendance fee flags (on
//! `registrations`), monthly dues records, and finance transactions.
//!
//! ## Access Model
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  UnitOfWork ──► ledger() ──► LedgerStore<'_>                            │
//! │                                  │                                      │
//! │   reads (pub)                    │   writes (pub(crate))                │
//! │   ─────────────────────────      │   ───────────────────────────────    │
//! │   find_monthly_record            │   lock_month                         │
//! │   find_transactions_for          │   get_or_create_monthly_record       │
//! │   find_qualifying_attendance     │   save_monthly_record / delete       │
//! │   count_scheduled_events         │   insert_transaction / delete        │
//! │   coverage_for                   │   record_coverage                    │
//! │   verify_record                  │   set_fee_paid                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every statement runs on the unit of work's connection, so reads see the
//! unit's own uncommitted writes. Dues-linked transactions can only be
//! removed from inside this crate (the reversal engine).

use chrono::Utc;
use dues_core::reconcile;
use dues_core::{
    AttendanceFeeFlag, BillingMonth, FlagFilter, Member, MonthlyDuesRecord, TransactionRecord,
};
use sqlx::SqliteConnection;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};

/// SQL list of the dues-bearing event types. Kept in step with
/// `EventType::DUES_BEARING` (see tests).
pub(crate) const DUES_BEARING_SQL: &str = "('practice', 'match', 'tournament')";

const FLAG_SELECT: &str = r#"
    SELECT
        r.id AS registration_id,
        r.member_id,
        r.event_id,
        e.event_type,
        e.event_date,
        r.fee_paid AS paid
    FROM registrations r
    INNER JOIN events e ON e.id = r.event_id
    WHERE r.member_id = ?1
      AND r.status = 'active'
      AND e.event_date >= ?2
      AND e.event_date < ?3
"#;

const MONTHLY_COLUMNS: &str = r#"
    id, member_id, month, total_paid_cents, paid_count, is_paid,
    paid_at, created_at, updated_at
"#;

const TRANSACTION_COLUMNS: &str = r#"
    id, amount_cents, direction, category_id, monthly_dues_id, event_id,
    covered_count, note, created_at
"#;

/// Ledger operations bound to one unit of work.
#[derive(Debug)]
pub struct LedgerStore<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> LedgerStore<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        LedgerStore { conn }
    }

    /// Underlying connection, for collaborators such as the category lookup.
    pub(crate) fn conn(&mut self) -> &mut SqliteConnection {
        self.conn
    }

    // =========================================================================
    // Locking
    // =========================================================================

    /// Takes the database write lock before anything is read.
    ///
    /// SQLite has no row locks; a write statement as the first statement of
    /// the transaction takes the RESERVED lock even when it matches no rows.
    /// A concurrent poster for the same (member, month) waits here and then
    /// reads the committed state, so `paid_count` is never stale.
    pub(crate) async fn lock_month(&mut self, member_id: &str, month: BillingMonth) -> DbResult<()> {
        sqlx::query(
            r#"
            UPDATE monthly_dues
            SET updated_at = updated_at
            WHERE member_id = ?1 AND month = ?2
            "#,
        )
        .bind(member_id)
        .bind(month.to_string())
        .execute(&mut *self.conn)
        .await?;

        debug!(member_id, %month, "Dues month locked");
        Ok(())
    }

    // =========================================================================
    // Members & events
    // =========================================================================

    /// Loads a member inside the unit of work.
    pub async fn find_member(&mut self, member_id: &str) -> DbResult<Option<Member>> {
        let member = sqlx::query_as::<_, Member>(
            r#"
            SELECT id, display_name, billing_model, is_active, created_at
            FROM members
            WHERE id = ?1
            "#,
        )
        .bind(member_id)
        .fetch_optional(&mut *self.conn)
        .await?;

        Ok(member)
    }

    /// Members with a dues record or a registration in the month, plus every
    /// active member.
    pub async fn members_for_month(&mut self, month: BillingMonth) -> DbResult<Vec<Member>> {
        let (start, end) = month.date_range();
        let members = sqlx::query_as::<_, Member>(
            r#"
            SELECT id, display_name, billing_model, is_active, created_at
            FROM members m
            WHERE m.is_active = 1
               OR EXISTS (SELECT 1 FROM monthly_dues d
                          WHERE d.member_id = m.id AND d.month = ?1)
               OR EXISTS (SELECT 1 FROM registrations r
                          INNER JOIN events e ON e.id = r.event_id
                          WHERE r.member_id = m.id
                            AND e.event_date >= ?2 AND e.event_date < ?3)
            ORDER BY display_name, id
            "#,
        )
        .bind(month.to_string())
        .bind(start)
        .bind(end)
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(members)
    }

    /// Number of dues-bearing events scheduled in the month.
    pub async fn count_scheduled_events(&mut self, month: BillingMonth) -> DbResult<i64> {
        let (start, end) = month.date_range();
        let sql = format!(
            "SELECT COUNT(*) FROM events \
             WHERE event_date >= ?1 AND event_date < ?2 AND event_type IN {}",
            DUES_BEARING_SQL
        );
        let count: i64 = sqlx::query_scalar(&sql)
            .bind(start)
            .bind(end)
            .fetch_one(&mut *self.conn)
            .await?;

        Ok(count)
    }

    // =========================================================================
    // Monthly dues records
    // =========================================================================

    pub async fn find_monthly_record(
        &mut self,
        member_id: &str,
        month: BillingMonth,
    ) -> DbResult<Option<MonthlyDuesRecord>> {
        let sql = format!(
            "SELECT {} FROM monthly_dues WHERE member_id = ?1 AND month = ?2",
            MONTHLY_COLUMNS
        );
        let record = sqlx::query_as::<_, MonthlyDuesRecord>(&sql)
            .bind(member_id)
            .bind(month.to_string())
            .fetch_optional(&mut *self.conn)
            .await?;

        Ok(record)
    }

    /// Returns the record for (member, month), creating an empty one.
    ///
    /// A freshly created record has no transactions and `is_paid = false`; the
    /// caller must post a transaction before committing.
    pub(crate) async fn get_or_create_monthly_record(
        &mut self,
        member_id: &str,
        month: BillingMonth,
    ) -> DbResult<MonthlyDuesRecord> {
        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO monthly_dues (
                id, member_id, month, total_paid_cents, paid_count, is_paid,
                paid_at, created_at, updated_at
            ) VALUES (?1, ?2, ?3, 0, 0, 0, NULL, ?4, ?4)
            ON CONFLICT (member_id, month) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(member_id)
        .bind(month.to_string())
        .bind(now)
        .execute(&mut *self.conn)
        .await?;

        self.find_monthly_record(member_id, month)
            .await?
            .ok_or_else(|| DbError::not_found("MonthlyDuesRecord", format!("{}/{}", member_id, month)))
    }

    /// Writes amount, count and paid state back.
    pub(crate) async fn save_monthly_record(&mut self, record: &MonthlyDuesRecord) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE monthly_dues SET
                total_paid_cents = ?2,
                paid_count = ?3,
                is_paid = ?4,
                paid_at = ?5,
                updated_at = ?6
            WHERE id = ?1
            "#,
        )
        .bind(&record.id)
        .bind(record.total_paid_cents)
        .bind(record.paid_count)
        .bind(record.is_paid)
        .bind(record.paid_at)
        .bind(Utc::now())
        .execute(&mut *self.conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("MonthlyDuesRecord", &record.id));
        }
        Ok(())
    }

    pub(crate) async fn delete_monthly_record(&mut self, record_id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM monthly_dues WHERE id = ?1")
            .bind(record_id)
            .execute(&mut *self.conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("MonthlyDuesRecord", record_id));
        }
        debug!(record_id, "Monthly dues record deleted");
        Ok(())
    }

    // =========================================================================
    // Transactions
    // =========================================================================

    /// Transactions linked to a dues record, oldest first.
    pub async fn find_transactions_for(
        &mut self,
        monthly_dues_id: &str,
    ) -> DbResult<Vec<TransactionRecord>> {
        let sql = format!(
            "SELECT {} FROM finance_transactions WHERE monthly_dues_id = ?1 ORDER BY seq",
            TRANSACTION_COLUMNS
        );
        let transactions = sqlx::query_as::<_, TransactionRecord>(&sql)
            .bind(monthly_dues_id)
            .fetch_all(&mut *self.conn)
            .await?;

        Ok(transactions)
    }

    /// Looks up the exact (record, amount, category) triple.
    pub async fn find_transaction(
        &mut self,
        monthly_dues_id: &str,
        amount_cents: i64,
        category_id: &str,
    ) -> DbResult<Option<TransactionRecord>> {
        let sql = format!(
            "SELECT {} FROM finance_transactions \
             WHERE monthly_dues_id = ?1 AND amount_cents = ?2 AND category_id = ?3 \
             ORDER BY seq LIMIT 1",
            TRANSACTION_COLUMNS
        );
        let transaction = sqlx::query_as::<_, TransactionRecord>(&sql)
            .bind(monthly_dues_id)
            .bind(amount_cents)
            .bind(category_id)
            .fetch_optional(&mut *self.conn)
            .await?;

        Ok(transaction)
    }

    /// The most recently created transaction of a dues record.
    pub async fn latest_transaction_for(
        &mut self,
        monthly_dues_id: &str,
    ) -> DbResult<Option<TransactionRecord>> {
        let sql = format!(
            "SELECT {} FROM finance_transactions WHERE monthly_dues_id = ?1 \
             ORDER BY seq DESC LIMIT 1",
            TRANSACTION_COLUMNS
        );
        let transaction = sqlx::query_as::<_, TransactionRecord>(&sql)
            .bind(monthly_dues_id)
            .fetch_optional(&mut *self.conn)
            .await?;

        Ok(transaction)
    }

    /// Every dues transaction posted against the month, oldest first.
    pub async fn transactions_for_month(
        &mut self,
        month: BillingMonth,
    ) -> DbResult<Vec<TransactionRecord>> {
        let sql = format!(
            "SELECT {} FROM finance_transactions \
             WHERE monthly_dues_id IN (SELECT id FROM monthly_dues WHERE month = ?1) \
             ORDER BY seq",
            TRANSACTION_COLUMNS
        );
        let transactions = sqlx::query_as::<_, TransactionRecord>(&sql)
            .bind(month.to_string())
            .fetch_all(&mut *self.conn)
            .await?;

        Ok(transactions)
    }

    pub(crate) async fn insert_transaction(&mut self, transaction: &TransactionRecord) -> DbResult<()> {
        debug!(
            id = %transaction.id,
            amount = transaction.amount_cents,
            covered = transaction.covered_count,
            "Posting ledger transaction"
        );

        sqlx::query(
            r#"
            INSERT INTO finance_transactions (
                id, amount_cents, direction, category_id, monthly_dues_id,
                event_id, covered_count, note, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&transaction.id)
        .bind(transaction.amount_cents)
        .bind(transaction.direction)
        .bind(&transaction.category_id)
        .bind(&transaction.monthly_dues_id)
        .bind(&transaction.event_id)
        .bind(transaction.covered_count)
        .bind(&transaction.note)
        .bind(transaction.created_at)
        .execute(&mut *self.conn)
        .await?;

        Ok(())
    }

    /// Records which registrations a transaction paid for.
    pub(crate) async fn record_coverage(
        &mut self,
        transaction_id: &str,
        registration_ids: &[&str],
    ) -> DbResult<()> {
        for registration_id in registration_ids {
            sqlx::query(
                "INSERT INTO transaction_coverage (transaction_id, registration_id) VALUES (?1, ?2)",
            )
            .bind(transaction_id)
            .bind(*registration_id)
            .execute(&mut *self.conn)
            .await?;
        }

        debug!(transaction_id, count = registration_ids.len(), "Transaction coverage recorded");
        Ok(())
    }

    /// Registrations a transaction paid for. Empty when none were recorded.
    pub async fn coverage_for(&mut self, transaction_id: &str) -> DbResult<Vec<String>> {
        let ids: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT registration_id
            FROM transaction_coverage
            WHERE transaction_id = ?1
            ORDER BY registration_id
            "#,
        )
        .bind(transaction_id)
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(ids)
    }

    /// Removes a transaction together with its coverage rows.
    pub(crate) async fn delete_transaction(&mut self, transaction_id: &str) -> DbResult<()> {
        sqlx::query("DELETE FROM transaction_coverage WHERE transaction_id = ?1")
            .bind(transaction_id)
            .execute(&mut *self.conn)
            .await?;

        let result = sqlx::query("DELETE FROM finance_transactions WHERE id = ?1")
            .bind(transaction_id)
            .execute(&mut *self.conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("TransactionRecord", transaction_id));
        }
        debug!(transaction_id, "Ledger transaction removed");
        Ok(())
    }

    // =========================================================================
    // Attendance fee flags
    // =========================================================================

    /// ACTIVE dues-bearing registrations of the member in the month, earliest
    /// event first.
    pub async fn find_qualifying_attendance(
        &mut self,
        member_id: &str,
        month: BillingMonth,
        filter: FlagFilter,
    ) -> DbResult<Vec<AttendanceFeeFlag>> {
        let (start, end) = month.date_range();
        let paid_clause = match filter {
            FlagFilter::All => "",
            FlagFilter::PaidOnly => "AND r.fee_paid = 1",
            FlagFilter::UnpaidOnly => "AND r.fee_paid = 0",
        };
        let sql = format!(
            "{} AND e.event_type IN {} {} ORDER BY e.event_date, e.id",
            FLAG_SELECT, DUES_BEARING_SQL, paid_clause
        );

        let flags = sqlx::query_as::<_, AttendanceFeeFlag>(&sql)
            .bind(member_id)
            .bind(start)
            .bind(end)
            .fetch_all(&mut *self.conn)
            .await?;

        Ok(flags)
    }

    /// Sets the fee flag on the given registrations. Returns rows changed.
    pub(crate) async fn set_fee_paid(&mut self, registration_ids: &[&str], paid: bool) -> DbResult<u64> {
        let now = Utc::now();
        let mut changed = 0;

        for id in registration_ids {
            let result = sqlx::query(
                r#"
                UPDATE registrations
                SET fee_paid = ?2, updated_at = ?3
                WHERE id = ?1 AND fee_paid <> ?2
                "#,
            )
            .bind(*id)
            .bind(paid)
            .bind(now)
            .execute(&mut *self.conn)
            .await?;
            changed += result.rows_affected();
        }

        debug!(count = changed, paid, "Attendance fee flags updated");
        Ok(changed)
    }

    // =========================================================================
    // Invariants
    // =========================================================================

    /// Checks a dues record against its linked transactions.
    ///
    /// A mismatch is logged and returned as an error, which aborts the unit
    /// of work. Nothing is corrected.
    pub async fn verify_record(&mut self, record: &MonthlyDuesRecord) -> DbResult<()> {
        let transactions = self.find_transactions_for(&record.id).await?;
        reconcile::check_record(record, &transactions).map_err(DbError::invariant)
    }
}
