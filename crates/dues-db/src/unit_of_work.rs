//! # Unit of Work
//!
//! One database transaction spanning a whole ledger operation.
//!
//! ## Why
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                   SINGLE TRANSACTION PER OPERATION                      │
//! │                                                                         │
//! │  mark paid:   INSERT finance_transactions                               │
//! │               UPSERT monthly_dues                                       │
//! │               UPDATE registrations SET fee_paid = 1   (× N)             │
//! │                                                                         │
//! │  cancel:      DELETE finance_transactions                               │
//! │               UPDATE / DELETE monthly_dues                              │
//! │               UPDATE registrations SET fee_paid = 0   (× N)             │
//! │                                                                         │
//! │  commit() ← all of it, or                                               │
//! │  rollback() / drop / `?` ← none of it                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A reader never observes a ledger entry without its flag updates, or the
//! reverse.

use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::ledger_store::LedgerStore;

/// An open transaction. Dropping it without `commit` rolls back.
#[derive(Debug)]
pub struct UnitOfWork {
    tx: Transaction<'static, Sqlite>,
}

impl UnitOfWork {
    /// Opens a new transaction on the pool.
    pub async fn begin(pool: &SqlitePool) -> DbResult<Self> {
        let tx = pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;
        debug!("Unit of work started");
        Ok(UnitOfWork { tx })
    }

    /// The connection every statement of this unit of work runs on.
    pub fn conn(&mut self) -> &mut SqliteConnection {
        &mut self.tx
    }

    /// Ledger store view over this unit of work.
    pub fn ledger(&mut self) -> LedgerStore<'_> {
        LedgerStore::new(&mut self.tx)
    }

    /// Makes every change visible atomically.
    pub async fn commit(self) -> DbResult<()> {
        self.tx
            .commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;
        debug!("Unit of work committed");
        Ok(())
    }

    /// Discards every change.
    pub async fn rollback(self) -> DbResult<()> {
        self.tx
            .rollback()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;
        debug!("Unit of work rolled back");
        Ok(())
    }
}
