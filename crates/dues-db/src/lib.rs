//! # dues-db: Storage and Transactional Operations for the Dues Ledger
//!
//! SQLite storage (through sqlx) and every operation that changes or reads
//! the ledger.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Dues Ledger Data Flow                            │
//! │                                                                         │
//! │  Admin action (mark paid / cancel / unpaid list)                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     dues-db (THIS CRATE)                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐   ┌────────────────┐   ┌──────────────┐    │   │
//! │  │   │  DuesLedger   │   │  UnitOfWork    │   │  Migrations  │    │   │
//! │  │   │  (ledger/)    │──►│  LedgerStore   │   │  (embedded)  │    │   │
//! │  │   │ payment       │   │  CategoryLookup│   │              │    │   │
//! │  │   │ reversal      │   └────────────────┘   │ 001_dues_... │    │   │
//! │  │   │ reporting     │   ┌────────────────┐   └──────────────┘    │   │
//! │  │   └───────────────┘   │ RosterRepository│                       │   │
//! │  │                       └────────────────┘                        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                         uses dues-core for every rule          │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (WAL)                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`config`] - Fee schedule and category from the environment
//! - [`error`] - Database error types
//! - [`unit_of_work`] - One transaction per ledger operation
//! - [`repository`] - Ledger store, roster, category lookup
//! - [`ledger`] - Payment Poster, Reversal Engine, Reporting View
//!
//! ## Usage
//!
//! ```rust,ignore
//! use dues_db::{Database, DbConfig, LedgerConfig};
//!
//! let db = Database::new(DbConfig::new("dues.db")).await?;
//! let ledger = db.ledger(&LedgerConfig::from_env()?);
//!
//! let outcome = ledger.mark_paid_single(&member_id, "2026-05", 2).await?;
//! let unpaid = ledger.unpaid_members("2026-05").await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod ledger;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod unit_of_work;

#[cfg(test)]
mod test_support;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{ConfigError, LedgerConfig};
pub use error::{DbError, DbResult};
pub use ledger::DuesLedger;
pub use pool::{Database, DbConfig};
pub use unit_of_work::UnitOfWork;

// Repository re-exports for convenience
pub use repository::category::CategoryLookup;
pub use repository::ledger_store::LedgerStore;
pub use repository::roster::RosterRepository;
