//! # Repository Module
//!
//! Database access for the dues ledger.
//!
//! ## Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  RosterRepository (pool-bound)                                         │
//! │  ├── members        register / change model / deactivate               │
//! │  ├── events         schedule                                           │
//! │  └── registrations  register / withdraw                                │
//! │                                                                         │
//! │  LedgerStore<'c> (bound to one UnitOfWork)                              │
//! │  ├── monthly_dues          aggregate per (member, month)               │
//! │  ├── finance_transactions  append-only ledger entries                  │
//! │  └── registrations.fee_paid  attendance fee flags                      │
//! │                                                                         │
//! │  CategoryLookup  get-or-create of the dues finance category            │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Roster writes run on their own. Ledger writes only ever run inside a
//! unit of work, so the three ledger tables change together or not at all.

pub mod category;
pub mod ledger_store;
pub mod roster;
