//! # dues-core: Pure Business Logic for the Dues Ledger
//!
//! This crate holds the rules that keep three records consistent: the
//! per-event attendance fee flag, the per-member monthly dues record, and the
//! append-only finance transaction ledger. Everything here is a pure function
//! of its inputs; the database layer (`dues-db`) applies the results inside a
//! single unit of work.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Dues Ledger Architecture                         │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              Admin actions (mark paid / cancel / report)        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ dues-core (THIS CRATE) ★                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │  billing  │  │ reconcile │  │ validation│  │   │
//! │  │   │  Member   │  │  rates    │  │ DuesState │  │   rules   │  │   │
//! │  │   │  Records  │  │  owed     │  │ checks    │  │  checks   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    dues-db (Database Layer)                     │   │
//! │  │       unit of work, ledger store, poster, reversal, reports     │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Member, Event, MonthlyDuesRecord, ...)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`month`] - `BillingMonth`, the "YYYY-MM" key of a dues record
//! - [`billing`] - Billing Rate Resolver
//! - [`reconcile`] - Dues state machine and invariant checks
//! - [`outcome`] - Operation results and the monthly summary
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//!
//! ## Example Usage
//!
//! ```rust
//! use dues_core::billing::BillingRates;
//! use dues_core::BillingModel;
//!
//! let rates = BillingRates::default();
//!
//! // FIXED members owe the flat rate for every qualifying event scheduled
//! let owed = rates.amount_owed(BillingModel::Fixed, 4, 2);
//! assert_eq!(owed.cents(), 720);
//!
//! // SINGLE members owe for their own registrations only
//! let owed = rates.amount_owed(BillingModel::Single, 4, 2);
//! assert_eq!(owed.cents(), 440);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod billing;
pub mod error;
pub mod money;
pub mod month;
pub mod outcome;
pub mod reconcile;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use billing::BillingRates;
pub use error::{CoreError, CoreResult, InvariantRule, InvariantViolation, ValidationError};
pub use money::Money;
pub use month::BillingMonth;
pub use outcome::{
    DuesPosting, DuesReversal, FixedPosting, FixedReversal, LedgerOutcome, MonthlySummary,
    NoChangeReason, SinglePosting, SingleReversal,
};
pub use reconcile::DuesState;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Default per-event fee for FIXED members, in minor currency units.
pub const DEFAULT_FIXED_UNIT_FEE_CENTS: i64 = 180;

/// Default per-event fee for SINGLE members, in minor currency units.
pub const DEFAULT_SINGLE_UNIT_FEE_CENTS: i64 = 220;

/// Name of the finance category dues payments are posted under.
pub const DEFAULT_DUES_CATEGORY: &str = "Monthly Dues";
