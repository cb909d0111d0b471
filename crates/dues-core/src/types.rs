//! # Domain Types
//!
//! Core domain types used throughout the dues ledger.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │     Member      │   │      Event      │   │  Registration   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  member_id (FK) │       │
//! │  │  billing_model  │   │  event_type     │   │  event_id (FK)  │       │
//! │  │                 │   │  event_date     │   │  fee_paid  ◄────┼── flag│
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌──────────────────────┐        ┌──────────────────────┐              │
//! │  │  MonthlyDuesRecord   │ 1    n │  TransactionRecord   │              │
//! │  │  ──────────────────  │◄───────│  ──────────────────  │              │
//! │  │  (member, "YYYY-MM") │        │  amount_cents        │              │
//! │  │  total_paid_cents    │        │  covered_count       │              │
//! │  │  paid_count          │        │  monthly_dues_id     │              │
//! │  └──────────────────────┘        └──────────────────────┘              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Billing Model
// =============================================================================

/// How a member is billed for dues-bearing events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum BillingModel {
    /// Flat rate per qualifying event scheduled in the month; paid in one go.
    Fixed,
    /// Per-event rate on the member's own registrations; paid incrementally.
    Single,
}

impl BillingModel {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillingModel::Fixed => "fixed",
            BillingModel::Single => "single",
        }
    }
}

// =============================================================================
// Event Type
// =============================================================================

/// Kind of club event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Practice,
    Match,
    Tournament,
    /// Billed and settled on its own, never through monthly dues.
    Social,
    /// Billed and settled on its own, never through monthly dues.
    Special,
}

impl EventType {
    /// The three dues-bearing event types.
    pub const DUES_BEARING: [EventType; 3] =
        [EventType::Practice, EventType::Match, EventType::Tournament];

    /// Whether this event counts toward monthly dues.
    pub fn is_dues_bearing(&self) -> bool {
        Self::DUES_BEARING.contains(self)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Practice => "practice",
            EventType::Match => "match",
            EventType::Tournament => "tournament",
            EventType::Social => "social",
            EventType::Special => "special",
        }
    }
}

// =============================================================================
// Registration Status
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStatus {
    /// Counts toward attendance and dues.
    Active,
    /// Withdrawn; ignored by every dues calculation.
    Cancelled,
}

impl RegistrationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegistrationStatus::Active => "active",
            RegistrationStatus::Cancelled => "cancelled",
        }
    }
}

// =============================================================================
// Transaction Direction
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum TransactionDirection {
    Income,
    Expense,
}

impl TransactionDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionDirection::Income => "income",
            TransactionDirection::Expense => "expense",
        }
    }
}

// =============================================================================
// Member
// =============================================================================

/// A club member.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Member {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Name shown on unpaid lists and reminders.
    pub display_name: String,

    pub billing_model: BillingModel,

    /// Inactive members are left out of monthly overviews.
    pub is_active: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Event
// =============================================================================

/// A scheduled club event.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Event {
    pub id: String,
    pub title: String,
    pub event_type: EventType,
    #[ts(as = "String")]
    pub event_date: NaiveDate,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Registration
// =============================================================================

/// A member's registration for an event. Carries the attendance fee flag.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Registration {
    pub id: String,
    pub member_id: String,
    pub event_id: String,
    pub status: RegistrationStatus,
    /// The attendance fee flag.
    pub fee_paid: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Attendance Fee Flag
// =============================================================================

/// Read view joining an ACTIVE registration with its event.
///
/// One exists per (member, event); only dues-bearing event types are ever
/// loaded into this view by the ledger store.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct AttendanceFeeFlag {
    pub registration_id: String,
    pub member_id: String,
    pub event_id: String,
    pub event_type: EventType,
    #[ts(as = "String")]
    pub event_date: NaiveDate,
    pub paid: bool,
}

/// Which flags `find_qualifying_attendance` returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagFilter {
    All,
    PaidOnly,
    UnpaidOnly,
}

// =============================================================================
// Finance Category
// =============================================================================

/// Finance category a transaction is posted under (external lookup).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct FinanceCategory {
    pub id: String,
    pub name: String,
    pub direction: TransactionDirection,
}

// =============================================================================
// Monthly Dues Record
// =============================================================================

/// Aggregate of everything a member paid toward one month's dues.
///
/// Keyed by (member_id, month). Exists only while at least one linked
/// transaction exists.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct MonthlyDuesRecord {
    pub id: String,
    pub member_id: String,
    /// "YYYY-MM".
    pub month: String,
    /// Must equal Σ amount_cents of linked transactions.
    pub total_paid_cents: i64,
    /// Number of qualifying events covered. Must equal Σ covered_count.
    pub paid_count: i64,
    /// True iff at least one linked transaction exists.
    pub is_paid: bool,
    #[ts(as = "Option<String>")]
    pub paid_at: Option<DateTime<Utc>>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl MonthlyDuesRecord {
    #[inline]
    pub fn total_paid(&self) -> Money {
        Money::from_cents(self.total_paid_cents)
    }
}

// =============================================================================
// Transaction Record
// =============================================================================

/// An immutable ledger entry.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct TransactionRecord {
    pub id: String,
    pub amount_cents: i64,
    pub direction: TransactionDirection,
    pub category_id: String,
    /// Set for dues payments.
    pub monthly_dues_id: Option<String>,
    /// Set for single-event payments (settled outside monthly dues).
    pub event_id: Option<String>,
    /// Qualifying events this entry pays for.
    pub covered_count: i64,
    pub note: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl TransactionRecord {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
