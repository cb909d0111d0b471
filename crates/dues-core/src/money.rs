//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In floating point:                                                     │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  A dues ledger must reconcile to the unit:                              │
//! │    record.total_paid == Σ transaction.amount                            │
//! │                                                                         │
//! │  OUR SOLUTION: Integer minor units                                      │
//! │    220 × 3 = 660, 660 − 220 = 440, always exact                         │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use dues_core::money::Money;
//!
//! let fee = Money::from_cents(220);
//! let owed = fee.multiply_quantity(3);
//! assert_eq!(owed.cents(), 660);
//! assert_eq!((owed - fee).cents(), 440);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit.
///
/// ## Design Decisions
/// - **i64 (signed)**: differences (outstanding, reversal deltas) may go negative
/// - **Single field tuple struct**: Zero-cost abstraction over i64
///
/// ## Where Money Flows
/// ```text
/// BillingRates.unit_fee ──► amount owed ──► TransactionRecord.amount
///                                                  │
///                                                  ▼
///                               MonthlyDuesRecord.total_paid (Σ amounts)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from minor units.
    ///
    /// ## Example
    /// ```rust
    /// use dues_core::money::Money;
    ///
    /// let fee = Money::from_cents(180);
    /// assert_eq!(fee.cents(), 180);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Returns the value in minor units.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit portion.
    #[inline]
    const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    const fn minor_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Multiplies money by a count of events.
    ///
    /// ## Example
    /// ```rust
    /// use dues_core::money::Money;
    ///
    /// let fee = Money::from_cents(180);
    /// assert_eq!(fee.multiply_quantity(4).cents(), 720);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// How many whole `unit`s fit in this amount, if it divides exactly.
    ///
    /// Returns `None` for a zero/negative unit or a remainder. The ledger
    /// stores counts explicitly; this is only used to cross-check them.
    ///
    /// ## Example
    /// ```rust
    /// use dues_core::money::Money;
    ///
    /// let fee = Money::from_cents(220);
    /// assert_eq!(Money::from_cents(660).exact_units_of(fee), Some(3));
    /// assert_eq!(Money::from_cents(500).exact_units_of(fee), None);
    /// ```
    pub fn exact_units_of(&self, unit: Money) -> Option<i64> {
        if unit.0 <= 0 || self.0 % unit.0 != 0 {
            return None;
        }
        Some(self.0 / unit.0)
    }

    /// Returns `self - other`, floored at zero.
    #[inline]
    pub fn saturating_sub_floor(&self, other: Money) -> Money {
        Money((self.0 - other.0).max(0))
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Debug-style display as `major.minor`. UI formatting lives elsewhere.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.major().abs(), self.minor_part())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
