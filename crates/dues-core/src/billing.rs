//! # Billing Rate Resolver
//!
//! Turns a member's billing model and a month's event counts into a fee.
//!
//! ## The Two Models
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  FIXED                                                                  │
//! │    owed = fixed_unit_fee × (qualifying events SCHEDULED this month)     │
//! │    → a flat membership due; personal attendance is irrelevant           │
//! │                                                                         │
//! │  SINGLE                                                                 │
//! │    owed = single_unit_fee × (member's own qualifying registrations)     │
//! │    → payable a few events at a time                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every function here is pure.

use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::types::{BillingModel, EventType};
use crate::{DEFAULT_FIXED_UNIT_FEE_CENTS, DEFAULT_SINGLE_UNIT_FEE_CENTS};

/// Per-event fees for both billing models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingRates {
    pub fixed_unit_fee: Money,
    pub single_unit_fee: Money,
}

impl BillingRates {
    pub const fn new(fixed_unit_fee: Money, single_unit_fee: Money) -> Self {
        BillingRates {
            fixed_unit_fee,
            single_unit_fee,
        }
    }

    /// The per-event fee for a billing model.
    pub fn unit_fee(&self, model: BillingModel) -> Money {
        match model {
            BillingModel::Fixed => self.fixed_unit_fee,
            BillingModel::Single => self.single_unit_fee,
        }
    }

    /// Fee one event contributes to monthly dues. Zero for event types that
    /// are billed outside dues.
    pub fn fee_for_event(&self, model: BillingModel, event_type: EventType) -> Money {
        if event_type.is_dues_bearing() {
            self.unit_fee(model)
        } else {
            Money::zero()
        }
    }

    /// Number of billable events for the month.
    ///
    /// * `scheduled_events` - qualifying events scheduled in the month
    /// * `member_registrations` - the member's ACTIVE qualifying registrations
    pub fn owed_count(
        &self,
        model: BillingModel,
        scheduled_events: i64,
        member_registrations: i64,
    ) -> i64 {
        match model {
            BillingModel::Fixed => scheduled_events.max(0),
            BillingModel::Single => member_registrations.max(0),
        }
    }

    /// Total owed for the month.
    pub fn amount_owed(
        &self,
        model: BillingModel,
        scheduled_events: i64,
        member_registrations: i64,
    ) -> Money {
        self.unit_fee(model)
            .multiply_quantity(self.owed_count(model, scheduled_events, member_registrations))
    }
}

impl Default for BillingRates {
    fn default() -> Self {
        BillingRates::new(
            Money::from_cents(DEFAULT_FIXED_UNIT_FEE_CENTS),
            Money::from_cents(DEFAULT_SINGLE_UNIT_FEE_CENTS),
        )
    }
}

/// How many events a SINGLE payment may cover.
///
/// `requested` is clamped to what is still unpaid; the result is never
/// negative. Zero means there is nothing left to pay.
///
/// ## Example
/// ```rust
/// use dues_core::billing::clamp_single_request;
///
/// // 3 qualifying registrations, none paid, caller asks for 5
/// assert_eq!(clamp_single_request(5, 3, 0), 3);
/// // 2 already paid, caller asks for 1
/// assert_eq!(clamp_single_request(1, 3, 2), 1);
/// // everything paid
/// assert_eq!(clamp_single_request(4, 3, 3), 0);
/// ```
pub fn clamp_single_request(requested: i64, qualifying_count: i64, already_paid: i64) -> i64 {
    let remaining = qualifying_count - already_paid;
    requested.min(remaining).max(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_rates() {
        let rates = BillingRates::default();
        assert_eq!(rates.unit_fee(BillingModel::Fixed).cents(), 180);
        assert_eq!(rates.unit_fee(BillingModel::Single).cents(), 220);
    }

    #[test]
    fn test_fixed_ignores_personal_attendance() {
        let rates = BillingRates::default();
        // 4 scheduled, member attended only 1
        assert_eq!(rates.amount_owed(BillingModel::Fixed, 4, 1).cents(), 720);
        assert_eq!(rates.owed_count(BillingModel::Fixed, 4, 1), 4);
    }

    #[test]
    fn test_single_scales_with_registrations() {
        let rates = BillingRates::default();
        assert_eq!(rates.amount_owed(BillingModel::Single, 8, 3).cents(), 660);
        assert_eq!(rates.amount_owed(BillingModel::Single, 8, 0).cents(), 0);
    }

    #[test]
    fn test_non_qualifying_events_are_free() {
        let rates = BillingRates::default();
        assert!(rates
            .fee_for_event(BillingModel::Fixed, EventType::Social)
            .is_zero());
        assert_eq!(
            rates
                .fee_for_event(BillingModel::Single, EventType::Match)
                .cents(),
            220
        );
    }

    #[test]
    fn test_clamp_never_overpays() {
        assert_eq!(clamp_single_request(10, 3, 1), 2);
        assert_eq!(clamp_single_request(2, 5, 0), 2);
        assert_eq!(clamp_single_request(1, 0, 0), 0);
        // Inconsistent input (more paid than registered) still floors at zero
        assert_eq!(clamp_single_request(1, 2, 3), 0);
    }
}
