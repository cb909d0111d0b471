//! # Billing Month
//!
//! A calendar month, the second half of a dues record's key.
//! Persisted and exchanged as `"YYYY-MM"`.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A (year, month) pair.
///
/// ## Example
/// ```rust
/// use dues_core::BillingMonth;
///
/// let month: BillingMonth = "2026-05".parse().unwrap();
/// assert_eq!(month.to_string(), "2026-05");
/// assert_eq!(month.next().to_string(), "2026-06");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BillingMonth {
    year: i32,
    month: u32,
}

impl BillingMonth {
    /// Creates a month, rejecting out-of-range values.
    pub fn new(year: i32, month: u32) -> Result<Self, ValidationError> {
        if !(1..=12).contains(&month) {
            return Err(ValidationError::OutOfRange {
                field: "month".to_string(),
                min: 1,
                max: 12,
            });
        }
        if !(1..=9999).contains(&year) {
            return Err(ValidationError::OutOfRange {
                field: "year".to_string(),
                min: 1,
                max: 9999,
            });
        }
        Ok(BillingMonth { year, month })
    }

    /// The month containing `date`.
    pub fn of(date: NaiveDate) -> Self {
        BillingMonth {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// First day of this month.
    pub fn first_day(&self) -> NaiveDate {
        // Both fields are range-checked at construction, day 1 always exists.
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    /// The following month.
    pub fn next(&self) -> Self {
        if self.month == 12 {
            BillingMonth {
                year: self.year + 1,
                month: 1,
            }
        } else {
            BillingMonth {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// Half-open date range `[first_day, next.first_day)` for queries.
    pub fn date_range(&self) -> (NaiveDate, NaiveDate) {
        (self.first_day(), self.next().first_day())
    }
}

impl fmt::Display for BillingMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for BillingMonth {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ValidationError::Required {
                field: "month".to_string(),
            });
        }

        let invalid = || ValidationError::InvalidFormat {
            field: "month".to_string(),
            reason: format!("expected YYYY-MM, got '{}'", s),
        };

        let (year, month) = s.split_once('-').ok_or_else(invalid)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(invalid());
        }
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;

        BillingMonth::new(year, month)
    }
}

impl TryFrom<String> for BillingMonth {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<BillingMonth> for String {
    fn from(month: BillingMonth) -> Self {
        month.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let month: BillingMonth = "2026-05".parse().unwrap();
        assert_eq!(month.year(), 2026);
        assert_eq!(month.month(), 5);
        assert_eq!(month.to_string(), "2026-05");
    }

    #[test]
    fn test_rejects_malformed() {
        assert!(matches!(
            "".parse::<BillingMonth>(),
            Err(ValidationError::Required { .. })
        ));
        assert!("2026-5".parse::<BillingMonth>().is_err());
        assert!("2026/05".parse::<BillingMonth>().is_err());
        assert!("abcd-ef".parse::<BillingMonth>().is_err());
        assert!(matches!(
            "2026-13".parse::<BillingMonth>(),
            Err(ValidationError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_year_rollover() {
        let december = BillingMonth::new(2025, 12).unwrap();
        let (start, end) = december.date_range();
        assert_eq!(start, NaiveDate::from_ymd_opt(2025, 12, 1).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2026, 1, 1).unwrap());
    }

    #[test]
    fn test_of_date() {
        let month = BillingMonth::new(2026, 2).unwrap();
        assert_eq!(
            BillingMonth::of(NaiveDate::from_ymd_opt(2026, 2, 14).unwrap()),
            month
        );
    }

    #[test]
    fn test_serde_as_string() {
        let month = BillingMonth::new(2026, 5).unwrap();
        let json = serde_json::to_string(&month).unwrap();
        assert_eq!(json, "\"2026-05\"");
        let back: BillingMonth = serde_json::from_str(&json).unwrap();
        assert_eq!(back, month);
        assert!(serde_json::from_str::<BillingMonth>("\"May\"").is_err());
    }
}
