//! # Validation Module
//!
//! Input validation for ledger operations.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: THIS MODULE                                                  │
//! │  ├── Identifiers present, month well-formed, counts positive           │
//! │  └── Runs before any unit of work is opened                            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Database (SQLite)                                            │
//! │  ├── UNIQUE (member_id, month), UNIQUE (member_id, event_id)           │
//! │  ├── CHECK constraints on enums and amounts                            │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use dues_core::validation::{validate_member_id, validate_month};
//!
//! assert!(validate_member_id("  ").is_err());
//! let month = validate_month("2026-05").unwrap();
//! assert_eq!(month.to_string(), "2026-05");
//! ```

use crate::error::ValidationError;
use crate::month::BillingMonth;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest display name / event title accepted.
const MAX_NAME_LEN: usize = 200;

fn validate_id(field: &str, value: &str) -> ValidationResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    if value.len() > 64 {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: 64,
        });
    }
    Ok(value.to_string())
}

/// Validates a member identifier and returns it trimmed.
pub fn validate_member_id(member_id: &str) -> ValidationResult<String> {
    validate_id("member_id", member_id)
}

/// Validates an event identifier and returns it trimmed.
pub fn validate_event_id(event_id: &str) -> ValidationResult<String> {
    validate_id("event_id", event_id)
}

/// Parses a `"YYYY-MM"` month.
pub fn validate_month(month: &str) -> ValidationResult<BillingMonth> {
    month.parse()
}

/// Validates the number of events a SINGLE payment asks for.
///
/// ## Rules
/// - Must be at least 1 (clamping to what is unpaid happens later)
pub fn validate_requested_count(count: i64) -> ValidationResult<i64> {
    if count < 1 {
        return Err(ValidationError::MustBePositive {
            field: "count".to_string(),
        });
    }
    Ok(count)
}

fn validate_name(field: &str, name: &str) -> ValidationResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_NAME_LEN,
        });
    }
    Ok(name.to_string())
}

/// Validates a member display name.
pub fn validate_display_name(name: &str) -> ValidationResult<String> {
    validate_name("display_name", name)
}

/// Validates an event title.
pub fn validate_event_title(title: &str) -> ValidationResult<String> {
    validate_name("title", title)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_member_id() {
        assert_eq!(validate_member_id("  m-1 ").unwrap(), "m-1");
        assert!(matches!(
            validate_member_id(""),
            Err(ValidationError::Required { .. })
        ));
        assert!(validate_member_id(&"x".repeat(65)).is_err());
    }

    #[test]
    fn test_validate_month() {
        assert!(validate_month("2026-05").is_ok());
        assert!(matches!(
            validate_month("   "),
            Err(ValidationError::Required { .. })
        ));
        assert!(validate_month("05-2026").is_err());
    }

    #[test]
    fn test_validate_requested_count() {
        assert_eq!(validate_requested_count(3).unwrap(), 3);
        assert!(validate_requested_count(0).is_err());
        assert!(validate_requested_count(-2).is_err());
    }

    #[test]
    fn test_validate_names() {
        assert_eq!(validate_display_name(" Aiko ").unwrap(), "Aiko");
        assert!(validate_display_name("").is_err());
        assert!(validate_event_title(&"a".repeat(201)).is_err());
        assert!(validate_event_title("Sunday practice").is_ok());
    }
}
