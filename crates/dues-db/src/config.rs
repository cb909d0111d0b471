//! # Ledger Configuration
//!
//! Fee schedule and category naming, loaded from environment variables with
//! fallback to defaults.
//!
//! ## Variables
//! ```text
//! DUES_FIXED_UNIT_FEE   per-event fee for FIXED members   (default 180)
//! DUES_SINGLE_UNIT_FEE  per-event fee for SINGLE members  (default 220)
//! DUES_CATEGORY         finance category for dues income  (default "Monthly Dues")
//! ```

use std::env;

use dues_core::{BillingRates, Money, DEFAULT_DUES_CATEGORY};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Runtime configuration of the dues ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Per-event fees for both billing models.
    pub rates: BillingRates,

    /// Name of the finance category dues transactions post under.
    pub dues_category: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        LedgerConfig {
            rates: BillingRates::default(),
            dues_category: DEFAULT_DUES_CATEGORY.to_string(),
        }
    }
}

impl LedgerConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = LedgerConfig::default();

        let fee = |key: &str, default: Money| -> Result<Money, ConfigError> {
            let Some(raw) = lookup(key) else {
                return Ok(default);
            };
            let cents: i64 = raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))?;
            if cents <= 0 {
                return Err(ConfigError::NonPositiveFee(key.to_string()));
            }
            Ok(Money::from_cents(cents))
        };

        let rates = BillingRates::new(
            fee("DUES_FIXED_UNIT_FEE", defaults.rates.fixed_unit_fee)?,
            fee("DUES_SINGLE_UNIT_FEE", defaults.rates.single_unit_fee)?,
        );

        let dues_category = match lookup("DUES_CATEGORY") {
            Some(name) if name.trim().is_empty() => {
                return Err(ConfigError::InvalidValue("DUES_CATEGORY".to_string()))
            }
            Some(name) => name.trim().to_string(),
            None => defaults.dues_category,
        };

        let config = LedgerConfig {
            rates,
            dues_category,
        };
        debug!(?config, "Ledger configuration loaded");
        Ok(config)
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("{0} must be a positive amount")]
    NonPositiveFee(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = LedgerConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config, LedgerConfig::default());
        assert_eq!(config.rates.fixed_unit_fee.cents(), 180);
        assert_eq!(config.rates.single_unit_fee.cents(), 220);
        assert_eq!(config.dues_category, "Monthly Dues");
    }

    #[test]
    fn test_overrides() {
        let config = LedgerConfig::from_lookup(lookup_from(&[
            ("DUES_FIXED_UNIT_FEE", "200"),
            ("DUES_SINGLE_UNIT_FEE", " 250 "),
            ("DUES_CATEGORY", "Club Fees"),
        ]))
        .unwrap();
        assert_eq!(config.rates.fixed_unit_fee.cents(), 200);
        assert_eq!(config.rates.single_unit_fee.cents(), 250);
        assert_eq!(config.dues_category, "Club Fees");
    }

    #[test]
    fn test_rejects_bad_fees() {
        let err = LedgerConfig::from_lookup(lookup_from(&[("DUES_FIXED_UNIT_FEE", "abc")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(_)));

        let err = LedgerConfig::from_lookup(lookup_from(&[("DUES_SINGLE_UNIT_FEE", "0")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::NonPositiveFee(_)));

        let err =
            LedgerConfig::from_lookup(lookup_from(&[("DUES_CATEGORY", "  ")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(_)));
    }
}
