//! Configuration for the contribution ledger.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Number of fractional digits every externally entered hour or currency
/// quantity is normalized to. Derived quantities (rates, unit costs) keep
/// full decimal precision.
pub const HOUR_SCALE: u32 = 8;

/// Configuration for a [`crate::Ledger`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Free investable hours each investor receives per day.
    pub daily_quota: Decimal,
    /// Currency label that denominates hours directly; converts at rate 1
    /// with no price lookup.
    pub native_hour_label: String,
    /// Provider consulted for the latest hour price snapshot.
    pub hour_price_provider: String,
    /// Provider consulted for the latest currency price snapshot.
    pub currency_price_provider: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            daily_quota: Decimal::new(4, 0),
            native_hour_label: "HUR".to_string(),
            hour_price_provider: "FRED".to_string(),
            currency_price_provider: "FIXER".to_string(),
        }
    }
}

impl LedgerConfig {
    /// Create a config with a custom daily quota.
    pub fn with_daily_quota(daily_quota: Decimal) -> Self {
        Self {
            daily_quota,
            ..Default::default()
        }
    }
}
