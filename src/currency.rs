//! Currency registry and hour conversion.

use std::collections::BTreeSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::LedgerConfig;
use crate::error::{LedgerError, Result};
use crate::price::{CurrencyPriceSnapshot, HourPriceSnapshot, PriceFeed};
use crate::types::PriceSnapshotId;

/// Registered currency labels, normalized to uppercase.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CurrencyRegistry {
    labels: BTreeSet<String>,
}

impl CurrencyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a label. Idempotent.
    pub fn register(&mut self, label: &str) {
        self.labels.insert(label.to_uppercase());
    }

    /// Normalize a label and confirm it is registered.
    pub fn resolve(&self, label: &str) -> Result<String> {
        let normalized = label.to_uppercase();
        if self.labels.contains(&normalized) {
            Ok(normalized)
        } else {
            Err(LedgerError::UnknownCurrency(label.to_string()))
        }
    }

    pub fn is_registered(&self, label: &str) -> bool {
        self.labels.contains(&label.to_uppercase())
    }
}

/// The result of converting a currency into hours: how many hours one
/// unit of the currency buys, and which snapshots said so.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    /// Normalized currency label.
    pub label: String,
    /// Hours obtainable per one unit of the currency.
    pub hours_per_unit: Decimal,
    pub hour_price: Option<PriceSnapshotId>,
    pub currency_price: Option<PriceSnapshotId>,
}

impl Quote {
    /// Resolve a quote from the latest snapshots of the configured
    /// providers.
    ///
    /// The native hour label converts at rate 1 with no lookup. Fails
    /// with [`LedgerError::StalePriceData`] when either provider has no
    /// snapshot, or the rate table is missing a needed label.
    pub fn resolve(label: &str, feed: &dyn PriceFeed, config: &LedgerConfig) -> Result<Self> {
        let normalized = label.to_uppercase();
        if normalized == config.native_hour_label {
            return Ok(Self::native(normalized));
        }

        let hour_price = feed
            .latest_hour_price(&config.hour_price_provider)
            .ok_or_else(|| LedgerError::StalePriceData {
                kind: "hour price",
                provider: config.hour_price_provider.clone(),
            })?;
        let currency_price = feed
            .latest_currency_price(&config.currency_price_provider)
            .ok_or_else(|| LedgerError::StalePriceData {
                kind: "currency price",
                provider: config.currency_price_provider.clone(),
            })?;

        Self::from_snapshots(&normalized, hour_price, currency_price)
    }

    /// Resolve a quote from an explicit snapshot pair.
    pub fn from_snapshots(
        label: &str,
        hour_price: &HourPriceSnapshot,
        currency_price: &CurrencyPriceSnapshot,
    ) -> Result<Self> {
        let normalized = label.to_uppercase();

        let hour_base_rate =
            currency_price
                .rate(&hour_price.base)
                .ok_or_else(|| LedgerError::StalePriceData {
                    kind: "exchange rate",
                    provider: hour_price.base.clone(),
                })?;
        let local_base_rate =
            currency_price
                .rate(&normalized)
                .ok_or_else(|| LedgerError::StalePriceData {
                    kind: "exchange rate",
                    provider: normalized.clone(),
                })?;

        // Price of one hour in the local currency.
        let local_hour_price = hour_price
            .unit_price
            .checked_div(hour_base_rate)
            .and_then(|p| p.checked_mul(local_base_rate))
            .filter(|p| !p.is_zero())
            .ok_or(LedgerError::Arithmetic("local hour price"))?;
        let hours_per_unit = Decimal::ONE
            .checked_div(local_hour_price)
            .ok_or(LedgerError::Arithmetic("hours per unit"))?;

        debug!(
            label = %normalized,
            rate = %hours_per_unit,
            hour_price = %hour_price.unit_price,
            "Resolved currency quote"
        );

        Ok(Self {
            label: normalized,
            hours_per_unit,
            hour_price: Some(hour_price.id),
            currency_price: Some(currency_price.id),
        })
    }

    fn native(label: String) -> Self {
        Self {
            label,
            hours_per_unit: Decimal::ONE,
            hour_price: None,
            currency_price: None,
        }
    }

    /// Currency units per hour.
    pub fn unit_cost(&self) -> Result<Decimal> {
        Decimal::ONE
            .checked_div(self.hours_per_unit)
            .ok_or(LedgerError::Arithmetic("hour unit cost"))
    }
}
