//! External price snapshots and the feed that serves them.
//!
//! Two snapshot kinds back every conversion: an hour price (what one hour
//! of labor is worth in some base currency) and a currency price (exchange
//! rates relative to that snapshot's own base). Snapshots are immutable,
//! timestamped records keyed by provider name; conversion always works
//! from an explicit snapshot pair so the math is reproducible.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::PriceSnapshotId;

/// Average price of one hour of labor, in `base` currency units.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HourPriceSnapshot {
    pub id: PriceSnapshotId,
    /// Provider name, e.g. `"FRED"`.
    pub provider: String,
    /// Label of the currency the price is quoted in.
    pub base: String,
    /// Currency units one hour is worth.
    pub unit_price: Decimal,
    pub taken_at: DateTime<Utc>,
}

impl HourPriceSnapshot {
    pub fn new(provider: impl Into<String>, base: impl Into<String>, unit_price: Decimal) -> Self {
        Self {
            id: PriceSnapshotId::new(),
            provider: provider.into(),
            base: base.into().to_uppercase(),
            unit_price,
            taken_at: Utc::now(),
        }
    }
}

/// Exchange rates relative to this snapshot's `base` currency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrencyPriceSnapshot {
    pub id: PriceSnapshotId,
    /// Provider name, e.g. `"FIXER"`.
    pub provider: String,
    /// Label of the currency the rates are relative to.
    pub base: String,
    /// Units of each labeled currency per one unit of `base`.
    pub rates: HashMap<String, Decimal>,
    pub taken_at: DateTime<Utc>,
}

impl CurrencyPriceSnapshot {
    pub fn new(
        provider: impl Into<String>,
        base: impl Into<String>,
        rates: HashMap<String, Decimal>,
    ) -> Self {
        let rates = rates
            .into_iter()
            .map(|(label, rate)| (label.to_uppercase(), rate))
            .collect();
        Self {
            id: PriceSnapshotId::new(),
            provider: provider.into(),
            base: base.into().to_uppercase(),
            rates,
            taken_at: Utc::now(),
        }
    }

    /// Rate of `label` relative to the base. The base itself always
    /// quotes at 1, whether or not the provider listed it.
    pub fn rate(&self, label: &str) -> Option<Decimal> {
        if label == self.base {
            return Some(Decimal::ONE);
        }
        self.rates.get(label).copied()
    }
}

/// Serves the most recent price snapshots for a named provider.
///
/// Injected into conversion so tests can pin rates; the in-ledger
/// [`PriceBook`] is the default implementation.
pub trait PriceFeed {
    fn latest_hour_price(&self, provider: &str) -> Option<&HourPriceSnapshot>;
    fn latest_currency_price(&self, provider: &str) -> Option<&CurrencyPriceSnapshot>;
}

/// Append-only log of recorded price snapshots.
///
/// "Latest" means most recently recorded, matching the original's
/// last-row-by-name lookup rather than a `taken_at` sort.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PriceBook {
    hour_prices: Vec<HourPriceSnapshot>,
    currency_prices: Vec<CurrencyPriceSnapshot>,
}

impl PriceBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hour_price(&mut self, snapshot: HourPriceSnapshot) -> PriceSnapshotId {
        let id = snapshot.id;
        self.hour_prices.push(snapshot);
        id
    }

    pub fn record_currency_price(&mut self, snapshot: CurrencyPriceSnapshot) -> PriceSnapshotId {
        let id = snapshot.id;
        self.currency_prices.push(snapshot);
        id
    }
}

impl PriceFeed for PriceBook {
    fn latest_hour_price(&self, provider: &str) -> Option<&HourPriceSnapshot> {
        self.hour_prices
            .iter()
            .rev()
            .find(|s| s.provider == provider)
    }

    fn latest_currency_price(&self, provider: &str) -> Option<&CurrencyPriceSnapshot> {
        self.currency_prices
            .iter()
            .rev()
            .find(|s| s.provider == provider)
    }
}
