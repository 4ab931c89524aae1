//! Credit gate: how many hours an investor may still invest.
//!
//! Credit is a per-day free quota plus a purchased reserve. The gate only
//! reads; drawing the reserve down is the investment engine's job.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::config::LedgerConfig;
use crate::state::LedgerState;
use crate::types::AgentId;

/// An investor's credit standing at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Credit {
    /// Free daily allowance not yet used today. Never negative: hours
    /// covered by the reserve are accounted there, not against quota.
    pub quota_remaining_today: Decimal,
    /// Net purchased reserve balance.
    pub reserve_remaining: Decimal,
}

impl Credit {
    /// Total investable hours.
    pub fn total(&self) -> Decimal {
        self.quota_remaining_today + self.reserve_remaining
    }
}

/// Compute an investor's credit as of `today`.
pub fn credit_of(
    state: &LedgerState,
    config: &LedgerConfig,
    investor: &AgentId,
    today: NaiveDate,
) -> Credit {
    let used_today = state.invested_on(investor, today);
    let quota_remaining_today = (config.daily_quota - used_today).max(Decimal::ZERO);
    Credit {
        quota_remaining_today,
        reserve_remaining: state.reserve_remaining(investor),
    }
}
