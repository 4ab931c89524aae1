//! The investment engine: one accepted investment end to end.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::config::{LedgerConfig, HOUR_SCALE};
use crate::credit::credit_of;
use crate::currency::{CurrencyRegistry, Quote};
use crate::error::{LedgerError, Result};
use crate::model::{Certificate, Settlement};
use crate::price::PriceFeed;
use crate::state::LedgerState;
use crate::types::{
    AgentId, CertificateId, CertificateRole, ClaimId, ReserveEntryId, SettlementId,
};

use super::take_snapshot;

/// Outcome of an investment attempt.
///
/// The non-settling cases are decisions, not faults: callers surface them
/// as user-facing rejections while currency and price failures propagate
/// as [`LedgerError`].
#[derive(Debug, Clone)]
pub enum InvestOutcome {
    /// The investment settled.
    Invested(Settlement),
    /// The claim has no remaining hours to cover.
    NothingToInvest,
    /// The amount exceeds the investor's quota plus reserve.
    InsufficientCredit { requested: Decimal, credit: Decimal },
}

impl InvestOutcome {
    /// The settlement, if the investment went through.
    pub fn settlement(&self) -> Option<&Settlement> {
        match self {
            Self::Invested(settlement) => Some(settlement),
            _ => None,
        }
    }
}

/// Run one investment against staged state.
#[allow(clippy::too_many_arguments)]
pub(super) fn execute(
    state: &mut LedgerState,
    config: &LedgerConfig,
    currencies: &CurrencyRegistry,
    prices: &dyn PriceFeed,
    today: NaiveDate,
    claim_id: ClaimId,
    hour_amount: Decimal,
    currency_label: &str,
    investor: AgentId,
) -> Result<InvestOutcome> {
    if hour_amount < Decimal::ZERO {
        return Err(LedgerError::InvalidInput(format!(
            "cannot invest a negative amount: {hour_amount}"
        )));
    }

    let claim = state.claim(claim_id)?.clone();

    // Cap at what the claim still has open.
    let amount = hour_amount.round_dp(HOUR_SCALE).min(state.remains(claim_id)?);
    if amount.is_zero() {
        debug!(claim = %claim_id, "Nothing left to invest");
        return Ok(InvestOutcome::NothingToInvest);
    }

    // Gate on quota plus reserve, both read before any mutation.
    let credit = credit_of(state, config, &investor, today);
    if amount > credit.total() {
        debug!(
            investor = %investor,
            requested = %amount,
            credit = %credit.total(),
            "Investment exceeds credit"
        );
        return Ok(InvestOutcome::InsufficientCredit {
            requested: amount,
            credit: credit.total(),
        });
    }

    let label = currencies.resolve(currency_label)?;
    let quote = Quote::resolve(&label, prices, config)?;
    let hour_unit_cost = quote.unit_cost()?;
    let payment_amount = amount
        .checked_div(quote.hours_per_unit)
        .ok_or(LedgerError::Arithmetic("payment amount"))?;

    let snapshot = take_snapshot(state, &claim);

    // Split the settled amount: matched covers still-open claimed time,
    // the rest donates against still-open assumed time.
    let matched_delta = (claim.claimed_hours - state.matched(claim_id, None))
        .max(Decimal::ZERO)
        .min(amount);
    let donated_delta = (claim.assumed_hours - state.donated(claim_id, None))
        .max(Decimal::ZERO)
        .min(amount - matched_delta);

    let settlement = Settlement {
        id: SettlementId::new(),
        claim: claim_id,
        snapshot,
        hour_price: quote.hour_price,
        currency_price: quote.currency_price,
        payment_amount,
        payment_currency: label,
        payment_recipient: claim.owner.clone(),
        payment_sender: investor.clone(),
        hour_unit_cost,
        matched_hours: matched_delta,
        donated_hours: donated_delta,
        created_at: Utc::now(),
    };
    let settlement_id = settlement.id;
    state.settlements.push(settlement.clone());

    // One doer/investor pair per portion, each side holding half.
    if matched_delta > Decimal::ZERO {
        emit_pair(state, &settlement, matched_delta, true);
    }
    if donated_delta > Decimal::ZERO {
        emit_pair(state, &settlement, donated_delta, false);
    }

    // Whatever the quota could not cover comes out of the reserve.
    let overdraft = amount - credit.quota_remaining_today;
    if overdraft > Decimal::ZERO {
        state.reserve.push(crate::model::ReserveEntry {
            id: ReserveEntryId::new(),
            agent: investor.clone(),
            hours: -overdraft,
            payment_ref: None,
            settlement: Some(settlement_id),
            hour_price: None,
            currency_price: None,
            currency: None,
            amount: None,
            created_at: Utc::now(),
        });
        debug!(investor = %investor, hours = %overdraft, "Reserve drawn down");
    }

    info!(
        claim = %claim_id,
        investor = %investor,
        hours = %amount,
        matched = %matched_delta,
        donated = %donated_delta,
        currency = %settlement.payment_currency,
        "Investment settled"
    );

    Ok(InvestOutcome::Invested(settlement))
}

/// Emit a doer/investor certificate pair for one settled portion, the two
/// co-creators splitting it evenly. Pair order (doer first) is what the
/// re-split pass walks.
fn emit_pair(state: &mut LedgerState, settlement: &Settlement, portion: Decimal, matched: bool) {
    let half = portion / Decimal::TWO;
    for (role, received_by) in [
        (CertificateRole::Doer, settlement.payment_recipient.clone()),
        (CertificateRole::Investor, settlement.payment_sender.clone()),
    ] {
        state.certificates.push(Certificate {
            id: CertificateId::new(),
            role,
            settlement: settlement.id,
            resplit: None,
            snapshot: settlement.snapshot,
            hours: half,
            matched,
            broken: false,
            received_by,
            parent: None,
            created_at: Utc::now(),
        });
    }
}
