//! The contribution ledger facade.
//!
//! `Ledger` owns the append-only state, the price book, and the currency
//! registry, and exposes the public contract: claim lifecycle, investment,
//! reserve purchases, and balance queries. Mutating operations run against
//! a staged copy of the state that is committed only on success, so a
//! failure partway through an investment or re-split pass leaves nothing
//! half-written. The `&mut self` receivers serialize writers; operations
//! on different ledgers proceed independently.

mod invest;
mod resplit;

pub use invest::InvestOutcome;
pub use resplit::{EditRejection, SaveOutcome};

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::config::{LedgerConfig, HOUR_SCALE};
use crate::credit::{credit_of, Credit};
use crate::currency::{CurrencyRegistry, Quote};
use crate::error::{LedgerError, Result};
use crate::model::{Claim, ClaimSnapshot, ReserveEntry, Topic};
use crate::parse::parse_hours;
use crate::price::{CurrencyPriceSnapshot, HourPriceSnapshot, PriceBook, PriceFeed};
use crate::state::LedgerState;
use crate::types::{
    AgentId, ClaimId, Clock, PriceSnapshotId, ReserveEntryId, SnapshotId, SystemClock, TopicId,
};

/// The contribution ledger engine.
pub struct Ledger {
    config: LedgerConfig,
    clock: Box<dyn Clock>,
    currencies: CurrencyRegistry,
    prices: PriceBook,
    state: LedgerState,
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new(LedgerConfig::default())
    }
}

impl Ledger {
    /// Create a ledger with the system clock.
    pub fn new(config: LedgerConfig) -> Self {
        Self::with_clock(config, Box::new(SystemClock))
    }

    /// Create a ledger with an injected clock (deterministic quota tests).
    pub fn with_clock(config: LedgerConfig, clock: Box<dyn Clock>) -> Self {
        let mut currencies = CurrencyRegistry::new();
        currencies.register(&config.native_hour_label);
        Self {
            config,
            clock,
            currencies,
            prices: PriceBook::new(),
            state: LedgerState::default(),
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Swap the clock out, e.g. to roll the quota window in tests.
    pub fn set_clock(&mut self, clock: Box<dyn Clock>) {
        self.clock = clock;
    }

    /// Read access to the underlying record logs.
    pub fn state(&self) -> &LedgerState {
        &self.state
    }

    // ------------------------------------------------------------------
    // Currencies & prices
    // ------------------------------------------------------------------

    pub fn register_currency(&mut self, label: &str) {
        self.currencies.register(label);
    }

    pub fn record_hour_price(&mut self, snapshot: HourPriceSnapshot) -> PriceSnapshotId {
        self.prices.record_hour_price(snapshot)
    }

    pub fn record_currency_price(&mut self, snapshot: CurrencyPriceSnapshot) -> PriceSnapshotId {
        self.prices.record_currency_price(snapshot)
    }

    /// Resolve how many hours one unit of `label` buys right now.
    pub fn quote(&self, label: &str) -> Result<Quote> {
        let normalized = self.currencies.resolve(label)?;
        Quote::resolve(&normalized, &self.prices, &self.config)
    }

    // ------------------------------------------------------------------
    // Topics & claims
    // ------------------------------------------------------------------

    pub fn create_topic(&mut self, owner: AgentId, title: impl Into<String>) -> TopicId {
        let topic = Topic {
            id: TopicId::new(),
            owner,
            title: title.into(),
            created_at: Utc::now(),
        };
        let id = topic.id;
        self.state.topics.push(topic);
        id
    }

    /// Create a claim, deriving its hour fields from the text. The first
    /// save never triggers a re-split pass; later saves go through
    /// [`Ledger::save_claim`].
    pub fn create_claim(
        &mut self,
        topic: TopicId,
        owner: AgentId,
        text: impl Into<String>,
    ) -> Result<ClaimId> {
        self.state.topic(topic)?;
        let text = text.into();
        let parsed = parse_hours(&text);
        let now = Utc::now();
        let claim = Claim {
            id: ClaimId::new(),
            topic,
            owner,
            text,
            claimed_hours: parsed.claimed_hours,
            assumed_hours: parsed.assumed_hours,
            created_at: now,
            updated_at: now,
        };
        let id = claim.id;
        debug!(claim = %id, claimed = %parsed.claimed_hours, assumed = %parsed.assumed_hours, "Claim created");
        self.state.claims.push(claim);
        Ok(id)
    }

    pub fn claim(&self, id: ClaimId) -> Result<&Claim> {
        self.state.claim(id)
    }

    /// Save new text on an existing claim: re-derive its hour fields and
    /// run the re-split pass over previously donated certificates.
    ///
    /// An edit that would shrink the claim below hours already invested,
    /// or un-settle hours already matched, is rejected with the claim left
    /// completely unchanged.
    pub fn save_claim(&mut self, claim: ClaimId, new_text: &str) -> Result<SaveOutcome> {
        self.state.claim(claim)?;
        let mut staged = self.state.clone();
        let outcome = resplit::execute(&mut staged, claim, new_text)?;
        if matches!(outcome, SaveOutcome::Updated { .. }) {
            self.state = staged;
        }
        Ok(outcome)
    }

    // ------------------------------------------------------------------
    // Investment
    // ------------------------------------------------------------------

    /// Invest `hour_amount` hours into a claim, paying in `currency_label`.
    ///
    /// Side effects (snapshot, settlement, certificates, reserve
    /// draw-down) are committed all-or-nothing.
    pub fn invest(
        &mut self,
        claim: ClaimId,
        hour_amount: Decimal,
        currency_label: &str,
        investor: AgentId,
    ) -> Result<InvestOutcome> {
        let today = self.clock.today();
        let mut staged = self.state.clone();
        let outcome = invest::execute(
            &mut staged,
            &self.config,
            &self.currencies,
            &self.prices,
            today,
            claim,
            hour_amount,
            currency_label,
            investor,
        )?;
        if matches!(outcome, InvestOutcome::Invested(_)) {
            self.state = staged;
        }
        Ok(outcome)
    }

    // ------------------------------------------------------------------
    // Reserve
    // ------------------------------------------------------------------

    /// Record a reserve purchase: `hours` of pre-paid credit bought
    /// through an external payment.
    pub fn purchase_reserve(&mut self, purchase: ReservePurchase) -> Result<ReserveEntryId> {
        if purchase.hours <= Decimal::ZERO {
            return Err(LedgerError::InvalidInput(format!(
                "reserve purchase must be positive, got {}",
                purchase.hours
            )));
        }
        let entry = ReserveEntry {
            id: ReserveEntryId::new(),
            agent: purchase.investor.clone(),
            hours: purchase.hours.round_dp(HOUR_SCALE),
            payment_ref: Some(purchase.payment_ref),
            settlement: None,
            hour_price: self
                .prices
                .latest_hour_price(&self.config.hour_price_provider)
                .map(|s| s.id),
            currency_price: self
                .prices
                .latest_currency_price(&self.config.currency_price_provider)
                .map(|s| s.id),
            currency: purchase.currency,
            amount: purchase.amount,
            created_at: Utc::now(),
        };
        let id = entry.id;
        info!(investor = %purchase.investor, hours = %entry.hours, "Reserve purchased");
        self.state.reserve.push(entry);
        Ok(id)
    }

    // ------------------------------------------------------------------
    // Balance queries
    // ------------------------------------------------------------------

    pub fn matched(&self, claim: ClaimId, by: Option<&AgentId>) -> Decimal {
        self.state.matched(claim, by)
    }

    pub fn donated(&self, claim: ClaimId, by: Option<&AgentId>) -> Decimal {
        self.state.donated(claim, by)
    }

    pub fn invested(&self, claim: ClaimId) -> Decimal {
        self.state.invested(claim)
    }

    pub fn remains(&self, claim: ClaimId) -> Result<Decimal> {
        self.state.remains(claim)
    }

    pub fn user_matched(&self, agent: &AgentId) -> Decimal {
        self.state.user_matched(agent)
    }

    pub fn user_unmatched(&self, agent: &AgentId) -> Decimal {
        self.state.user_unmatched(agent)
    }

    pub fn user_claimed(&self, agent: &AgentId) -> Decimal {
        self.state.user_claimed(agent)
    }

    pub fn declared(&self, topic: TopicId) -> Decimal {
        self.state.declared(topic)
    }

    pub fn credit(&self, investor: &AgentId) -> Credit {
        credit_of(&self.state, &self.config, investor, self.clock.today())
    }

    pub fn quota_remaining_today(&self, investor: &AgentId) -> Decimal {
        self.credit(investor).quota_remaining_today
    }

    pub fn reserve_remaining(&self, investor: &AgentId) -> Decimal {
        self.state.reserve_remaining(investor)
    }
}

/// Parameters of a reserve purchase.
#[derive(Debug, Clone)]
pub struct ReservePurchase {
    pub investor: AgentId,
    pub hours: Decimal,
    /// Opaque reference to the external payment that bought the hours.
    pub payment_ref: String,
    pub currency: Option<String>,
    pub amount: Option<Decimal>,
}

impl ReservePurchase {
    pub fn new(investor: AgentId, hours: Decimal, payment_ref: impl Into<String>) -> Self {
        Self {
            investor,
            hours,
            payment_ref: payment_ref.into(),
            currency: None,
            amount: None,
        }
    }

    /// Attach the money side of the purchase.
    pub fn paid_with(mut self, currency: impl Into<String>, amount: Decimal) -> Self {
        self.currency = Some(currency.into().to_uppercase());
        self.amount = Some(amount);
        self
    }
}

/// Append an immutable snapshot of a claim's current content.
pub(crate) fn take_snapshot(state: &mut LedgerState, claim: &Claim) -> SnapshotId {
    let snapshot = ClaimSnapshot {
        id: SnapshotId::new(),
        claim: claim.id,
        text: claim.text.clone(),
        claimed_hours: claim.claimed_hours,
        assumed_hours: claim.assumed_hours,
        data: serde_json::to_value(claim).unwrap_or(serde_json::Value::Null),
        taken_at: Utc::now(),
    };
    let id = snapshot.id;
    state.snapshots.push(snapshot);
    id
}
