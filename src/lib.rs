//! hour-ledger - a contribution ledger engine.
//!
//! People declare time value inside free-text claims (`{1.5}` claimed,
//! `{?6.5}` assumed hours) and other parties invest money against those
//! claims, converted to hours through external price snapshots. Every
//! accepted investment settles into doer/investor certificate pairs;
//! later edits of a claim re-split previously donated pairs without ever
//! creating or destroying hours.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                        Ledger                            │
//! │                                                          │
//! │  parse ──► claim hours          quote ──► hours/unit     │
//! │                 │                  │                     │
//! │                 ▼                  ▼                     │
//! │  credit gate ──► invest ──► settlement + cert pairs      │
//! │  (quota+reserve)    │                                    │
//! │                     ▼                                    │
//! │  save_claim ──► re-split pass over donated pairs         │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! All mutating operations commit all-or-nothing against the append-only
//! [`state::LedgerState`]; balances are explicit folds over the
//! certificate log.

pub mod config;
pub mod credit;
pub mod currency;
pub mod error;
pub mod ledger;
pub mod model;
pub mod parse;
pub mod price;
pub mod state;
pub mod types;

pub use config::LedgerConfig;
pub use credit::Credit;
pub use currency::{CurrencyRegistry, Quote};
pub use error::{LedgerError, Result};
pub use ledger::{EditRejection, InvestOutcome, Ledger, ReservePurchase, SaveOutcome};
pub use model::{Certificate, Claim, ClaimSnapshot, ReSplitEvent, ReserveEntry, Settlement, Topic};
pub use parse::{parse_hours, ParsedHours};
pub use price::{CurrencyPriceSnapshot, HourPriceSnapshot, PriceBook, PriceFeed};
pub use types::{
    AgentId, CertificateRole, ClaimId, Clock, FixedClock, SettlementId, SystemClock, TopicId,
};
