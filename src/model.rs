//! Ledger entities.
//!
//! Settlements, certificates, snapshots, re-split events, and reserve
//! entries are append-only: once written they are never mutated in place,
//! with the single exception of a certificate's `broken` flag, which a
//! re-split pass may flip from `false` to `true`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{
    AgentId, CertificateId, CertificateRole, ClaimId, PriceSnapshotId, ReSplitId, ReserveEntryId,
    SettlementId, SnapshotId, TopicId,
};

/// A discussion topic that claims attach to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Topic {
    pub id: TopicId,
    pub owner: AgentId,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

/// A free-text comment declaring time value.
///
/// `claimed_hours` and `assumed_hours` are re-derived from `text` on every
/// accepted save; they are the only mutable quantities in the data model
/// besides the certificate `broken` flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claim {
    pub id: ClaimId,
    pub topic: TopicId,
    pub owner: AgentId,
    pub text: String,
    /// Hours the owner asserts are already completed.
    pub claimed_hours: Decimal,
    /// Hours the owner asserts will be needed in the future.
    pub assumed_hours: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Immutable copy of a claim at the moment of an accepted investment or
/// edit. Certificates reference snapshots so history survives later edits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimSnapshot {
    pub id: SnapshotId,
    pub claim: ClaimId,
    pub text: String,
    pub claimed_hours: Decimal,
    pub assumed_hours: Decimal,
    /// Full serialized claim record at snapshot time.
    pub data: serde_json::Value,
    pub taken_at: DateTime<Utc>,
}

/// One accepted investment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settlement {
    pub id: SettlementId,
    pub claim: ClaimId,
    pub snapshot: SnapshotId,
    pub hour_price: Option<PriceSnapshotId>,
    pub currency_price: Option<PriceSnapshotId>,

    /// Money the investor pays, in `payment_currency`.
    pub payment_amount: Decimal,
    pub payment_currency: String,
    /// The claim owner.
    pub payment_recipient: AgentId,
    /// The investor.
    pub payment_sender: AgentId,
    /// Currency units per hour at settlement time.
    pub hour_unit_cost: Decimal,

    /// Hours matched against claimed (completed) time.
    pub matched_hours: Decimal,
    /// Hours donated against assumed (future) time.
    pub donated_hours: Decimal,

    pub created_at: DateTime<Utc>,
}

impl Settlement {
    /// Total hours this settlement covered.
    pub fn settled_hours(&self) -> Decimal {
        self.matched_hours + self.donated_hours
    }
}

/// The atomic ledger entry: proof of co-creation between one doer and one
/// investor. Created strictly in doer/investor pairs with equal hours.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Certificate {
    pub id: CertificateId,
    pub role: CertificateRole,
    pub settlement: SettlementId,
    /// Set when this certificate was produced by a re-split pass.
    pub resplit: Option<ReSplitId>,
    pub snapshot: SnapshotId,
    /// Always non-negative.
    pub hours: Decimal,
    /// Whether the hours are settled against completed (claimed) time.
    pub matched: bool,
    /// A broken certificate has been replaced by children and no longer
    /// counts toward any balance.
    pub broken: bool,
    pub received_by: AgentId,
    /// The certificate this one replaced, if any.
    pub parent: Option<CertificateId>,
    pub created_at: DateTime<Utc>,
}

/// Records one edit-triggered re-split over a claim's certificates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReSplitEvent {
    pub id: ReSplitId,
    pub claim: ClaimId,
    pub snapshot: SnapshotId,
    /// Newly claimed hours the pass had to match.
    pub claimed_hours_to_match: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Signed entry in an investor's reserve ledger.
///
/// Purchases are positive and reference the external payment that bought
/// them; expenditures are negative and reference the settlement that drew
/// the reserve down.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReserveEntry {
    pub id: ReserveEntryId,
    pub agent: AgentId,
    /// Positive for purchases, negative for expenditures.
    pub hours: Decimal,
    /// Opaque external payment reference, set on purchases.
    pub payment_ref: Option<String>,
    /// Settlement that spent the reserve, set on expenditures.
    pub settlement: Option<SettlementId>,
    /// Price snapshots the purchase was made at, if any.
    pub hour_price: Option<PriceSnapshotId>,
    pub currency_price: Option<PriceSnapshotId>,
    /// Money paid for the purchase, in `currency`.
    pub currency: Option<String>,
    pub amount: Option<Decimal>,
    pub created_at: DateTime<Utc>,
}

impl ReserveEntry {
    pub fn is_purchase(&self) -> bool {
        self.payment_ref.is_some()
    }

    pub fn is_expenditure(&self) -> bool {
        self.settlement.is_some()
    }
}
