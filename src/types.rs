//! Core identifier and role types.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(Uuid);

        impl $name {
            /// Generate a fresh id.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

record_id!(
    /// Identifies a topic.
    TopicId
);
record_id!(
    /// Identifies a claim.
    ClaimId
);
record_id!(
    /// Identifies an immutable claim snapshot.
    SnapshotId
);
record_id!(
    /// Identifies a settlement.
    SettlementId
);
record_id!(
    /// Identifies a contribution certificate.
    CertificateId
);
record_id!(
    /// Identifies an edit-triggered re-split event.
    ReSplitId
);
record_id!(
    /// Identifies a reserve ledger entry.
    ReserveEntryId
);
record_id!(
    /// Identifies a price snapshot.
    PriceSnapshotId
);

/// Opaque, equality-comparable reference to a person or agent.
///
/// The ledger never interprets the contents; callers bring their own
/// identity scheme (user ids, DIDs, public keys).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgentId(String);

impl AgentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AgentId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// The two parties of a certificate pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CertificateRole {
    /// The claim owner whose work is being paid for.
    Doer,
    /// The payer.
    Investor,
}

/// Source of "today" for the credit gate's daily quota window.
///
/// Injected so quota arithmetic is deterministic under test.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Clock backed by the system time (UTC).
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }
}

/// Clock pinned to a fixed date.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}
