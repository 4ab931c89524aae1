//! Error types for hour-ledger

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Unknown currency: {0}")]
    UnknownCurrency(String),

    #[error("Stale price data: no {kind} snapshot for provider {provider}")]
    StalePriceData { kind: &'static str, provider: String },

    #[error("Claim not found: {0}")]
    ClaimNotFound(String),

    #[error("Topic not found: {0}")]
    TopicNotFound(String),

    #[error("Certificate pairing corruption on claim {claim}: {detail}")]
    PairingCorruption { claim: String, detail: String },

    #[error("Arithmetic overflow while computing {0}")]
    Arithmetic(&'static str),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, LedgerError>;
