//! Append-only ledger state and its running-total functions.
//!
//! All balances (`matched`, `donated`, `invested`, ...) are explicit folds
//! over the certificate log rather than ad-hoc queries, so the same
//! functions serve invariant checks and external balance queries. Logs
//! preserve creation order; the re-split pass depends on it.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, Result};
use crate::model::{
    Certificate, Claim, ClaimSnapshot, ReSplitEvent, ReserveEntry, Settlement, Topic,
};
use crate::types::{AgentId, CertificateId, ClaimId, SettlementId, TopicId};

/// Every record the ledger has ever accepted, in creation order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LedgerState {
    pub(crate) topics: Vec<Topic>,
    pub(crate) claims: Vec<Claim>,
    pub(crate) snapshots: Vec<ClaimSnapshot>,
    pub(crate) settlements: Vec<Settlement>,
    pub(crate) certificates: Vec<Certificate>,
    pub(crate) resplits: Vec<ReSplitEvent>,
    pub(crate) reserve: Vec<ReserveEntry>,
}

impl LedgerState {
    // ------------------------------------------------------------------
    // Record access
    // ------------------------------------------------------------------

    pub fn topic(&self, id: TopicId) -> Result<&Topic> {
        self.topics
            .iter()
            .find(|t| t.id == id)
            .ok_or_else(|| LedgerError::TopicNotFound(id.to_string()))
    }

    pub fn claim(&self, id: ClaimId) -> Result<&Claim> {
        self.claims
            .iter()
            .find(|c| c.id == id)
            .ok_or_else(|| LedgerError::ClaimNotFound(id.to_string()))
    }

    pub(crate) fn claim_mut(&mut self, id: ClaimId) -> Result<&mut Claim> {
        self.claims
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| LedgerError::ClaimNotFound(id.to_string()))
    }

    pub fn settlement(&self, id: SettlementId) -> Option<&Settlement> {
        self.settlements.iter().find(|s| s.id == id)
    }

    pub fn certificate(&self, id: CertificateId) -> Option<&Certificate> {
        self.certificates.iter().find(|c| c.id == id)
    }

    pub(crate) fn certificate_mut(&mut self, id: CertificateId) -> Option<&mut Certificate> {
        self.certificates.iter_mut().find(|c| c.id == id)
    }

    /// The claim a certificate belongs to, through its settlement.
    fn certificate_claim(&self, cert: &Certificate) -> Option<ClaimId> {
        self.settlement(cert.settlement).map(|s| s.claim)
    }

    /// Certificates of one claim, in creation order.
    pub fn certificates_for_claim(&self, claim: ClaimId) -> impl Iterator<Item = &Certificate> {
        self.certificates
            .iter()
            .filter(move |cert| self.certificate_claim(cert) == Some(claim))
    }

    /// Settlements of one claim, in creation order.
    pub fn settlements_for_claim(&self, claim: ClaimId) -> impl Iterator<Item = &Settlement> {
        self.settlements.iter().filter(move |s| s.claim == claim)
    }

    // ------------------------------------------------------------------
    // Claim balances
    // ------------------------------------------------------------------

    /// Hours matched: settled against completed time.
    pub fn matched(&self, claim: ClaimId, by: Option<&AgentId>) -> Decimal {
        self.sum_certificates(claim, Some(true), by)
    }

    /// Hours donated: settled against future time.
    pub fn donated(&self, claim: ClaimId, by: Option<&AgentId>) -> Decimal {
        self.sum_certificates(claim, Some(false), by)
    }

    /// Hours invested: matched plus donated.
    pub fn invested(&self, claim: ClaimId) -> Decimal {
        self.sum_certificates(claim, None, None)
    }

    /// Hours in the claim not yet covered by investment.
    pub fn remains(&self, claim: ClaimId) -> Result<Decimal> {
        let claim = self.claim(claim)?;
        Ok(claim.claimed_hours + claim.assumed_hours - self.invested(claim.id))
    }

    /// Count of all certificates ever issued for a claim, broken included.
    pub fn contribution_count(&self, claim: ClaimId) -> usize {
        self.certificates_for_claim(claim).count()
    }

    fn sum_certificates(
        &self,
        claim: ClaimId,
        matched: Option<bool>,
        by: Option<&AgentId>,
    ) -> Decimal {
        self.certificates_for_claim(claim)
            .filter(|cert| !cert.broken)
            .filter(|cert| matched.map_or(true, |m| cert.matched == m))
            .filter(|cert| by.map_or(true, |agent| &cert.received_by == agent))
            .map(|cert| cert.hours)
            .sum()
    }

    // ------------------------------------------------------------------
    // Agent balances
    // ------------------------------------------------------------------

    /// Matched hours an agent has accumulated across all claims.
    pub fn user_matched(&self, agent: &AgentId) -> Decimal {
        self.sum_user_certificates(agent, true)
    }

    /// Unmatched (donated) hours an agent has accumulated across all claims.
    pub fn user_unmatched(&self, agent: &AgentId) -> Decimal {
        self.sum_user_certificates(agent, false)
    }

    fn sum_user_certificates(&self, agent: &AgentId, matched: bool) -> Decimal {
        self.certificates
            .iter()
            .filter(|cert| !cert.broken && cert.matched == matched)
            .filter(|cert| &cert.received_by == agent)
            .map(|cert| cert.hours)
            .sum()
    }

    /// Claimed hours an agent has declared across their claims.
    pub fn user_claimed(&self, agent: &AgentId) -> Decimal {
        self.claims
            .iter()
            .filter(|claim| &claim.owner == agent)
            .map(|claim| claim.claimed_hours)
            .sum()
    }

    /// Hours an agent settled (matched plus donated) on a given day.
    pub fn invested_on(&self, agent: &AgentId, date: NaiveDate) -> Decimal {
        self.settlements
            .iter()
            .filter(|s| &s.payment_sender == agent)
            .filter(|s| s.created_at.date_naive() == date)
            .map(|s| s.settled_hours())
            .sum()
    }

    // ------------------------------------------------------------------
    // Topic balances
    // ------------------------------------------------------------------

    /// Hours claimed and assumed across a topic's claims.
    pub fn declared(&self, topic: TopicId) -> Decimal {
        self.claims
            .iter()
            .filter(|claim| claim.topic == topic)
            .map(|claim| claim.claimed_hours + claim.assumed_hours)
            .sum()
    }

    // ------------------------------------------------------------------
    // Reserve balances
    // ------------------------------------------------------------------

    /// Reserve hours an agent has purchased.
    pub fn reserve_purchased(&self, agent: &AgentId) -> Decimal {
        self.reserve
            .iter()
            .filter(|entry| &entry.agent == agent && entry.is_purchase())
            .map(|entry| entry.hours)
            .sum()
    }

    /// Reserve hours an agent has expended (a non-positive number).
    pub fn reserve_expended(&self, agent: &AgentId) -> Decimal {
        self.reserve
            .iter()
            .filter(|entry| &entry.agent == agent && entry.is_expenditure())
            .map(|entry| entry.hours)
            .sum()
    }

    /// Net reserve balance: purchases plus (negative) expenditures.
    pub fn reserve_remaining(&self, agent: &AgentId) -> Decimal {
        self.reserve
            .iter()
            .filter(|entry| &entry.agent == agent)
            .map(|entry| entry.hours)
            .sum()
    }
}
