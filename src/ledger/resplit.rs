//! Edit-triggered certificate re-splitting.
//!
//! When a claim's text is saved, newly claimed hours convert previously
//! donated certificate pairs into matched ones. Consumed pairs are marked
//! broken and replaced by children whose hours sum to exactly the
//! original's, so hours are conserved across every pass.

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::error::{LedgerError, Result};
use crate::model::{Certificate, ReSplitEvent};
use crate::parse::parse_hours;
use crate::state::LedgerState;
use crate::types::{CertificateId, CertificateRole, ClaimId, ReSplitId};

use super::take_snapshot;

/// Outcome of saving new text on an existing claim.
#[derive(Debug, Clone)]
pub enum SaveOutcome {
    /// The edit was accepted; hour fields were re-derived and the
    /// re-split pass ran.
    Updated { resplit: ReSplitEvent },
    /// The edit violated monotonicity; claim and certificates untouched.
    Rejected(EditRejection),
}

/// Why an edit was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditRejection {
    /// New claimed + assumed would fall below hours already paid for.
    WouldShrinkBelowInvested {
        invested: Decimal,
        new_total: Decimal,
    },
    /// New claimed hours would fall below hours already matched.
    WouldUnsettleMatched {
        matched: Decimal,
        new_claimed: Decimal,
    },
}

/// Run the guard and re-split pass against staged state.
pub(super) fn execute(
    state: &mut LedgerState,
    claim_id: ClaimId,
    new_text: &str,
) -> Result<SaveOutcome> {
    let parsed = parse_hours(new_text);

    // Monotonicity guards: money already accepted can never be orphaned.
    let invested = state.invested(claim_id);
    if parsed.total() < invested {
        warn!(claim = %claim_id, invested = %invested, new_total = %parsed.total(), "Edit rejected: below invested");
        return Ok(SaveOutcome::Rejected(
            EditRejection::WouldShrinkBelowInvested {
                invested,
                new_total: parsed.total(),
            },
        ));
    }
    let matched = state.matched(claim_id, None);
    if parsed.claimed_hours < matched {
        warn!(claim = %claim_id, matched = %matched, new_claimed = %parsed.claimed_hours, "Edit rejected: below matched");
        return Ok(SaveOutcome::Rejected(EditRejection::WouldUnsettleMatched {
            matched,
            new_claimed: parsed.claimed_hours,
        }));
    }

    // Additional claimed hours to match against donated pairs.
    let mut delta = parsed.claimed_hours - matched;

    let mut updated = state.claim(claim_id)?.clone();
    updated.text = new_text.to_string();
    updated.claimed_hours = parsed.claimed_hours;
    updated.assumed_hours = parsed.assumed_hours;
    updated.updated_at = Utc::now();

    let snapshot = take_snapshot(state, &updated);
    let event = ReSplitEvent {
        id: ReSplitId::new(),
        claim: claim_id,
        snapshot,
        claimed_hours_to_match: delta,
        created_at: Utc::now(),
    };
    state.resplits.push(event.clone());

    // Walk non-broken donated certificates in creation order, two at a
    // time. Each step either converts a whole pair or splits one and
    // stops.
    let open: Vec<CertificateId> = state
        .certificates
        .iter()
        .filter(|cert| !cert.broken && !cert.matched)
        .filter(|cert| {
            state
                .settlement(cert.settlement)
                .map(|s| s.claim == claim_id)
                .unwrap_or(false)
        })
        .map(|cert| cert.id)
        .collect();

    for pair in open.chunks(2) {
        if delta.is_zero() {
            break;
        }
        let &[doer_id, investor_id] = pair else {
            return Err(pairing_corruption(claim_id, "dangling unpaired certificate"));
        };
        let doer = lookup(state, claim_id, doer_id)?.clone();
        let investor = lookup(state, claim_id, investor_id)?.clone();

        if doer.role != CertificateRole::Doer
            || investor.role != CertificateRole::Investor
            || doer.settlement != investor.settlement
            || doer.hours != investor.hours
        {
            return Err(pairing_corruption(claim_id, "pair is not symmetric"));
        }

        let pair_total = doer.hours + investor.hours;
        if delta >= pair_total {
            // Convert the whole pair to matched.
            replace_pair(state, event.id, &doer, &investor, doer.hours, Decimal::ZERO);
            delta -= pair_total;
        } else {
            // Split: matched children carry delta, donated children the
            // remainder, each side split evenly per role.
            let to_match = delta / Decimal::TWO;
            let to_donate = (pair_total - delta) / Decimal::TWO;
            replace_pair(state, event.id, &doer, &investor, to_match, to_donate);
            delta = Decimal::ZERO;
            break;
        }
    }

    debug!(
        claim = %claim_id,
        to_match = %event.claimed_hours_to_match,
        unconsumed = %delta,
        "Re-split pass complete"
    );

    *state.claim_mut(claim_id)? = updated;

    info!(claim = %claim_id, claimed = %parsed.claimed_hours, assumed = %parsed.assumed_hours, "Claim saved");
    Ok(SaveOutcome::Updated { resplit: event })
}

fn lookup(state: &LedgerState, claim: ClaimId, id: CertificateId) -> Result<&Certificate> {
    state
        .certificate(id)
        .ok_or_else(|| pairing_corruption(claim, "certificate vanished mid-pass"))
}

fn pairing_corruption(claim: ClaimId, detail: &str) -> LedgerError {
    LedgerError::PairingCorruption {
        claim: claim.to_string(),
        detail: detail.to_string(),
    }
}

/// Break an original pair and emit its children: a matched pair holding
/// `matched_hours` per role and, when `donated_hours` is non-zero, a
/// donated pair holding the rest. Children reference their parents; the
/// originals' hours are always conserved exactly.
fn replace_pair(
    state: &mut LedgerState,
    event: ReSplitId,
    doer: &Certificate,
    investor: &Certificate,
    matched_hours: Decimal,
    donated_hours: Decimal,
) {
    for (parent, matched, hours) in [
        (doer, true, matched_hours),
        (investor, true, matched_hours),
        (doer, false, donated_hours),
        (investor, false, donated_hours),
    ] {
        if !matched && hours.is_zero() {
            continue;
        }
        state.certificates.push(Certificate {
            id: CertificateId::new(),
            role: parent.role,
            settlement: parent.settlement,
            resplit: Some(event),
            snapshot: parent.snapshot,
            hours,
            matched,
            broken: false,
            received_by: parent.received_by.clone(),
            parent: Some(parent.id),
            created_at: Utc::now(),
        });
    }

    for id in [doer.id, investor.id] {
        if let Some(cert) = state.certificate_mut(id) {
            cert.broken = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Claim, Settlement};
    use crate::types::{AgentId, SettlementId, SnapshotId, TopicId};
    use rust_decimal_macros::dec;

    /// State holding one claim of `{?2}` and the given donated
    /// certificates, bypassing the invest path so the certificate log can
    /// be shaped arbitrarily.
    fn seeded(certs: &[(CertificateRole, Decimal)]) -> (LedgerState, ClaimId) {
        let mut state = LedgerState::default();
        let now = Utc::now();
        let claim_id = ClaimId::new();
        state.claims.push(Claim {
            id: claim_id,
            topic: TopicId::new(),
            owner: AgentId::from("doer"),
            text: "planning {?2}".to_string(),
            claimed_hours: Decimal::ZERO,
            assumed_hours: dec!(2),
            created_at: now,
            updated_at: now,
        });
        let settlement_id = SettlementId::new();
        let snapshot = SnapshotId::new();
        state.settlements.push(Settlement {
            id: settlement_id,
            claim: claim_id,
            snapshot,
            hour_price: None,
            currency_price: None,
            payment_amount: certs.iter().map(|&(_, hours)| hours).sum(),
            payment_currency: "HUR".to_string(),
            payment_recipient: AgentId::from("doer"),
            payment_sender: AgentId::from("investor"),
            hour_unit_cost: Decimal::ONE,
            matched_hours: Decimal::ZERO,
            donated_hours: certs.iter().map(|&(_, hours)| hours).sum(),
            created_at: now,
        });
        for &(role, hours) in certs {
            state.certificates.push(Certificate {
                id: CertificateId::new(),
                role,
                settlement: settlement_id,
                resplit: None,
                snapshot,
                hours,
                matched: false,
                broken: false,
                received_by: match role {
                    CertificateRole::Doer => AgentId::from("doer"),
                    CertificateRole::Investor => AgentId::from("investor"),
                },
                parent: None,
                created_at: now,
            });
        }
        (state, claim_id)
    }

    fn assert_untouched(state: &LedgerState, claim: ClaimId, cert_count: usize) {
        let record = state.claim(claim).unwrap();
        assert_eq!(record.text, "planning {?2}");
        assert_eq!(record.claimed_hours, Decimal::ZERO);
        assert_eq!(state.certificates.len(), cert_count);
        assert!(state.certificates.iter().all(|c| !c.broken));
    }

    #[test]
    fn test_dangling_unpaired_certificate_halts_the_pass() {
        let (mut state, claim) = seeded(&[(CertificateRole::Doer, dec!(1))]);

        let err = execute(&mut state, claim, "did {1}, {?1} left").unwrap_err();
        assert!(matches!(err, LedgerError::PairingCorruption { .. }));
        assert_untouched(&state, claim, 1);
    }

    #[test]
    fn test_asymmetric_pair_halts_the_pass() {
        // Investor before doer: the pair walk must refuse to consume it.
        let (mut state, claim) = seeded(&[
            (CertificateRole::Investor, dec!(0.5)),
            (CertificateRole::Doer, dec!(0.5)),
        ]);

        let err = execute(&mut state, claim, "did {1}, {?1} left").unwrap_err();
        assert!(matches!(err, LedgerError::PairingCorruption { .. }));
        assert_untouched(&state, claim, 2);
    }

    #[test]
    fn test_unequal_pair_hours_halt_the_pass() {
        let (mut state, claim) = seeded(&[
            (CertificateRole::Doer, dec!(0.6)),
            (CertificateRole::Investor, dec!(0.4)),
        ]);

        let err = execute(&mut state, claim, "did {1}, {?1} left").unwrap_err();
        assert!(matches!(err, LedgerError::PairingCorruption { .. }));
        assert_untouched(&state, claim, 2);
    }
}
