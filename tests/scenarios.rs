//! End-to-end scenarios over the contribution ledger: investments,
//! reserve flows, edit-triggered re-splits, and the conservation
//! properties that must survive all of them.

use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use hour_ledger::{
    AgentId, CertificateRole, ClaimId, CurrencyPriceSnapshot, EditRejection, FixedClock,
    HourPriceSnapshot, InvestOutcome, Ledger, LedgerConfig, LedgerError, ReservePurchase,
    SaveOutcome, TopicId,
};

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
}

/// Ledger with EUR/USD registered and the reference price snapshots:
/// one hour is 26.25 USD, one EUR is 1.1729 USD.
fn ledger() -> Ledger {
    let mut ledger = Ledger::with_clock(LedgerConfig::default(), Box::new(FixedClock(day())));
    ledger.register_currency("eur");
    ledger.register_currency("usd");
    ledger.record_hour_price(HourPriceSnapshot::new("FRED", "USD", dec!(26.25)));
    ledger.record_currency_price(CurrencyPriceSnapshot::new(
        "FIXER",
        "EUR",
        HashMap::from([
            ("USD".to_string(), dec!(1.1729)),
            ("GBP".to_string(), dec!(0.89568)),
        ]),
    ));
    ledger
}

fn claim_with(ledger: &mut Ledger, text: &str) -> (TopicId, ClaimId) {
    let thinker = AgentId::from("thinker");
    let doer = AgentId::from("doer");
    let topic = ledger.create_topic(thinker, "Improve test module");
    let claim = ledger.create_claim(topic, doer, text).unwrap();
    (topic, claim)
}

fn assert_conserved(ledger: &Ledger, claim: ClaimId) {
    let claim_record = ledger.claim(claim).unwrap().clone();
    let invested = ledger.invested(claim);
    assert_eq!(invested, ledger.matched(claim, None) + ledger.donated(claim, None));
    assert!(invested <= claim_record.claimed_hours + claim_record.assumed_hours);
}

fn assert_pair_symmetry(ledger: &Ledger, claim: ClaimId) {
    let sum_role = |role: CertificateRole| -> Decimal {
        ledger
            .state()
            .certificates_for_claim(claim)
            .filter(|c| !c.broken && c.role == role)
            .map(|c| c.hours)
            .sum()
    };
    assert_eq!(sum_role(CertificateRole::Doer), sum_role(CertificateRole::Investor));
}

#[test]
fn scenario_a_single_investment() {
    let mut ledger = ledger();
    let (_, claim) = claim_with(&mut ledger, "built the parser {1.5}, remaining work {?6.5}");
    let investor = AgentId::from("investor");

    let outcome = ledger.invest(claim, dec!(0.2), "eur", investor.clone()).unwrap();
    let settlement = outcome.settlement().expect("investment settles").clone();

    assert_eq!(settlement.matched_hours, dec!(0.2));
    assert_eq!(settlement.donated_hours, Decimal::ZERO);
    assert!((settlement.hour_unit_cost - dec!(22.380424588626481589690499)).abs() < dec!(0.000001));
    // 0.2 hours at 22.38.. EUR per hour.
    assert!((settlement.payment_amount - dec!(4.476085)).abs() < dec!(0.000001));

    let certs: Vec<_> = ledger.state().certificates_for_claim(claim).collect();
    assert_eq!(certs.len(), 2);
    for cert in &certs {
        assert_eq!(cert.hours, dec!(0.1));
        assert!(cert.matched);
        assert!(!cert.broken);
    }
    assert_eq!(certs[0].role, CertificateRole::Doer);
    assert_eq!(certs[1].role, CertificateRole::Investor);

    assert_eq!(ledger.remains(claim).unwrap(), dec!(1.5) + dec!(6.5) - dec!(0.2));
    assert_eq!(ledger.user_matched(&investor), dec!(0.1));
    assert_conserved(&ledger, claim);
    assert_pair_symmetry(&ledger, claim);
}

#[test]
fn scenario_b_two_investors() {
    let mut ledger = ledger();
    let (_, claim) = claim_with(&mut ledger, "{1.5} done, {?6.5} to go");

    ledger
        .invest(claim, dec!(0.2), "eur", AgentId::from("investor1"))
        .unwrap();
    ledger
        .invest(claim, dec!(0.5), "eur", AgentId::from("investor2"))
        .unwrap();

    assert_eq!(ledger.invested(claim), dec!(0.7));
    assert_eq!(ledger.matched(claim, None), dec!(0.7));

    let certs: Vec<_> = ledger.state().certificates_for_claim(claim).collect();
    assert_eq!(certs.len(), 4);
    assert!(certs.iter().all(|c| !c.broken));
    assert_conserved(&ledger, claim);
    assert_pair_symmetry(&ledger, claim);
}

#[test]
fn scenario_c_future_investment_then_edit() {
    let mut ledger = ledger();
    let (_, claim) = claim_with(&mut ledger, "will need {?8.0} for the integration");
    let investor = AgentId::from("investor");
    let doer = AgentId::from("doer");

    ledger.invest(claim, dec!(1.0), "eur", investor.clone()).unwrap();
    assert_eq!(ledger.donated(claim, None), dec!(1.0));
    assert_eq!(ledger.matched(claim, None), Decimal::ZERO);
    let certs: Vec<_> = ledger.state().certificates_for_claim(claim).collect();
    assert_eq!(certs.len(), 2);
    assert!(certs.iter().all(|c| !c.matched));

    // The doer completes part of the work and edits the claim.
    let outcome = ledger
        .save_claim(claim, "did {0.4} of it, {?7.6} still to go")
        .unwrap();
    let SaveOutcome::Updated { resplit } = outcome else {
        panic!("edit should be accepted");
    };
    assert_eq!(resplit.claimed_hours_to_match, dec!(0.4));

    let broken: Vec<_> = ledger
        .state()
        .certificates_for_claim(claim)
        .filter(|c| c.broken)
        .collect();
    assert_eq!(broken.len(), 2);

    let children: Vec<_> = ledger
        .state()
        .certificates_for_claim(claim)
        .filter(|c| c.parent.is_some())
        .collect();
    assert_eq!(children.len(), 4);
    assert!(children.iter().all(|c| c.resplit == Some(resplit.id)));

    assert_eq!(ledger.matched(claim, None), dec!(0.4));
    assert_eq!(ledger.donated(claim, None), dec!(0.6));
    assert_eq!(ledger.user_matched(&investor), dec!(0.2));
    assert_eq!(ledger.user_unmatched(&investor), dec!(0.3));
    assert_eq!(ledger.user_matched(&doer), dec!(0.2));
    assert_conserved(&ledger, claim);
    assert_pair_symmetry(&ledger, claim);
}

#[test]
fn scenario_d_redeclaration_below_invested_rejected() {
    let mut ledger = ledger();
    let (_, claim) = claim_with(&mut ledger, "{1.5} finished");

    ledger
        .invest(claim, dec!(0.1), "eur", AgentId::from("investor"))
        .unwrap();
    assert_eq!(ledger.matched(claim, None), dec!(0.1));

    let before = ledger.claim(claim).unwrap().clone();
    let cert_count_before = ledger.state().contribution_count(claim);

    let outcome = ledger.save_claim(claim, "actually none of this is done").unwrap();
    let SaveOutcome::Rejected(rejection) = outcome else {
        panic!("edit must be rejected");
    };
    assert_eq!(
        rejection,
        EditRejection::WouldShrinkBelowInvested {
            invested: dec!(0.1),
            new_total: Decimal::ZERO,
        }
    );

    let after = ledger.claim(claim).unwrap();
    assert_eq!(after.text, before.text);
    assert_eq!(after.claimed_hours, before.claimed_hours);
    assert_eq!(after.assumed_hours, before.assumed_hours);
    assert_eq!(ledger.state().contribution_count(claim), cert_count_before);
}

#[test]
fn edit_that_would_unsettle_matched_is_rejected() {
    let mut ledger = ledger();
    let (_, claim) = claim_with(&mut ledger, "{1.5} done, {?1.0} left");

    ledger
        .invest(claim, dec!(1.0), "eur", AgentId::from("investor"))
        .unwrap();
    assert_eq!(ledger.matched(claim, None), dec!(1.0));

    // Total stays above invested but claimed falls below matched.
    let outcome = ledger.save_claim(claim, "{0.5} done, {?2.0} left").unwrap();
    assert!(matches!(
        outcome,
        SaveOutcome::Rejected(EditRejection::WouldUnsettleMatched { .. })
    ));
    assert_eq!(ledger.claim(claim).unwrap().claimed_hours, dec!(1.5));
}

#[test]
fn resplit_converts_whole_pairs_across_settlements() {
    let mut ledger = ledger();
    let (_, claim) = claim_with(&mut ledger, "planning {?8}");

    ledger
        .invest(claim, dec!(0.5), "eur", AgentId::from("investor1"))
        .unwrap();
    ledger
        .invest(claim, dec!(0.5), "eur", AgentId::from("investor2"))
        .unwrap();
    assert_eq!(ledger.donated(claim, None), dec!(1.0));

    let outcome = ledger.save_claim(claim, "done {1.0}, rest {?7}").unwrap();
    assert!(matches!(outcome, SaveOutcome::Updated { .. }));

    assert_eq!(ledger.matched(claim, None), dec!(1.0));
    assert_eq!(ledger.donated(claim, None), Decimal::ZERO);

    let broken = ledger
        .state()
        .certificates_for_claim(claim)
        .filter(|c| c.broken)
        .count();
    let live = ledger
        .state()
        .certificates_for_claim(claim)
        .filter(|c| !c.broken)
        .count();
    assert_eq!(broken, 4);
    assert_eq!(live, 4);
    assert_conserved(&ledger, claim);
    assert_pair_symmetry(&ledger, claim);
}

#[test]
fn reserve_covers_investment_beyond_quota() {
    let mut ledger = ledger();
    let (_, claim) = claim_with(&mut ledger, "- {10.5},{?0.5} for coming up with basic class structure");
    let investor = AgentId::from("investor");

    assert_eq!(ledger.reserve_remaining(&investor), Decimal::ZERO);
    ledger
        .purchase_reserve(
            ReservePurchase::new(investor.clone(), dec!(5), "payment-001")
                .paid_with("eur", dec!(111.90)),
        )
        .unwrap();
    assert_eq!(ledger.reserve_remaining(&investor), dec!(5));
    assert_eq!(ledger.quota_remaining_today(&investor), dec!(4));

    // Uses up the daily quota first, then one hour of reserve.
    let outcome = ledger.invest(claim, dec!(5), "eur", investor.clone()).unwrap();
    assert!(outcome.settlement().is_some());

    assert_eq!(ledger.reserve_remaining(&investor), dec!(4));
    assert_eq!(ledger.quota_remaining_today(&investor), Decimal::ZERO);

    let credit = ledger.credit(&investor);
    assert!(credit.total() >= Decimal::ZERO);
    assert_eq!(credit.total(), dec!(4));
}

#[test]
fn investment_beyond_credit_is_refused() {
    let mut ledger = ledger();
    let (_, claim) = claim_with(&mut ledger, "{10.5} ready to be covered");
    let investor = AgentId::from("investor");

    let outcome = ledger.invest(claim, dec!(5), "eur", investor.clone()).unwrap();
    let InvestOutcome::InsufficientCredit { requested, credit } = outcome else {
        panic!("must be refused without a settlement");
    };
    assert_eq!(requested, dec!(5));
    assert_eq!(credit, dec!(4));
    assert_eq!(ledger.invested(claim), Decimal::ZERO);
    assert_eq!(ledger.state().contribution_count(claim), 0);
}

#[test]
fn quota_resets_on_a_new_day() {
    let mut ledger = ledger();
    let (_, claim) = claim_with(&mut ledger, "{10.5} of work done");
    let investor = AgentId::from("investor");

    ledger.invest(claim, dec!(4), "eur", investor.clone()).unwrap();
    assert_eq!(ledger.quota_remaining_today(&investor), Decimal::ZERO);

    ledger.set_clock(Box::new(FixedClock(day().succ_opt().unwrap())));
    assert_eq!(ledger.quota_remaining_today(&investor), dec!(4));
}

#[test]
fn investment_caps_at_remaining_hours() {
    let mut ledger = ledger();
    let (_, claim) = claim_with(&mut ledger, "small fix {0.5}");
    let investor = AgentId::from("investor");

    let outcome = ledger.invest(claim, dec!(100), "eur", investor).unwrap();
    let settlement = outcome.settlement().expect("caps instead of refusing");
    assert_eq!(settlement.settled_hours(), dec!(0.5));
    assert_eq!(ledger.remains(claim).unwrap(), Decimal::ZERO);

    // A second attempt finds nothing left.
    let outcome = ledger
        .invest(claim, dec!(1), "eur", AgentId::from("investor2"))
        .unwrap();
    assert!(matches!(outcome, InvestOutcome::NothingToInvest));
}

#[test]
fn native_hour_currency_converts_at_par() {
    let mut ledger = ledger();
    let (_, claim) = claim_with(&mut ledger, "{2} patched upstream");

    let outcome = ledger
        .invest(claim, dec!(1), "hur", AgentId::from("investor"))
        .unwrap();
    let settlement = outcome.settlement().unwrap();
    assert_eq!(settlement.payment_amount, dec!(1));
    assert_eq!(settlement.hour_unit_cost, dec!(1));
    assert!(settlement.hour_price.is_none());
}

#[test]
fn negative_investment_is_invalid_input() {
    let mut ledger = ledger();
    let (_, claim) = claim_with(&mut ledger, "{1} done");

    let err = ledger
        .invest(claim, dec!(-0.5), "eur", AgentId::from("investor"))
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidInput(_)));
    assert_eq!(ledger.invested(claim), Decimal::ZERO);
}

#[test]
fn unknown_currency_is_an_error() {
    let mut ledger = ledger();
    let (_, claim) = claim_with(&mut ledger, "{1} done");

    let err = ledger
        .invest(claim, dec!(0.5), "jpy", AgentId::from("investor"))
        .unwrap_err();
    assert!(matches!(err, LedgerError::UnknownCurrency(_)));
    assert_eq!(ledger.invested(claim), Decimal::ZERO);
}

#[test]
fn missing_snapshots_are_stale_price_data() {
    let mut ledger = Ledger::with_clock(LedgerConfig::default(), Box::new(FixedClock(day())));
    ledger.register_currency("eur");
    let topic = ledger.create_topic(AgentId::from("thinker"), "t");
    let claim = ledger
        .create_claim(topic, AgentId::from("doer"), "{1}")
        .unwrap();

    let err = ledger
        .invest(claim, dec!(0.5), "eur", AgentId::from("investor"))
        .unwrap_err();
    assert!(matches!(err, LedgerError::StalePriceData { .. }));
    assert_eq!(ledger.invested(claim), Decimal::ZERO);
}

#[test]
fn conservation_holds_through_mixed_history() {
    let mut ledger = ledger();
    let (topic, claim) = claim_with(&mut ledger, "{0.3} done, {?4} planned");

    ledger
        .invest(claim, dec!(0.8), "eur", AgentId::from("investor1"))
        .unwrap();
    assert_conserved(&ledger, claim);

    ledger.save_claim(claim, "{1.1} done, {?3.2} planned").unwrap();
    assert_conserved(&ledger, claim);
    assert_pair_symmetry(&ledger, claim);

    ledger
        .invest(claim, dec!(1.5), "usd", AgentId::from("investor2"))
        .unwrap();
    assert_conserved(&ledger, claim);

    ledger.save_claim(claim, "{2.0} done, {?2.3} planned").unwrap();
    assert_conserved(&ledger, claim);
    assert_pair_symmetry(&ledger, claim);

    assert_eq!(ledger.matched(claim, None), dec!(2.0));
    assert_eq!(ledger.invested(claim), dec!(2.3));
    assert_eq!(ledger.declared(topic), dec!(4.3));
    // The doer's claimed total tracks the latest accepted edit.
    assert_eq!(ledger.user_claimed(&AgentId::from("doer")), dec!(2.0));

    // Broken certificates never count, their children replace them.
    let broken_hours: Decimal = ledger
        .state()
        .certificates_for_claim(claim)
        .filter(|c| c.broken)
        .map(|c| c.hours)
        .sum();
    let child_hours: Decimal = ledger
        .state()
        .certificates_for_claim(claim)
        .filter(|c| c.parent.is_some() && !c.broken)
        .map(|c| c.hours)
        .sum();
    assert_eq!(broken_hours, child_hours);
}
