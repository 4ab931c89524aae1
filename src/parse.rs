//! Hour token extraction.
//!
//! Claims declare time value inline in free text: `{1.5}` asserts claimed
//! (completed) hours, `{?6.5}` asserts assumed (future) hours. Everything
//! else, including malformed tokens, is ignored.

use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::HOUR_SCALE;

/// Hours parsed out of a claim's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ParsedHours {
    pub claimed_hours: Decimal,
    pub assumed_hours: Decimal,
}

impl ParsedHours {
    /// Claimed plus assumed.
    pub fn total(&self) -> Decimal {
        self.claimed_hours + self.assumed_hours
    }
}

/// Parse claimed and assumed hours from free text.
///
/// Sums all `{X}` tokens into `claimed_hours` and all `{?X}` tokens into
/// `assumed_hours`, where `X` must be a non-negative decimal literal.
/// Unparseable and negative tokens contribute nothing. Pure and
/// order-independent; both totals default to zero.
pub fn parse_hours(text: &str) -> ParsedHours {
    let token_re = Regex::new(r"\{([^}]+)\}").expect("hour token pattern is valid");

    let mut parsed = ParsedHours::default();
    for capture in token_re.captures_iter(text) {
        let token = capture[1].trim();
        let (target, literal) = match token.strip_prefix('?') {
            Some(rest) => (&mut parsed.assumed_hours, rest.trim()),
            None => (&mut parsed.claimed_hours, token),
        };
        match literal.parse::<Decimal>() {
            Ok(hours) if hours.is_sign_positive() => {
                *target += hours.round_dp(HOUR_SCALE);
            }
            _ => {}
        }
    }
    parsed
}
