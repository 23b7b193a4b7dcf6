//! Winning digit selection.

use crate::game::types::Round;
use rand::rngs::OsRng;
use rand::Rng;
use tracing::info;

/// Picks the winning digit for a round: the administrator override verbatim
/// when one is armed, otherwise a uniform draw over 0..=9.
pub struct OutcomeResolver;

impl OutcomeResolver {
    pub fn resolve(round: &Round) -> u8 {
        if let Some(digit) = round.override_digit {
            info!(
                period = round.period_number,
                digit, "resolving round with administrator override"
            );
            return digit;
        }
        let digit = OsRng.gen_range(0..=9u8);
        info!(period = round.period_number, digit, "resolved round randomly");
        digit
    }
}
