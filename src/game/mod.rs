//! Recurring digit-prediction game: round lifecycle, bet admission, and
//! settlement.

pub mod admission;
pub mod resolver;
pub mod scheduler;
pub mod settlement;
pub mod types;

pub use admission::place_bet;
pub use scheduler::RoundEngine;
pub use settlement::SettlementEngine;
