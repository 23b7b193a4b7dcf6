//! Error types for the round lifecycle and settlement engine.

use crate::store::StoreError;

/// Rejections and failures surfaced by the engine.
///
/// Every variant maps to a stable reason code so API callers can branch on
/// `code()` without parsing messages.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Out-of-range digit or stake. Rejected synchronously, no state change.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The referenced round is not accepting bets.
    #[error("round is not accepting bets")]
    RoundClosed,

    /// The account already holds a bet for this round.
    #[error("a bet has already been placed for this round")]
    DuplicateBet,

    /// Balance is lower than the requested stake or withdrawal.
    #[error("insufficient balance")]
    InsufficientFunds,

    /// Daily bonus was already claimed today.
    #[error("daily bonus already claimed today")]
    BonusAlreadyClaimed,

    /// Override operations are only valid while the target round is open.
    #[error("round {0} is not open for override changes")]
    OverrideNotAllowed(u64),

    /// The persistence layer failed; the operation was aborted without
    /// partial effect and may be retried.
    #[error("persistence unavailable: {0}")]
    Persistence(#[from] StoreError),
}

impl EngineError {
    /// Stable reason code reported to callers.
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::InvalidInput(_) => "INVALID_INPUT",
            EngineError::RoundClosed => "ROUND_CLOSED",
            EngineError::DuplicateBet => "DUPLICATE_BET",
            EngineError::InsufficientFunds => "INSUFFICIENT_FUNDS",
            EngineError::BonusAlreadyClaimed => "BONUS_ALREADY_CLAIMED",
            EngineError::OverrideNotAllowed(_) => "OVERRIDE_NOT_ALLOWED",
            EngineError::Persistence(_) => "PERSISTENCE_UNAVAILABLE",
        }
    }

    /// Whether the caller may retry the operation unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::Persistence(_))
    }
}

/// Convenience alias used throughout the engine.
pub type EngineResult<T> = Result<T, EngineError>;
