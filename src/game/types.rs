use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Round lifecycle phase. The scheduler is the only writer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RoundPhase {
    /// Betting window is open.
    Open,
    /// Window closed, outcome pending.
    Resolving,
    /// Outcome applied, round is immutable history.
    Settled,
}

impl fmt::Display for RoundPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoundPhase::Open => write!(f, "open"),
            RoundPhase::Resolving => write!(f, "resolving"),
            RoundPhase::Settled => write!(f, "settled"),
        }
    }
}

/// One betting cycle, identified by a strictly increasing period number.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Round {
    pub id: String,
    pub period_number: u64,
    pub phase: RoundPhase,
    pub opened_at: DateTime<Utc>,
    pub closes_at: DateTime<Utc>,
    /// Set exactly once, during settlement.
    pub winning_digit: Option<u8>,
    /// Administrator-supplied digit honored verbatim at resolution.
    pub override_digit: Option<u8>,
    pub manually_controlled: bool,
    pub total_bets: u64,
    pub total_staked: u64,
    pub total_paid_out: u64,
    pub winners_count: u64,
}

impl Round {
    pub fn open(period_number: u64, opened_at: DateTime<Utc>, closes_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            period_number,
            phase: RoundPhase::Open,
            opened_at,
            closes_at,
            winning_digit: None,
            override_digit: None,
            manually_controlled: false,
            total_bets: 0,
            total_staked: 0,
            total_paid_out: 0,
            winners_count: 0,
        }
    }

    pub fn is_open(&self) -> bool {
        self.phase == RoundPhase::Open
    }
}

/// Terminal status of a bet after settlement.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BetStatus {
    Pending,
    Won,
    Lost,
}

/// One account's wager in one round. At most one per (account, round).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bet {
    pub id: String,
    pub account_id: String,
    pub round_id: String,
    pub period_number: u64,
    pub digit: u8,
    pub amount: u64,
    pub multiplier: u32,
    pub status: BetStatus,
    pub win_amount: u64,
    pub placed_at: DateTime<Utc>,
}

impl Bet {
    pub fn place(
        account_id: &str,
        round: &Round,
        digit: u8,
        amount: u64,
        multiplier: u32,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            account_id: account_id.to_string(),
            round_id: round.id.clone(),
            period_number: round.period_number,
            digit,
            amount,
            multiplier,
            status: BetStatus::Pending,
            win_amount: 0,
            placed_at: Utc::now(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status != BetStatus::Pending
    }
}

/// Balance-affecting entry type.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    Bet,
    Win,
    Deposit,
    Withdrawal,
    Bonus,
    Referral,
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryType::Bet => write!(f, "bet"),
            EntryType::Win => write!(f, "win"),
            EntryType::Deposit => write!(f, "deposit"),
            EntryType::Withdrawal => write!(f, "withdrawal"),
            EntryType::Bonus => write!(f, "bonus"),
            EntryType::Referral => write!(f, "referral"),
        }
    }
}

/// Settlement state of a ledger entry (withdrawals stay pending until an
/// operator completes them).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    Pending,
    Completed,
    Failed,
}

/// Append-only record of one balance mutation. Never mutated or deleted.
///
/// Invariant: `balance_after == balance_before + amount`, and consecutive
/// entries for an account chain (`balance_before` of entry N equals
/// `balance_after` of entry N-1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: String,
    pub account_id: String,
    /// Per-account sequence number, dense from 1.
    pub seq: u64,
    pub entry_type: EntryType,
    /// Signed delta applied to the balance.
    pub amount: i64,
    pub balance_before: u64,
    pub balance_after: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period_number: Option<u64>,
    pub status: EntryStatus,
    pub description: String,
    /// External reference id, generated once and reused everywhere the
    /// transaction is reported.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Running per-account betting aggregates, updated in the same batches that
/// write bets and payouts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountStats {
    pub total_bets: u64,
    pub total_wins: u64,
    pub total_staked: u64,
    pub total_won: u64,
}

impl AccountStats {
    pub fn win_rate(&self) -> f64 {
        if self.total_bets == 0 {
            return 0.0;
        }
        self.total_wins as f64 / self.total_bets as f64 * 100.0
    }

    pub fn net_profit(&self) -> i64 {
        self.total_won as i64 - self.total_staked as i64
    }
}
