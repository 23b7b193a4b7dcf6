//! API request and response models.

use crate::game::types::{
    AccountStats, Bet, BetStatus, EntryStatus, EntryType, LedgerEntry, Round, RoundPhase,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Public view of the current round. Override state is deliberately
/// absent: only the admin surface may observe it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundSnapshot {
    pub period_number: u64,
    pub phase: RoundPhase,
    pub opened_at: DateTime<Utc>,
    pub closes_at: DateTime<Utc>,
    pub seconds_remaining: u64,
    pub total_bets: u64,
    pub total_staked: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winning_digit: Option<u8>,
}

impl RoundSnapshot {
    pub fn from_round(round: &Round, live_bets: u64, live_staked: u64) -> Self {
        let seconds_remaining = if round.phase == RoundPhase::Open {
            (round.closes_at - Utc::now()).num_seconds().max(0) as u64
        } else {
            0
        };
        let (total_bets, total_staked) = if round.phase == RoundPhase::Settled {
            (round.total_bets, round.total_staked)
        } else {
            (live_bets, live_staked)
        };
        Self {
            period_number: round.period_number,
            phase: round.phase,
            opened_at: round.opened_at,
            closes_at: round.closes_at,
            seconds_remaining,
            total_bets,
            total_staked,
            winning_digit: match round.phase {
                RoundPhase::Settled => round.winning_digit,
                _ => None,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettledRoundSummary {
    pub period_number: u64,
    pub winning_digit: Option<u8>,
    pub total_bets: u64,
    pub total_staked: u64,
    pub total_paid_out: u64,
    pub winners_count: u64,
}

impl From<&Round> for SettledRoundSummary {
    fn from(round: &Round) -> Self {
        Self {
            period_number: round.period_number,
            winning_digit: round.winning_digit,
            total_bets: round.total_bets,
            total_staked: round.total_staked,
            total_paid_out: round.total_paid_out,
            winners_count: round.winners_count,
        }
    }
}

/// Round history response (paginated, newest first)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub rounds: Vec<SettledRoundSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PlaceBetRequest {
    pub account_id: String,
    #[serde(default)]
    pub player_name: Option<String>,
    pub digit: u8,
    pub amount: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BetResponse {
    pub id: String,
    pub period_number: u64,
    pub digit: u8,
    pub amount: u64,
    pub multiplier: u32,
    pub status: BetStatus,
    pub win_amount: u64,
    pub placed_at: DateTime<Utc>,
}

impl From<&Bet> for BetResponse {
    fn from(bet: &Bet) -> Self {
        Self {
            id: bet.id.clone(),
            period_number: bet.period_number,
            digit: bet.digit,
            amount: bet.amount,
            multiplier: bet.multiplier,
            status: bet.status,
            win_amount: bet.win_amount,
            placed_at: bet.placed_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BetsResponse {
    pub bets: Vec<BetResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub account_id: String,
    pub balance: u64,
}

#[derive(Debug, Deserialize)]
pub struct DepositRequest {
    pub account_id: String,
    pub amount: u64,
}

#[derive(Debug, Deserialize)]
pub struct WithdrawRequest {
    pub account_id: String,
    pub amount: u64,
}

#[derive(Debug, Deserialize)]
pub struct BonusRequest {
    pub account_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryResponse {
    pub id: String,
    pub seq: u64,
    #[serde(rename = "type")]
    pub entry_type: EntryType,
    pub amount: i64,
    pub balance_before: u64,
    pub balance_after: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period_number: Option<u64>,
    pub status: EntryStatus,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&LedgerEntry> for EntryResponse {
    fn from(entry: &LedgerEntry) -> Self {
        Self {
            id: entry.id.clone(),
            seq: entry.seq,
            entry_type: entry.entry_type,
            amount: entry.amount,
            balance_before: entry.balance_before,
            balance_after: entry.balance_after,
            period_number: entry.period_number,
            status: entry.status,
            description: entry.description.clone(),
            reference_id: entry.reference_id.clone(),
            created_at: entry.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionsResponse {
    pub entries: Vec<EntryResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsResponse {
    pub account_id: String,
    pub total_bets: u64,
    pub total_wins: u64,
    pub total_staked: u64,
    pub total_won: u64,
    pub win_rate: f64,
    pub net_profit: i64,
}

impl StatsResponse {
    pub fn from_stats(account_id: &str, stats: &AccountStats) -> Self {
        Self {
            account_id: account_id.to_string(),
            total_bets: stats.total_bets,
            total_wins: stats.total_wins,
            total_staked: stats.total_staked,
            total_won: stats.total_won,
            win_rate: stats.win_rate(),
            net_profit: stats.net_profit(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct OverrideRequest {
    pub digit: u8,
}

/// Administrator view of the current round, including override state and
/// the per-digit exposure table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminRoundResponse {
    pub period_number: u64,
    pub phase: RoundPhase,
    pub closes_at: DateTime<Utc>,
    pub override_digit: Option<u8>,
    pub manually_controlled: bool,
    pub total_bets: u64,
    pub total_staked: u64,
    /// Staked amount per digit 0-9.
    pub staked_by_digit: [u64; 10],
    /// What settlement would pay out per winning digit 0-9.
    pub payout_by_digit: [u64; 10],
}
