//! Round settlement: outcome fixing, payout, and round finalization.

use crate::errors::{EngineError, EngineResult};
use crate::events::{EventBus, RoundEvent};
use crate::game::resolver::OutcomeResolver;
use crate::game::types::{Bet, BetStatus, EntryStatus, EntryType, Round, RoundPhase};
use crate::ledger::{EntrySpec, WalletLedger};
use crate::round_store;
use crate::store::Store;
use std::sync::Arc;
use tracing::{info, warn};

pub struct SettlementEngine {
    store: Store,
    ledger: Arc<WalletLedger>,
    events: EventBus,
}

impl SettlementEngine {
    pub fn new(store: Store, ledger: Arc<WalletLedger>, events: EventBus) -> Self {
        Self {
            store,
            ledger,
            events,
        }
    }

    /// Settle a round. Safe to call again after a crash or a transient
    /// storage failure: the winning digit is fixed in storage before any
    /// payout, finished bets are skipped, and an already settled round is
    /// a no-op.
    pub async fn settle(&self, period: u64) -> EngineResult<Round> {
        let mut round = round_store::load_round(&self.store, period)?.ok_or_else(|| {
            EngineError::InvalidInput(format!("cannot settle unknown period {}", period))
        })?;

        if round.phase == RoundPhase::Settled {
            return Ok(round);
        }

        // Fix the outcome durably before touching any wallet, so a retry
        // after a mid-settlement crash pays out against the same digit.
        let winning = match round.winning_digit {
            Some(d) => d,
            None => {
                let d = OutcomeResolver::resolve(&round);
                round.winning_digit = Some(d);
                round.phase = RoundPhase::Resolving;
                round_store::store_round(&self.store, &round)?;
                d
            }
        };

        let mut bets = round_store::load_round_bets(&self.store, period)?;
        for bet in bets.iter_mut() {
            if bet.is_terminal() {
                continue;
            }
            if bet.digit == winning {
                self.pay_winner(bet).await?;
            } else {
                bet.status = BetStatus::Lost;
                let kvs = round_store::bet_kvs(bet)?;
                self.store.batch_write(&kvs)?;
            }
        }

        round.total_bets = bets.len() as u64;
        round.total_staked = bets.iter().map(|b| b.amount).sum();
        round.total_paid_out = bets.iter().map(|b| b.win_amount).sum();
        round.winners_count = bets.iter().filter(|b| b.status == BetStatus::Won).count() as u64;
        round.phase = RoundPhase::Settled;

        let batch = vec![
            round_store::round_kv(&round)?,
            round_store::settled_index_kv(period),
        ];
        self.store.batch_write(&batch)?;

        info!(
            period,
            winning,
            staked = round.total_staked,
            paid_out = round.total_paid_out,
            winners = round.winners_count,
            "round settled"
        );
        self.events.emit(RoundEvent::RoundSettled {
            period_number: period,
            winning_digit: winning,
            total_staked: round.total_staked,
            total_paid_out: round.total_paid_out,
            winners_count: round.winners_count,
            manually_controlled: round.manually_controlled,
        });

        Ok(round)
    }

    /// Credit one winning bet. The bet flip, the win entry, the balance,
    /// and the account stats land in one batch.
    async fn pay_winner(&self, bet: &mut Bet) -> EngineResult<()> {
        let win_amount = bet.amount.saturating_mul(bet.multiplier as u64);
        bet.status = BetStatus::Won;
        bet.win_amount = win_amount;

        let mut txn = self.ledger.begin(&bet.account_id).await?;
        txn.stage(EntrySpec {
            entry_type: EntryType::Win,
            amount: win_amount as i64,
            period_number: Some(bet.period_number),
            status: EntryStatus::Completed,
            description: format!(
                "Won {} on digit {} (period {})",
                win_amount, bet.digit, bet.period_number
            ),
            reference_id: Some(&bet.id),
        })?;

        let mut stats = round_store::load_account_stats(&self.store, &bet.account_id)?;
        stats.total_wins += 1;
        stats.total_won += win_amount;

        let mut extra = round_store::bet_kvs(bet)?;
        extra.push(round_store::stats_kv(&bet.account_id, &stats)?);
        if let Err(e) = txn.commit(extra) {
            warn!(
                period = bet.period_number,
                account = %bet.account_id,
                "payout commit failed: {}",
                e
            );
            return Err(e);
        }
        Ok(())
    }
}
