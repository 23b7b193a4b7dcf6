//! Bet admission: validation, funding, and atomic persistence.

use crate::errors::{EngineError, EngineResult};
use crate::events::RoundEvent;
use crate::game::scheduler::RoundEngine;
use crate::game::types::{Bet, EntryStatus, EntryType};
use crate::ledger::EntrySpec;
use crate::round_store;
use std::sync::atomic::Ordering;
use tracing::info;

/// Admit one bet into the current round.
///
/// The round read lock is held across the whole admission so the scheduler's
/// phase flip (which takes the write lock) can never interleave with the
/// debit: every admitted bet is observed by settlement. The account lock is
/// always taken after the round lock.
pub async fn place_bet(
    engine: &RoundEngine,
    account_id: &str,
    player_name: &str,
    digit: u8,
    amount: u64,
) -> EngineResult<Bet> {
    if account_id.is_empty() {
        return Err(EngineError::InvalidInput("account id is required".into()));
    }
    if digit > 9 {
        return Err(EngineError::InvalidInput(format!(
            "digit must be 0-9, got {}",
            digit
        )));
    }
    let rules = engine.rules();
    if amount < rules.min_stake || amount > rules.max_stake {
        return Err(EngineError::InvalidInput(format!(
            "stake must be between {} and {}, got {}",
            rules.min_stake, rules.max_stake, amount
        )));
    }

    let round = engine.current().read().await;
    if !round.is_open() {
        return Err(EngineError::RoundClosed);
    }
    let period = round.period_number;

    // Same-account admissions serialize on the account lock, so the point
    // read below sees any bet a concurrent admission already committed.
    let mut txn = engine.ledger().begin(account_id).await?;
    if round_store::load_bet(engine.store(), period, account_id)?.is_some() {
        return Err(EngineError::DuplicateBet);
    }

    let bet = Bet::place(account_id, &round, digit, amount, rules.payout_multiplier);

    txn.stage(EntrySpec {
        entry_type: EntryType::Bet,
        amount: -(amount as i64),
        period_number: Some(period),
        status: EntryStatus::Completed,
        description: format!("Bet {} on digit {} (period {})", amount, digit, period),
        reference_id: Some(&bet.id),
    })?;

    let mut stats = round_store::load_account_stats(engine.store(), account_id)?;
    stats.total_bets += 1;
    stats.total_staked += amount;

    let mut extra = round_store::bet_kvs(&bet)?;
    extra.push(round_store::stats_kv(account_id, &stats)?);
    txn.commit(extra)?;

    engine.live_bets.fetch_add(1, Ordering::Relaxed);
    engine.live_staked.fetch_add(amount, Ordering::Relaxed);

    info!(
        period,
        account = account_id,
        digit,
        amount,
        "bet admitted"
    );
    engine.events().emit(RoundEvent::LiveBet {
        period_number: period,
        digit,
        amount,
        player_name: player_name.to_string(),
    });

    Ok(bet)
}
