//! Round lifecycle driver.
//!
//! One `RoundEngine` owns the authoritative in-memory round behind an async
//! `RwLock`. Admission takes the read lock, phase transitions take the write
//! lock, so a bet can never land in a round the scheduler has already closed.

use crate::config::GameConfig;
use crate::errors::{EngineError, EngineResult};
use crate::events::{EventBus, RoundEvent};
use crate::game::settlement::SettlementEngine;
use crate::game::types::{Round, RoundPhase};
use crate::ledger::WalletLedger;
use crate::round_store;
use crate::store::Store;
use chrono::{Duration as ChronoDuration, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

const RETRY_BASE: Duration = Duration::from_millis(500);
const RETRY_CAP: Duration = Duration::from_secs(5);

pub struct RoundEngine {
    store: Store,
    ledger: Arc<WalletLedger>,
    events: EventBus,
    rules: GameConfig,
    settlement: SettlementEngine,
    current: RwLock<Round>,
    /// Live counters for the open round, recomputed from storage on
    /// recovery and at settlement. Display only.
    pub(crate) live_bets: AtomicU64,
    pub(crate) live_staked: AtomicU64,
}

impl RoundEngine {
    /// Build the engine, recovering the in-flight round from storage. A
    /// fresh database starts at the configured first period.
    pub fn bootstrap(
        store: Store,
        ledger: Arc<WalletLedger>,
        events: EventBus,
        rules: GameConfig,
    ) -> EngineResult<Self> {
        let recovered = match round_store::load_current_period(&store)? {
            Some(period) => round_store::load_round(&store, period)?,
            None => None,
        };

        let round = match recovered {
            Some(round) => {
                info!(
                    period = round.period_number,
                    phase = %round.phase,
                    "recovered in-flight round"
                );
                round
            }
            None => {
                let round = Self::new_round(rules.starting_period, &rules);
                let batch = vec![
                    round_store::round_kv(&round)?,
                    round_store::current_round_kv(round.period_number),
                ];
                store.batch_write(&batch)?;
                info!(period = round.period_number, "opened first round");
                round
            }
        };

        // A round recovered mid-flight (open or resolving) reports its
        // committed bets through the live counters until settlement writes
        // the final totals.
        let (live_bets, live_staked) = if round.phase == RoundPhase::Settled {
            (0, 0)
        } else {
            let bets = round_store::load_round_bets(&store, round.period_number)?;
            (bets.len() as u64, bets.iter().map(|b| b.amount).sum())
        };

        let settlement = SettlementEngine::new(store.clone(), ledger.clone(), events.clone());
        Ok(Self {
            store,
            ledger,
            events,
            rules,
            settlement,
            current: RwLock::new(round),
            live_bets: AtomicU64::new(live_bets),
            live_staked: AtomicU64::new(live_staked),
        })
    }

    fn new_round(period: u64, rules: &GameConfig) -> Round {
        let now = Utc::now();
        let closes = now + ChronoDuration::seconds(rules.betting_window_secs as i64);
        Round::open(period, now, closes)
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn ledger(&self) -> &WalletLedger {
        &self.ledger
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn rules(&self) -> &GameConfig {
        &self.rules
    }

    pub(crate) fn current(&self) -> &RwLock<Round> {
        &self.current
    }

    /// Clone of the current round plus the live bet counters.
    pub async fn snapshot(&self) -> (Round, u64, u64) {
        let round = self.current.read().await.clone();
        (
            round,
            self.live_bets.load(Ordering::Relaxed),
            self.live_staked.load(Ordering::Relaxed),
        )
    }

    /// Arm the administrator override for the current round. Only allowed
    /// while the betting window is open; once the round starts resolving
    /// its outcome is already decided.
    pub async fn set_override(&self, digit: u8) -> EngineResult<Round> {
        if digit > 9 {
            return Err(EngineError::InvalidInput(format!(
                "digit must be 0-9, got {}",
                digit
            )));
        }
        let mut guard = self.current.write().await;
        if !guard.is_open() {
            return Err(EngineError::OverrideNotAllowed(guard.period_number));
        }
        let mut round = guard.clone();
        round.override_digit = Some(digit);
        round.manually_controlled = true;
        round_store::store_round(&self.store, &round)?;
        *guard = round.clone();
        drop(guard);

        info!(period = round.period_number, digit, "override armed");
        self.events.emit(RoundEvent::OverrideSet {
            period_number: round.period_number,
            digit,
        });
        Ok(round)
    }

    /// Disarm the override, returning the round to random resolution.
    /// Disarming when nothing is armed succeeds without effect.
    pub async fn clear_override(&self) -> EngineResult<Round> {
        let mut guard = self.current.write().await;
        if !guard.is_open() {
            return Err(EngineError::OverrideNotAllowed(guard.period_number));
        }
        if guard.override_digit.is_none() {
            return Ok(guard.clone());
        }
        let mut round = guard.clone();
        round.override_digit = None;
        round.manually_controlled = false;
        round_store::store_round(&self.store, &round)?;
        *guard = round.clone();
        drop(guard);

        info!(period = round.period_number, "override disarmed");
        self.events.emit(RoundEvent::OverrideCleared {
            period_number: round.period_number,
        });
        Ok(round)
    }

    /// Drive the lifecycle forever. Storage failures are retried with
    /// backoff in place: a round may run late, but no period is ever
    /// skipped and no admitted bet is left unsettled.
    pub async fn run(self: Arc<Self>) {
        loop {
            let (period, phase, closes_at) = {
                let round = self.current.read().await;
                (round.period_number, round.phase, round.closes_at)
            };

            match phase {
                RoundPhase::Open => {
                    let remaining = (closes_at - Utc::now()).to_std().unwrap_or(Duration::ZERO);
                    tokio::time::sleep(remaining).await;
                    self.close_window(period).await;
                }
                RoundPhase::Resolving => {
                    tokio::time::sleep(Duration::from_secs(self.rules.resolving_secs)).await;
                    self.settle_current(period).await;
                    tokio::time::sleep(Duration::from_millis(self.rules.settled_pause_ms)).await;
                    self.open_next(period + 1).await;
                }
                RoundPhase::Settled => {
                    // Only reachable right after recovery from a crash that
                    // landed between settlement and the next open.
                    self.open_next(period + 1).await;
                }
            }
        }
    }

    /// Flip the current round to resolving. Holding the write lock across
    /// the persist guarantees no admission interleaves with the flip.
    async fn close_window(&self, period: u64) {
        let mut backoff = RETRY_BASE;
        loop {
            let mut guard = self.current.write().await;
            let mut round = guard.clone();
            round.phase = RoundPhase::Resolving;
            match round_store::store_round(&self.store, &round) {
                Ok(()) => {
                    *guard = round;
                    break;
                }
                Err(e) => {
                    drop(guard);
                    warn!(period, "failed to close betting window, retrying: {}", e);
                    tokio::time::sleep(backoff).await;
                    backoff = (backoff * 2).min(RETRY_CAP);
                }
            }
        }
        info!(period, "betting window closed");
        self.events.emit(RoundEvent::RoundResolving {
            period_number: period,
        });
    }

    async fn settle_current(&self, period: u64) {
        let mut backoff = RETRY_BASE;
        let settled = loop {
            match self.settlement.settle(period).await {
                Ok(round) => break round,
                Err(e) if e.is_retryable() => {
                    warn!(period, "settlement failed, retrying: {}", e);
                    tokio::time::sleep(backoff).await;
                    backoff = (backoff * 2).min(RETRY_CAP);
                }
                Err(e) => {
                    // Non-retryable here means the round record itself is
                    // gone, which is unrecoverable without intervention.
                    error!(period, "settlement failed permanently: {}", e);
                    tokio::time::sleep(RETRY_CAP).await;
                }
            }
        };
        *self.current.write().await = settled;
    }

    async fn open_next(&self, period: u64) {
        let mut backoff = RETRY_BASE;
        let round = loop {
            let round = Self::new_round(period, &self.rules);
            let result = round_store::round_kv(&round).and_then(|kv| {
                self.store
                    .batch_write(&[kv, round_store::current_round_kv(period)])
            });
            match result {
                Ok(()) => break round,
                Err(e) => {
                    warn!(period, "failed to open next round, retrying: {}", e);
                    tokio::time::sleep(backoff).await;
                    backoff = (backoff * 2).min(RETRY_CAP);
                }
            }
        };

        self.live_bets.store(0, Ordering::Relaxed);
        self.live_staked.store(0, Ordering::Relaxed);
        let closes_at = round.closes_at;
        *self.current.write().await = round;

        info!(period, "round opened");
        self.events.emit(RoundEvent::RoundOpened {
            period_number: period,
            closes_at,
        });
    }
}
