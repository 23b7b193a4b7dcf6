//! Round event fan-out.
//!
//! A broadcast bus carrying the engine's named events to live viewers.
//! Emission is fire-and-forget: no subscriber, slow subscribers, or dropped
//! receivers never affect admission or settlement.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

/// Events pushed to live viewers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RoundEvent {
    RoundOpened {
        period_number: u64,
        closes_at: DateTime<Utc>,
    },
    LiveBet {
        period_number: u64,
        digit: u8,
        amount: u64,
        player_name: String,
    },
    RoundResolving {
        period_number: u64,
    },
    RoundSettled {
        period_number: u64,
        winning_digit: u8,
        total_staked: u64,
        total_paid_out: u64,
        winners_count: u64,
        manually_controlled: bool,
    },
    OverrideSet {
        period_number: u64,
        digit: u8,
    },
    OverrideCleared {
        period_number: u64,
    },
}

/// Shared broadcast handle. Cheap to clone.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<RoundEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Best-effort publish. A send error only means nobody is listening.
    pub fn emit(&self, event: RoundEvent) {
        if let Err(e) = self.tx.send(event) {
            debug!("no subscribers for round event: {}", e);
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RoundEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}
