//! Luckyten - recurring digit-prediction game engine.
//!
//! A round opens every cycle, players stake on a digit 0-9, and settlement
//! pays winners at a fixed multiplier from an append-only wallet ledger.
//! All money movement is batch-atomic over RocksDB, so the engine recovers
//! mid-round after a crash without losing or double-paying a bet.

pub mod api;
pub mod config;
pub mod errors;
pub mod events;
pub mod game;
pub mod ledger;
pub mod round_store;
pub mod store;
pub mod wallet;

pub use config::AppConfig;
pub use errors::{EngineError, EngineResult};
pub use events::EventBus;
pub use game::RoundEngine;
pub use ledger::WalletLedger;
pub use store::Store;
pub use wallet::WalletService;
