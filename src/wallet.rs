//! Wallet operations outside the betting flow: deposits, withdrawal
//! requests, and the daily login bonus.

use crate::config::WalletConfig;
use crate::errors::{EngineError, EngineResult};
use crate::game::types::{EntryStatus, EntryType, LedgerEntry};
use crate::ledger::{EntrySpec, WalletLedger};
use crate::round_store::{self, BonusProfile};
use crate::store::Store;
use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Bonus amounts by consecutive-day streak: day one, day two, day three
/// and beyond.
const BONUS_LADDER: [u64; 3] = [50, 100, 200];

pub struct WalletService {
    store: Store,
    ledger: Arc<WalletLedger>,
    rules: WalletConfig,
}

impl WalletService {
    pub fn new(store: Store, ledger: Arc<WalletLedger>, rules: WalletConfig) -> Self {
        Self {
            store,
            ledger,
            rules,
        }
    }

    /// Credit a completed deposit.
    pub async fn deposit(&self, account_id: &str, amount: u64) -> EngineResult<LedgerEntry> {
        if amount == 0 || amount > self.rules.max_deposit {
            return Err(EngineError::InvalidInput(format!(
                "deposit must be between 1 and {}, got {}",
                self.rules.max_deposit, amount
            )));
        }
        let reference = Uuid::new_v4().to_string();
        let mut txn = self.ledger.begin(account_id).await?;
        txn.stage(EntrySpec {
            entry_type: EntryType::Deposit,
            amount: amount as i64,
            period_number: None,
            status: EntryStatus::Completed,
            description: format!("Deposit of {}", amount),
            reference_id: Some(&reference),
        })?;
        let mut entries = txn.commit(Vec::new())?;
        info!(account = account_id, amount, "deposit credited");
        Ok(entries.remove(0))
    }

    /// Debit a withdrawal request. Funds leave the balance immediately;
    /// the entry stays pending until an external process completes it.
    pub async fn withdraw(&self, account_id: &str, amount: u64) -> EngineResult<LedgerEntry> {
        if amount < self.rules.min_withdrawal {
            return Err(EngineError::InvalidInput(format!(
                "withdrawal must be at least {}, got {}",
                self.rules.min_withdrawal, amount
            )));
        }
        let reference = Uuid::new_v4().to_string();
        let mut txn = self.ledger.begin(account_id).await?;
        txn.stage(EntrySpec {
            entry_type: EntryType::Withdrawal,
            amount: -(amount as i64),
            period_number: None,
            status: EntryStatus::Pending,
            description: format!("Withdrawal request of {}", amount),
            reference_id: Some(&reference),
        })?;
        let mut entries = txn.commit(Vec::new())?;
        info!(account = account_id, amount, "withdrawal requested");
        Ok(entries.remove(0))
    }

    /// Claim the daily bonus. Consecutive days climb the bonus ladder;
    /// a missed day resets the streak to one.
    pub async fn claim_daily_bonus(&self, account_id: &str) -> EngineResult<LedgerEntry> {
        let mut txn = self.ledger.begin(account_id).await?;

        // Profile reads are safe here: same-account claims serialize on
        // the account lock taken by `begin`.
        let mut profile = round_store::load_bonus_profile(&self.store, account_id)?;
        let today = Utc::now().date_naive();
        match profile.last_bonus_date {
            Some(last) if last == today => return Err(EngineError::BonusAlreadyClaimed),
            Some(last) if last == today - Duration::days(1) => profile.bonus_streak += 1,
            _ => profile.bonus_streak = 1,
        }
        profile.last_bonus_date = Some(today);

        let ladder_index = (profile.bonus_streak as usize - 1).min(BONUS_LADDER.len() - 1);
        let amount = BONUS_LADDER[ladder_index];

        txn.stage(EntrySpec {
            entry_type: EntryType::Bonus,
            amount: amount as i64,
            period_number: None,
            status: EntryStatus::Completed,
            description: format!("Daily bonus, day {}", profile.bonus_streak),
            reference_id: None,
        })?;
        let extra = vec![round_store::bonus_kv(account_id, &profile)?];
        let mut entries = txn.commit(extra)?;
        info!(
            account = account_id,
            amount,
            streak = profile.bonus_streak,
            "daily bonus claimed"
        );
        Ok(entries.remove(0))
    }

    pub async fn balance(&self, account_id: &str) -> EngineResult<u64> {
        self.ledger.balance(account_id).await
    }

    pub fn bonus_profile(&self, account_id: &str) -> EngineResult<BonusProfile> {
        Ok(round_store::load_bonus_profile(&self.store, account_id)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn service() -> (TempDir, WalletService, Arc<WalletLedger>) {
        let dir = TempDir::new().unwrap();
        let store = Store::open(dir.path()).unwrap();
        let ledger = Arc::new(WalletLedger::new(store.clone()));
        let service = WalletService::new(store, ledger.clone(), WalletConfig::default());
        (dir, service, ledger)
    }

    #[tokio::test]
    async fn test_deposit_bounds() {
        let (_dir, service, ledger) = service();
        assert!(service.deposit("alice", 0).await.is_err());
        assert!(service.deposit("alice", 100_001).await.is_err());

        let entry = service.deposit("alice", 500).await.unwrap();
        assert_eq!(entry.entry_type, EntryType::Deposit);
        assert_eq!(entry.balance_after, 500);
        assert!(entry.reference_id.is_some());
        assert_eq!(ledger.balance("alice").await.unwrap(), 500);
    }

    #[tokio::test]
    async fn test_withdrawal_is_pending_and_debits_immediately() {
        let (_dir, service, ledger) = service();
        service.deposit("bob", 1000).await.unwrap();

        assert!(service.withdraw("bob", 50).await.is_err());
        let entry = service.withdraw("bob", 300).await.unwrap();
        assert_eq!(entry.status, EntryStatus::Pending);
        assert_eq!(entry.amount, -300);
        assert_eq!(ledger.balance("bob").await.unwrap(), 700);
    }

    #[tokio::test]
    async fn test_withdrawal_cannot_overdraw() {
        let (_dir, service, ledger) = service();
        service.deposit("carol", 200).await.unwrap();
        assert!(matches!(
            service.withdraw("carol", 500).await.unwrap_err(),
            EngineError::InsufficientFunds
        ));
        assert_eq!(ledger.balance("carol").await.unwrap(), 200);
    }

    #[tokio::test]
    async fn test_daily_bonus_once_per_day() {
        let (_dir, service, ledger) = service();
        let entry = service.claim_daily_bonus("dana").await.unwrap();
        assert_eq!(entry.amount, 50);
        assert_eq!(ledger.balance("dana").await.unwrap(), 50);

        assert!(matches!(
            service.claim_daily_bonus("dana").await.unwrap_err(),
            EngineError::BonusAlreadyClaimed
        ));
        assert_eq!(ledger.balance("dana").await.unwrap(), 50);
    }

    #[tokio::test]
    async fn test_bonus_streak_climbs_and_caps() {
        let (_dir, service, _ledger) = service();
        let today = Utc::now().date_naive();

        // Simulate a four-day streak already on file.
        let profile = BonusProfile {
            bonus_streak: 4,
            last_bonus_date: Some(today - Duration::days(1)),
        };
        let kv = round_store::bonus_kv("erin", &profile).unwrap();
        service.store.batch_write(&[kv]).unwrap();

        let entry = service.claim_daily_bonus("erin").await.unwrap();
        assert_eq!(entry.amount, 200);
        let updated = service.bonus_profile("erin").unwrap();
        assert_eq!(updated.bonus_streak, 5);
    }

    #[tokio::test]
    async fn test_missed_day_resets_streak() {
        let (_dir, service, _ledger) = service();
        let today = Utc::now().date_naive();
        let profile = BonusProfile {
            bonus_streak: 3,
            last_bonus_date: Some(today - Duration::days(3)),
        };
        let kv = round_store::bonus_kv("fred", &profile).unwrap();
        service.store.batch_write(&[kv]).unwrap();

        let entry = service.claim_daily_bonus("fred").await.unwrap();
        assert_eq!(entry.amount, 50);
        assert_eq!(service.bonus_profile("fred").unwrap().bonus_streak, 1);
    }
}
