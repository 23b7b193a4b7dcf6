//! Wallet Ledger.
//!
//! Owns every account balance and its append-only entry chain. All mutations
//! go through an [`AccountTxn`]: the per-account mutex serializes
//! check-then-write sequences, staged records are flushed in one RocksDB
//! batch, and the in-memory balance is only advanced after the batch lands.
//! A persistence failure therefore leaves both memory and disk untouched.

use crate::errors::{EngineError, EngineResult};
use crate::game::types::{EntryStatus, EntryType, LedgerEntry};
use crate::round_store::{self, WalletRecord};
use crate::store::Store;
use chrono::Utc;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

#[derive(Default)]
struct AccountCell {
    loaded: bool,
    record: WalletRecord,
}

/// Shared ledger handle.
pub struct WalletLedger {
    store: Store,
    accounts: DashMap<String, Arc<Mutex<AccountCell>>>,
}

impl WalletLedger {
    pub fn new(store: Store) -> Self {
        Self {
            store,
            accounts: DashMap::new(),
        }
    }

    fn cell(&self, account_id: &str) -> Arc<Mutex<AccountCell>> {
        self.accounts
            .entry(account_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(AccountCell::default())))
            .clone()
    }

    /// Open a serialized transaction on one account. Holds the account lock
    /// until the returned txn is committed or dropped.
    pub async fn begin(&self, account_id: &str) -> EngineResult<AccountTxn> {
        let cell = self.cell(account_id);
        let mut guard = cell.lock_owned().await;

        if !guard.loaded {
            guard.record = round_store::load_wallet(&self.store, account_id)?;
            guard.loaded = true;
        }

        let record = guard.record.clone();
        Ok(AccountTxn {
            account_id: account_id.to_string(),
            store: self.store.clone(),
            guard,
            record,
            staged: Vec::new(),
            entries: Vec::new(),
        })
    }

    /// Current balance of an account.
    pub async fn balance(&self, account_id: &str) -> EngineResult<u64> {
        let txn = self.begin(account_id).await?;
        Ok(txn.balance())
    }
}

/// A description of one staged mutation.
pub struct EntrySpec<'a> {
    pub entry_type: EntryType,
    pub amount: i64,
    pub period_number: Option<u64>,
    pub status: EntryStatus,
    pub description: String,
    pub reference_id: Option<&'a str>,
}

/// In-flight, all-or-nothing mutation of one account.
pub struct AccountTxn {
    account_id: String,
    store: Store,
    guard: OwnedMutexGuard<AccountCell>,
    record: WalletRecord,
    staged: Vec<(Vec<u8>, Vec<u8>)>,
    entries: Vec<LedgerEntry>,
}

impl AccountTxn {
    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    /// Balance as seen by this transaction, including staged mutations.
    pub fn balance(&self) -> u64 {
        self.record.balance
    }

    /// Stage one balance mutation and its ledger entry. Debits that exceed
    /// the working balance are rejected with `InsufficientFunds` and leave
    /// the transaction usable.
    pub fn stage(&mut self, spec: EntrySpec<'_>) -> EngineResult<&LedgerEntry> {
        let balance_before = self.record.balance;
        let balance_after = if spec.amount >= 0 {
            balance_before.saturating_add(spec.amount as u64)
        } else {
            let debit = spec.amount.unsigned_abs();
            balance_before
                .checked_sub(debit)
                .ok_or(EngineError::InsufficientFunds)?
        };

        let entry = LedgerEntry {
            id: Uuid::new_v4().to_string(),
            account_id: self.account_id.clone(),
            seq: self.record.entry_seq + 1,
            entry_type: spec.entry_type,
            amount: spec.amount,
            balance_before,
            balance_after,
            period_number: spec.period_number,
            status: spec.status,
            description: spec.description,
            reference_id: spec.reference_id.map(|r| r.to_string()),
            created_at: Utc::now(),
        };

        self.record.balance = balance_after;
        self.record.entry_seq = entry.seq;

        self.staged.push(round_store::ledger_entry_kv(&entry)?);
        self.staged
            .push(round_store::wallet_kv(&self.account_id, &self.record)?);
        self.entries.push(entry);
        let staged_idx = self.entries.len() - 1;
        Ok(&self.entries[staged_idx])
    }

    /// Flush everything staged plus `extra` records in one atomic batch,
    /// then publish the new balance. `extra` lets admission and settlement
    /// piggyback bet/round/stats records on the same batch.
    pub fn commit(mut self, extra: Vec<(Vec<u8>, Vec<u8>)>) -> EngineResult<Vec<LedgerEntry>> {
        self.staged.extend(extra);
        self.store.batch_write(&self.staged)?;
        self.guard.record = self.record;
        Ok(self.entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn ledger() -> (TempDir, Arc<WalletLedger>) {
        let dir = TempDir::new().unwrap();
        let store = Store::open(dir.path()).unwrap();
        (dir, Arc::new(WalletLedger::new(store.clone())))
    }

    fn deposit_spec(amount: i64) -> EntrySpec<'static> {
        EntrySpec {
            entry_type: EntryType::Deposit,
            amount,
            period_number: None,
            status: EntryStatus::Completed,
            description: "test deposit".to_string(),
            reference_id: None,
        }
    }

    fn bet_spec(amount: i64) -> EntrySpec<'static> {
        EntrySpec {
            entry_type: EntryType::Bet,
            amount,
            period_number: Some(1001),
            status: EntryStatus::Completed,
            description: "test bet".to_string(),
            reference_id: None,
        }
    }

    #[tokio::test]
    async fn test_entries_form_a_causal_chain() {
        let (_dir, ledger) = ledger();

        let mut txn = ledger.begin("alice").await.unwrap();
        txn.stage(deposit_spec(100)).unwrap();
        txn.commit(vec![]).unwrap();

        let mut txn = ledger.begin("alice").await.unwrap();
        txn.stage(bet_spec(-30)).unwrap();
        txn.commit(vec![]).unwrap();

        assert_eq!(ledger.balance("alice").await.unwrap(), 70);

        let store = ledger.store.clone();
        let (entries, _) =
            round_store::load_account_entries(&store, "alice", None, None, 10).unwrap();
        // Newest first: bet then deposit.
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].balance_before, entries[1].balance_after);
        assert_eq!(entries[0].balance_after, 70);
        assert_eq!(entries[1].balance_before, 0);
        for entry in &entries {
            assert_eq!(
                entry.balance_after as i64,
                entry.balance_before as i64 + entry.amount
            );
        }
    }

    #[tokio::test]
    async fn test_overdraft_is_rejected_without_side_effects() {
        let (_dir, ledger) = ledger();

        let mut txn = ledger.begin("bob").await.unwrap();
        txn.stage(deposit_spec(20)).unwrap();
        txn.commit(vec![]).unwrap();

        let mut txn = ledger.begin("bob").await.unwrap();
        let err = txn.stage(bet_spec(-50)).unwrap_err();
        assert!(matches!(err, EngineError::InsufficientFunds));
        drop(txn);

        assert_eq!(ledger.balance("bob").await.unwrap(), 20);
    }

    #[tokio::test]
    async fn test_uncommitted_txn_changes_nothing() {
        let (_dir, ledger) = ledger();

        let mut txn = ledger.begin("carol").await.unwrap();
        txn.stage(deposit_spec(500)).unwrap();
        drop(txn); // never committed

        assert_eq!(ledger.balance("carol").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_debits_never_go_negative() {
        let (_dir, ledger) = ledger();

        let mut txn = ledger.begin("dave").await.unwrap();
        txn.stage(deposit_spec(100)).unwrap();
        txn.commit(vec![]).unwrap();

        // 10 concurrent debits of 30 against a balance of 100: exactly 3 can
        // succeed.
        let mut handles = Vec::new();
        for _ in 0..10 {
            let ledger = ledger.clone();
            handles.push(tokio::spawn(async move {
                let mut txn = ledger.begin("dave").await.unwrap();
                match txn.stage(bet_spec(-30)) {
                    Ok(_) => {
                        txn.commit(vec![]).unwrap();
                        true
                    }
                    Err(EngineError::InsufficientFunds) => false,
                    Err(e) => panic!("unexpected error: {}", e),
                }
            }));
        }

        let mut successes = 0;
        for handle in handles {
            if handle.await.unwrap() {
                successes += 1;
            }
        }
        assert_eq!(successes, 3);
        assert_eq!(ledger.balance("dave").await.unwrap(), 10);
    }
}
