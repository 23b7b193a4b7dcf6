//! Persistent engine records stored in RocksDB.
//!
//! Key layouts follow a `prefix | big-endian components` convention. History
//! indexes invert their ordering component (`u64::MAX - n`) so a forward scan
//! yields newest-first pages, with the last raw key handed back to clients as
//! a hex cursor.

use crate::game::types::{AccountStats, Bet, EntryType, LedgerEntry, Round};
use crate::store::{Store, StoreError, StoreResult};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

const ROUND_PREFIX: &[u8] = b"round:period:";
const ROUND_CURRENT_KEY: &[u8] = b"round:current";
const ROUND_SETTLED_PREFIX: &[u8] = b"round:settled:";
const BET_ROUND_PREFIX: &[u8] = b"bet:round:";
const BET_ACCOUNT_PREFIX: &[u8] = b"bet:account:";
const LEDGER_PREFIX: &[u8] = b"ledger:entry:";
const WALLET_PREFIX: &[u8] = b"wallet:account:";
const STATS_PREFIX: &[u8] = b"stats:account:";
const BONUS_PREFIX: &[u8] = b"wallet:bonus:";

/// Account balance plus the sequence number of its latest ledger entry,
/// updated together so the entry chain can never skew from the balance.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WalletRecord {
    pub balance: u64,
    pub entry_seq: u64,
}

/// Daily bonus bookkeeping.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BonusProfile {
    pub bonus_streak: u32,
    pub last_bonus_date: Option<NaiveDate>,
}

fn corrupted(what: &str, err: impl std::fmt::Display) -> StoreError {
    StoreError::Corrupted(format!("failed to decode {}: {}", what, err))
}

fn encode_json<T: Serialize>(what: &str, value: &T) -> StoreResult<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| corrupted(what, e))
}

// ---------------------------------------------------------------------------
// Key builders
// ---------------------------------------------------------------------------

pub fn round_key(period: u64) -> Vec<u8> {
    let mut key = Vec::with_capacity(ROUND_PREFIX.len() + 8);
    key.extend_from_slice(ROUND_PREFIX);
    key.extend_from_slice(&period.to_be_bytes());
    key
}

fn settled_index_key(period: u64) -> Vec<u8> {
    let mut key = Vec::with_capacity(ROUND_SETTLED_PREFIX.len() + 8);
    key.extend_from_slice(ROUND_SETTLED_PREFIX);
    key.extend_from_slice(&(u64::MAX - period).to_be_bytes());
    key
}

pub fn bet_key(period: u64, account_id: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(BET_ROUND_PREFIX.len() + 9 + account_id.len());
    key.extend_from_slice(BET_ROUND_PREFIX);
    key.extend_from_slice(&period.to_be_bytes());
    key.push(b':');
    key.extend_from_slice(account_id.as_bytes());
    key
}

fn bet_round_prefix(period: u64) -> Vec<u8> {
    let mut key = Vec::with_capacity(BET_ROUND_PREFIX.len() + 9);
    key.extend_from_slice(BET_ROUND_PREFIX);
    key.extend_from_slice(&period.to_be_bytes());
    key.push(b':');
    key
}

fn bet_account_index_key(account_id: &str, period: u64) -> Vec<u8> {
    let mut key = Vec::with_capacity(BET_ACCOUNT_PREFIX.len() + account_id.len() + 9);
    key.extend_from_slice(BET_ACCOUNT_PREFIX);
    key.extend_from_slice(account_id.as_bytes());
    key.push(b':');
    key.extend_from_slice(&(u64::MAX - period).to_be_bytes());
    key
}

fn account_scoped_prefix(prefix: &[u8], account_id: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(prefix.len() + account_id.len() + 1);
    key.extend_from_slice(prefix);
    key.extend_from_slice(account_id.as_bytes());
    key.push(b':');
    key
}

fn ledger_entry_key(account_id: &str, seq: u64) -> Vec<u8> {
    let mut key = account_scoped_prefix(LEDGER_PREFIX, account_id);
    key.extend_from_slice(&(u64::MAX - seq).to_be_bytes());
    key
}

fn account_key(prefix: &[u8], account_id: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(prefix.len() + account_id.len());
    key.extend_from_slice(prefix);
    key.extend_from_slice(account_id.as_bytes());
    key
}

// ---------------------------------------------------------------------------
// Rounds
// ---------------------------------------------------------------------------

/// Key/value for the round record itself.
pub fn round_kv(round: &Round) -> StoreResult<(Vec<u8>, Vec<u8>)> {
    Ok((
        round_key(round.period_number),
        encode_json("round", round)?,
    ))
}

/// Key/value marking the round as the current one.
pub fn current_round_kv(period: u64) -> (Vec<u8>, Vec<u8>) {
    (ROUND_CURRENT_KEY.to_vec(), period.to_be_bytes().to_vec())
}

/// Key/value adding the round to the settled-history index.
pub fn settled_index_kv(period: u64) -> (Vec<u8>, Vec<u8>) {
    (settled_index_key(period), Vec::new())
}

pub fn store_round(store: &Store, round: &Round) -> StoreResult<()> {
    let (key, value) = round_kv(round)?;
    store.put(&key, &value)
}

pub fn load_round(store: &Store, period: u64) -> StoreResult<Option<Round>> {
    let Some(bytes) = store.get(&round_key(period))? else {
        return Ok(None);
    };
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|e| corrupted("round", e))
}

pub fn load_current_period(store: &Store) -> StoreResult<Option<u64>> {
    let Some(bytes) = store.get(ROUND_CURRENT_KEY)? else {
        return Ok(None);
    };
    let raw: [u8; 8] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| corrupted("current period", "unexpected length"))?;
    Ok(Some(u64::from_be_bytes(raw)))
}

/// Newest-first page of settled rounds.
pub fn load_settled_rounds(
    store: &Store,
    cursor_hex: Option<&str>,
    limit: usize,
) -> StoreResult<(Vec<Round>, Option<String>)> {
    let cursor = decode_cursor(cursor_hex)?;
    let rows = store.scan_prefix(ROUND_SETTLED_PREFIX, cursor.as_deref(), limit.max(1))?;

    let mut rounds = Vec::with_capacity(rows.len());
    let mut next_cursor = None;

    for (key, _) in rows {
        if key.len() < ROUND_SETTLED_PREFIX.len() + 8 {
            continue;
        }
        let inv: [u8; 8] = key[key.len() - 8..].try_into().unwrap_or([0u8; 8]);
        let period = u64::MAX - u64::from_be_bytes(inv);
        if let Some(round) = load_round(store, period)? {
            rounds.push(round);
        }
        next_cursor = Some(hex::encode(&key));
    }

    if rounds.len() < limit {
        next_cursor = None;
    }
    Ok((rounds, next_cursor))
}

// ---------------------------------------------------------------------------
// Bets
// ---------------------------------------------------------------------------

/// Key/values for a bet record and its per-account history index.
pub fn bet_kvs(bet: &Bet) -> StoreResult<Vec<(Vec<u8>, Vec<u8>)>> {
    Ok(vec![
        (
            bet_key(bet.period_number, &bet.account_id),
            encode_json("bet", bet)?,
        ),
        (
            bet_account_index_key(&bet.account_id, bet.period_number),
            Vec::new(),
        ),
    ])
}

pub fn load_bet(store: &Store, period: u64, account_id: &str) -> StoreResult<Option<Bet>> {
    let Some(bytes) = store.get(&bet_key(period, account_id))? else {
        return Ok(None);
    };
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|e| corrupted("bet", e))
}

/// All bets of one round, account order.
pub fn load_round_bets(store: &Store, period: u64) -> StoreResult<Vec<Bet>> {
    let prefix = bet_round_prefix(period);
    let mut bets = Vec::new();
    let mut cursor: Option<Vec<u8>> = None;

    loop {
        let rows = store.scan_prefix(&prefix, cursor.as_deref(), 256)?;
        let Some(last) = rows.last() else {
            break;
        };
        cursor = Some(last.0.clone());
        for (_, value) in rows {
            bets.push(serde_json::from_slice(&value).map_err(|e| corrupted("bet", e))?);
        }
    }

    Ok(bets)
}

/// Newest-first page of an account's bets.
pub fn load_account_bets(
    store: &Store,
    account_id: &str,
    cursor_hex: Option<&str>,
    limit: usize,
) -> StoreResult<(Vec<Bet>, Option<String>)> {
    let prefix = account_scoped_prefix(BET_ACCOUNT_PREFIX, account_id);
    let cursor = decode_cursor(cursor_hex)?;
    let rows = store.scan_prefix(&prefix, cursor.as_deref(), limit.max(1))?;

    let mut bets = Vec::with_capacity(rows.len());
    let mut next_cursor = None;

    for (key, _) in rows {
        if key.len() < prefix.len() + 8 {
            continue;
        }
        let inv: [u8; 8] = key[key.len() - 8..].try_into().unwrap_or([0u8; 8]);
        let period = u64::MAX - u64::from_be_bytes(inv);
        if let Some(bet) = load_bet(store, period, account_id)? {
            bets.push(bet);
        }
        next_cursor = Some(hex::encode(&key));
    }

    if bets.len() < limit {
        next_cursor = None;
    }
    Ok((bets, next_cursor))
}

// ---------------------------------------------------------------------------
// Wallets and ledger entries
// ---------------------------------------------------------------------------

pub fn wallet_kv(account_id: &str, record: &WalletRecord) -> StoreResult<(Vec<u8>, Vec<u8>)> {
    Ok((
        account_key(WALLET_PREFIX, account_id),
        encode_json("wallet", record)?,
    ))
}

pub fn load_wallet(store: &Store, account_id: &str) -> StoreResult<WalletRecord> {
    let Some(bytes) = store.get(&account_key(WALLET_PREFIX, account_id))? else {
        return Ok(WalletRecord::default());
    };
    serde_json::from_slice(&bytes).map_err(|e| corrupted("wallet", e))
}

pub fn ledger_entry_kv(entry: &LedgerEntry) -> StoreResult<(Vec<u8>, Vec<u8>)> {
    Ok((
        ledger_entry_key(&entry.account_id, entry.seq),
        encode_json("ledger entry", entry)?,
    ))
}

/// Newest-first page of an account's ledger entries, optionally filtered by
/// type. The cursor always tracks the raw scan position so filtered pages
/// resume correctly.
pub fn load_account_entries(
    store: &Store,
    account_id: &str,
    entry_type: Option<EntryType>,
    cursor_hex: Option<&str>,
    limit: usize,
) -> StoreResult<(Vec<LedgerEntry>, Option<String>)> {
    let prefix = account_scoped_prefix(LEDGER_PREFIX, account_id);
    let mut cursor = decode_cursor(cursor_hex)?;
    let mut entries = Vec::with_capacity(limit);
    let mut next_cursor = None;

    loop {
        let rows = store.scan_prefix(&prefix, cursor.as_deref(), limit.max(1))?;
        let Some(last) = rows.last() else {
            next_cursor = None;
            break;
        };
        cursor = Some(last.0.clone());

        for (key, value) in rows {
            let entry: LedgerEntry =
                serde_json::from_slice(&value).map_err(|e| corrupted("ledger entry", e))?;
            if entry_type.map_or(true, |t| entry.entry_type == t) {
                entries.push(entry);
            }
            next_cursor = Some(hex::encode(&key));
            if entries.len() >= limit {
                return Ok((entries, next_cursor));
            }
        }
    }

    Ok((entries, next_cursor))
}

// ---------------------------------------------------------------------------
// Stats and bonus profiles
// ---------------------------------------------------------------------------

pub fn stats_kv(account_id: &str, stats: &AccountStats) -> StoreResult<(Vec<u8>, Vec<u8>)> {
    Ok((
        account_key(STATS_PREFIX, account_id),
        encode_json("account stats", stats)?,
    ))
}

pub fn load_account_stats(store: &Store, account_id: &str) -> StoreResult<AccountStats> {
    let Some(bytes) = store.get(&account_key(STATS_PREFIX, account_id))? else {
        return Ok(AccountStats::default());
    };
    serde_json::from_slice(&bytes).map_err(|e| corrupted("account stats", e))
}

pub fn bonus_kv(account_id: &str, profile: &BonusProfile) -> StoreResult<(Vec<u8>, Vec<u8>)> {
    Ok((
        account_key(BONUS_PREFIX, account_id),
        encode_json("bonus profile", profile)?,
    ))
}

pub fn load_bonus_profile(store: &Store, account_id: &str) -> StoreResult<BonusProfile> {
    let Some(bytes) = store.get(&account_key(BONUS_PREFIX, account_id))? else {
        return Ok(BonusProfile::default());
    };
    serde_json::from_slice(&bytes).map_err(|e| corrupted("bonus profile", e))
}

fn decode_cursor(cursor_hex: Option<&str>) -> StoreResult<Option<Vec<u8>>> {
    match cursor_hex {
        Some(c) => hex::decode(c)
            .map(Some)
            .map_err(|e| StoreError::Corrupted(format!("invalid cursor hex: {}", e))),
        None => Ok(None),
    }
}
