//! End-to-end round lifecycle tests: admission, settlement, and the
//! wallet ledger working against one real database.

use luckyten::config::{GameConfig, WalletConfig};
use luckyten::errors::EngineError;
use luckyten::game::types::{BetStatus, EntryType, RoundPhase};
use luckyten::game::{place_bet, RoundEngine, SettlementEngine};
use luckyten::{round_store, EventBus, Store, WalletLedger, WalletService};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

struct Harness {
    _dir: TempDir,
    store: Store,
    ledger: Arc<WalletLedger>,
    wallet: WalletService,
    engine: Arc<RoundEngine>,
    settlement: SettlementEngine,
    events: EventBus,
}

fn harness(rules: GameConfig) -> Harness {
    let dir = TempDir::new().unwrap();
    let store = Store::open(dir.path()).unwrap();
    let events = EventBus::new(64);
    let ledger = Arc::new(WalletLedger::new(store.clone()));
    let wallet = WalletService::new(store.clone(), ledger.clone(), WalletConfig::default());
    let engine = Arc::new(
        RoundEngine::bootstrap(store.clone(), ledger.clone(), events.clone(), rules).unwrap(),
    );
    let settlement = SettlementEngine::new(store.clone(), ledger.clone(), events.clone());
    Harness {
        _dir: dir,
        store,
        ledger,
        wallet,
        engine,
        settlement,
        events,
    }
}

fn slow_rules() -> GameConfig {
    GameConfig {
        betting_window_secs: 600,
        ..GameConfig::default()
    }
}

#[tokio::test]
async fn test_winning_bet_full_cycle() {
    let h = harness(slow_rules());
    h.wallet.deposit("alice", 100).await.unwrap();

    h.engine.set_override(3).await.unwrap();
    let bet = place_bet(&h.engine, "alice", "Alice", 3, 50).await.unwrap();
    assert_eq!(bet.period_number, 1001);
    assert_eq!(bet.multiplier, 4);
    assert_eq!(h.ledger.balance("alice").await.unwrap(), 50);

    let settled = h.settlement.settle(1001).await.unwrap();
    assert_eq!(settled.phase, RoundPhase::Settled);
    assert_eq!(settled.winning_digit, Some(3));
    assert!(settled.manually_controlled);
    assert_eq!(settled.winners_count, 1);
    assert_eq!(settled.total_staked, 50);
    assert_eq!(settled.total_paid_out, 200);

    // 50 staked, 200 credited back.
    assert_eq!(h.ledger.balance("alice").await.unwrap(), 250);

    let entries = round_store::load_account_entries(&h.store, "alice", None, None, 10)
        .unwrap()
        .0;
    assert_eq!(entries.len(), 3);
    // Newest first: win, bet, deposit.
    assert_eq!(entries[0].entry_type, EntryType::Win);
    assert_eq!(entries[0].amount, 200);
    assert_eq!(entries[1].entry_type, EntryType::Bet);
    assert_eq!(entries[1].amount, -50);
    // Balances chain through the whole history.
    assert_eq!(entries[1].balance_after, entries[0].balance_before);
    assert_eq!(entries[2].balance_after, entries[1].balance_before);
}

#[tokio::test]
async fn test_losing_bet_leaves_only_the_debit() {
    let h = harness(slow_rules());
    h.wallet.deposit("bob", 100).await.unwrap();

    h.engine.set_override(7).await.unwrap();
    place_bet(&h.engine, "bob", "Bob", 2, 50).await.unwrap();

    let settled = h.settlement.settle(1001).await.unwrap();
    assert_eq!(settled.winners_count, 0);
    assert_eq!(settled.total_paid_out, 0);
    assert_eq!(h.ledger.balance("bob").await.unwrap(), 50);

    let entries = round_store::load_account_entries(&h.store, "bob", None, None, 10)
        .unwrap()
        .0;
    assert_eq!(entries.len(), 2);

    let bet = round_store::load_bet(&h.store, 1001, "bob").unwrap().unwrap();
    assert_eq!(bet.status, BetStatus::Lost);
    assert_eq!(bet.win_amount, 0);
}

#[tokio::test]
async fn test_insufficient_funds_changes_nothing() {
    let h = harness(slow_rules());
    h.wallet.deposit("carol", 30).await.unwrap();

    let err = place_bet(&h.engine, "carol", "Carol", 5, 50).await.unwrap_err();
    assert!(matches!(err, EngineError::InsufficientFunds));

    assert_eq!(h.ledger.balance("carol").await.unwrap(), 30);
    assert!(round_store::load_bet(&h.store, 1001, "carol").unwrap().is_none());
    let entries = round_store::load_account_entries(&h.store, "carol", None, None, 10)
        .unwrap()
        .0;
    assert_eq!(entries.len(), 1);
}

#[tokio::test]
async fn test_stake_bounds_enforced() {
    let h = harness(slow_rules());
    h.wallet.deposit("dave", 100_000).await.unwrap();

    assert!(matches!(
        place_bet(&h.engine, "dave", "Dave", 4, 5).await.unwrap_err(),
        EngineError::InvalidInput(_)
    ));
    assert!(matches!(
        place_bet(&h.engine, "dave", "Dave", 4, 50_001).await.unwrap_err(),
        EngineError::InvalidInput(_)
    ));
    assert!(matches!(
        place_bet(&h.engine, "dave", "Dave", 10, 50).await.unwrap_err(),
        EngineError::InvalidInput(_)
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_duplicates_admit_exactly_one() {
    let h = harness(slow_rules());
    h.wallet.deposit("eve", 100_000).await.unwrap();

    let mut handles = Vec::new();
    for i in 0..1_000u64 {
        let engine = h.engine.clone();
        handles.push(tokio::spawn(async move {
            place_bet(&engine, "eve", "Eve", (i % 10) as u8, 100).await
        }));
    }

    let mut admitted = 0;
    let mut duplicates = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => admitted += 1,
            Err(EngineError::DuplicateBet) => duplicates += 1,
            Err(e) => panic!("unexpected rejection: {}", e),
        }
    }
    assert_eq!(admitted, 1);
    assert_eq!(duplicates, 999);

    // Exactly one debit happened.
    assert_eq!(h.ledger.balance("eve").await.unwrap(), 99_900);
    let bets = round_store::load_round_bets(&h.store, 1001).unwrap();
    assert_eq!(bets.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_many_accounts_settle_conserves_money() {
    let h = harness(slow_rules());
    h.engine.set_override(4).await.unwrap();

    let accounts: Vec<String> = (0..20).map(|i| format!("player-{}", i)).collect();
    for account in &accounts {
        h.wallet.deposit(account, 1_000).await.unwrap();
    }

    let mut handles = Vec::new();
    for (i, account) in accounts.iter().enumerate() {
        let engine = h.engine.clone();
        let account = account.clone();
        let digit = (i % 10) as u8;
        handles.push(tokio::spawn(async move {
            place_bet(&engine, &account, &account, digit, 100).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let settled = h.settlement.settle(1001).await.unwrap();
    assert_eq!(settled.total_bets, 20);
    assert_eq!(settled.total_staked, 2_000);
    // Digits cycle 0..9 twice, so exactly two accounts hit the override.
    assert_eq!(settled.winners_count, 2);
    assert_eq!(settled.total_paid_out, 800);

    let mut total: i64 = 0;
    for account in &accounts {
        total += h.ledger.balance(account).await.unwrap() as i64;
    }
    // 20_000 deposited, 2_000 staked, 800 paid out.
    assert_eq!(total, 20_000 - 2_000 + 800);
}

#[tokio::test]
async fn test_settlement_survives_repeat_calls() {
    let h = harness(slow_rules());
    h.wallet.deposit("frank", 500).await.unwrap();
    h.engine.set_override(9).await.unwrap();
    place_bet(&h.engine, "frank", "Frank", 9, 100).await.unwrap();

    let first = h.settlement.settle(1001).await.unwrap();
    let second = h.settlement.settle(1001).await.unwrap();
    let third = h.settlement.settle(1001).await.unwrap();

    assert_eq!(first.total_paid_out, second.total_paid_out);
    assert_eq!(second.total_paid_out, third.total_paid_out);
    assert_eq!(h.ledger.balance("frank").await.unwrap(), 800);

    let entries = round_store::load_account_entries(&h.store, "frank", None, None, 10)
        .unwrap()
        .0;
    assert_eq!(entries.len(), 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_bets_rejected_once_window_closes() {
    let rules = GameConfig {
        betting_window_secs: 1,
        resolving_secs: 30,
        ..GameConfig::default()
    };
    let h = harness(rules);
    h.wallet.deposit("grace", 1_000).await.unwrap();

    tokio::spawn(h.engine.clone().run());
    tokio::time::sleep(Duration::from_millis(1_500)).await;

    let err = place_bet(&h.engine, "grace", "Grace", 1, 50).await.unwrap_err();
    assert!(matches!(err, EngineError::RoundClosed));
    assert_eq!(h.ledger.balance("grace").await.unwrap(), 1_000);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_rounds_advance_without_skipping_periods() {
    let rules = GameConfig {
        betting_window_secs: 1,
        resolving_secs: 0,
        settled_pause_ms: 50,
        ..GameConfig::default()
    };
    let h = harness(rules);

    let mut feed = h.events.subscribe();
    tokio::spawn(h.engine.clone().run());
    tokio::time::sleep(Duration::from_millis(3_500)).await;

    let (round, _, _) = h.engine.snapshot().await;
    assert!(round.period_number > 1001);

    // Every period between the first and the current one settled in order.
    for period in 1001..round.period_number {
        let settled = round_store::load_round(&h.store, period).unwrap().unwrap();
        assert_eq!(settled.phase, RoundPhase::Settled);
        assert!(settled.winning_digit.is_some());
    }

    // The event feed saw at least one full transition cycle.
    let mut saw_resolving = false;
    let mut saw_settled = false;
    let mut saw_opened = false;
    while let Ok(event) = feed.try_recv() {
        match serde_json::to_value(&event).unwrap()["type"].as_str() {
            Some("round_resolving") => saw_resolving = true,
            Some("round_settled") => saw_settled = true,
            Some("round_opened") => saw_opened = true,
            _ => {}
        }
    }
    assert!(saw_resolving && saw_settled && saw_opened);
}

#[tokio::test]
async fn test_recovery_resumes_open_round_with_bets() {
    let dir = TempDir::new().unwrap();
    {
        let store = Store::open(dir.path()).unwrap();
        let events = EventBus::new(64);
        let ledger = Arc::new(WalletLedger::new(store.clone()));
        let wallet = WalletService::new(store.clone(), ledger.clone(), WalletConfig::default());
        let engine = Arc::new(
            RoundEngine::bootstrap(store, ledger, events, slow_rules()).unwrap(),
        );
        wallet.deposit("henry", 500).await.unwrap();
        place_bet(&engine, "henry", "Henry", 6, 200).await.unwrap();
    }

    // Fresh process over the same database.
    let store = Store::open(dir.path()).unwrap();
    let events = EventBus::new(64);
    let ledger = Arc::new(WalletLedger::new(store.clone()));
    let engine = Arc::new(
        RoundEngine::bootstrap(store.clone(), ledger.clone(), events.clone(), slow_rules())
            .unwrap(),
    );

    let (round, live_bets, live_staked) = engine.snapshot().await;
    assert_eq!(round.period_number, 1001);
    assert_eq!(round.phase, RoundPhase::Open);
    assert_eq!(live_bets, 1);
    assert_eq!(live_staked, 200);

    // The recovered round still settles the pre-crash bet.
    let settlement = SettlementEngine::new(store, ledger.clone(), events);
    let settled = settlement.settle(1001).await.unwrap();
    assert_eq!(settled.total_bets, 1);
    let expected = if settled.winning_digit == Some(6) { 1100 } else { 300 };
    assert_eq!(ledger.balance("henry").await.unwrap(), expected);
}

#[tokio::test]
async fn test_duplicate_sequential_bet_rejected() {
    let h = harness(slow_rules());
    h.wallet.deposit("iris", 1_000).await.unwrap();

    place_bet(&h.engine, "iris", "Iris", 8, 100).await.unwrap();
    let err = place_bet(&h.engine, "iris", "Iris", 2, 100).await.unwrap_err();
    assert!(matches!(err, EngineError::DuplicateBet));
    assert_eq!(h.ledger.balance("iris").await.unwrap(), 900);
}
