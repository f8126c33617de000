//! AccountManager Integration Tests
//!
//! Exercises the account lifecycle against in-process fakes:
//! - credential store, ordered list and caches stay in agreement
//! - active account fallback after removals and restarts
//! - keychain resync (admission, nickname edits, mismatched entries)
//! - network refresh fan-out and sync events
//!
//! Run with: cargo test --test account_manager_test -- --nocapture

mod common;

use common::*;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use xclaim_wallet::account::store::DEFAULT_NICKNAME;
use xclaim_wallet::events::drain;
use xclaim_wallet::{
    CredentialStore, ManualScheduler, SyncMarker, TransactionInfo, TxHash, WalletError, WalletEvent, U256,
};

fn as_set(addresses: Vec<xclaim_wallet::Address>) -> HashSet<xclaim_wallet::Address> {
    addresses.into_iter().collect()
}

fn assert_in_agreement(env: &TestEnvironment) {
    let listed = as_set(env.manager.accounts());
    let cached = env.manager.store().cached_addresses();
    let credentials: HashSet<_> = env.credentials.nicknames(WALLET_KEY).into_keys().collect();

    assert_eq!(listed, cached, "ordered list and transaction cache differ");
    assert_eq!(listed, credentials, "ordered list and credential store differ");
    assert_eq!(env.manager.accounts().len(), listed.len(), "duplicate entries in order");
}

// ============================================================================
// Lifecycle
// ============================================================================

#[tokio::test]
async fn test_add_and_remove_keep_sets_in_agreement() {
    let env = TestEnvironment::new();

    for n in 1..=4 {
        env.add_account(address(n));
        assert_in_agreement(&env);
    }
    assert_eq!(env.manager.number_of_accounts(), 4);

    env.manager.remove_account(&address(2)).unwrap();
    assert_in_agreement(&env);

    let account = env.manager.create_account().await.unwrap();
    assert_in_agreement(&env);
    assert!(env.manager.accounts().contains(&account.address));

    env.manager.remove_account(&address(4)).unwrap();
    env.manager.remove_account(&account.address).unwrap();
    assert_in_agreement(&env);

    assert_eq!(env.manager.accounts(), vec![address(1), address(3)]);
}

#[tokio::test]
async fn test_duplicate_add_and_unknown_remove_are_rejected() {
    let env = TestEnvironment::new();
    env.add_account(address(1));

    let err = env
        .manager
        .add_account(address(1), keystore_json(&address(1), PASSWORD))
        .unwrap_err();
    assert!(matches!(err, WalletError::AccountExists(a) if a == address(1)));

    let err = env.manager.remove_account(&address(9)).unwrap_err();
    assert!(matches!(err, WalletError::AccountNotFound(a) if a == address(9)));

    assert_eq!(env.manager.number_of_accounts(), 1);
    assert_in_agreement(&env);
}

#[tokio::test]
async fn test_new_account_gets_default_nickname() {
    let env = TestEnvironment::new();
    env.add_account(address(1));

    assert_eq!(env.manager.store().nickname(&address(1)), DEFAULT_NICKNAME);
    assert_eq!(
        env.credentials.nicknames(WALLET_KEY).get(&address(1)).map(String::as_str),
        Some(DEFAULT_NICKNAME)
    );
}

#[tokio::test]
async fn test_removing_an_account_clears_its_keys() {
    let env = TestEnvironment::new();
    env.add_account(address(1));

    let store = env.manager.store();
    store.set_balance(&address(1), U256::from(5)).unwrap();
    store.set_nonce(&address(1), 3).unwrap();
    store
        .merge_transactions(&address(1), &[TransactionInfo::new(TxHash::from_low_u64_be(1), 10, 7)])
        .unwrap();

    env.manager.remove_account(&address(1)).unwrap();

    assert_eq!(store.balance(&address(1)), U256::zero());
    assert_eq!(store.nonce(&address(1)), 0);
    assert!(store.transactions_for_address(&address(1)).is_empty());
    assert!(env.credentials.get(WALLET_KEY, &address(1)).is_none());
}

// ============================================================================
// Active account
// ============================================================================

#[tokio::test]
async fn test_active_account_follows_first_entry() {
    let env = TestEnvironment::new();
    assert_eq!(env.manager.active_account(), None);

    env.add_account(address(1));
    env.add_account(address(2));
    env.add_account(address(3));
    assert_eq!(env.manager.active_account(), Some(address(1)));

    env.manager.set_active_account(address(3)).unwrap();
    assert_eq!(env.manager.active_account(), Some(address(3)));

    let mut events = env.manager.subscribe();
    env.manager.remove_account(&address(3)).unwrap();
    assert_eq!(env.manager.active_account(), Some(address(1)));

    let events = drain(&mut events);
    assert!(events.contains(&WalletEvent::RemovedAccount { address: address(3) }));
    assert_eq!(
        events.last(),
        Some(&WalletEvent::ChangedActiveAccount {
            address: Some(address(1))
        })
    );

    env.manager.remove_account(&address(1)).unwrap();
    env.manager.remove_account(&address(2)).unwrap();
    assert_eq!(env.manager.active_account(), None);
}

#[tokio::test]
async fn test_set_active_account_rejects_strangers() {
    let env = TestEnvironment::new();
    env.add_account(address(1));

    let err = env.manager.set_active_account(address(7)).unwrap_err();
    assert!(matches!(err, WalletError::AccountNotFound(_)));
    assert_eq!(env.manager.active_account(), Some(address(1)));
}

#[tokio::test]
async fn test_state_survives_restart() {
    let env = TestEnvironment::new();
    env.add_account(address(1));
    env.add_account(address(2));
    env.manager.set_active_account(address(2)).unwrap();
    env.manager.reorder_accounts(vec![address(2), address(1)]).unwrap();
    env.manager.store().set_nickname(&address(1), "Savings").unwrap();

    let restarted = TestEnvironment::with_parts(test_config(), env.store.clone(), env.credentials.clone());

    assert_eq!(restarted.manager.accounts(), vec![address(2), address(1)]);
    assert_eq!(restarted.manager.active_account(), Some(address(2)));
    assert_in_agreement(&restarted);
}

#[tokio::test]
async fn test_reorder_emits_event_and_rejects_non_permutations() {
    let env = TestEnvironment::new();
    env.add_account(address(1));
    env.add_account(address(2));
    let mut events = env.manager.subscribe();

    env.manager.reorder_accounts(vec![address(2), address(1)]).unwrap();
    assert_eq!(drain(&mut events), vec![WalletEvent::ReorderedAccounts]);

    let err = env
        .manager
        .reorder_accounts(vec![address(2), address(3)])
        .unwrap_err();
    assert!(matches!(err, WalletError::InvalidOrder(_)));
    assert_eq!(env.manager.accounts(), vec![address(2), address(1)]);
}

// ============================================================================
// Unlock
// ============================================================================

#[tokio::test]
async fn test_unlock_uses_configured_password() {
    let env = TestEnvironment::new();
    env.add_account(address(1));
    env.manager
        .add_account(address(2), keystore_json(&address(2), "other password"))
        .unwrap();

    let unlocked = env.manager.unlock_account(&address(1)).await.unwrap();
    assert_eq!(unlocked.address, address(1));
    assert!(env.manager.unlocked_account(&address(1)).is_some());

    assert!(env.manager.unlock_account(&address(2)).await.is_none());
    assert!(env.manager.unlocked_account(&address(2)).is_none());

    assert!(env.manager.unlock_account(&address(9)).await.is_none());
}

// ============================================================================
// Keychain resync
// ============================================================================

#[tokio::test]
async fn test_keychain_resync_admits_valid_entries_only() {
    let env = TestEnvironment::new();
    env.add_account(address(1));

    env.credentials
        .add(WALLET_KEY, &address(2), "Imported", &keystore_json(&address(2), PASSWORD))
        .unwrap();
    // Stored under 3 but the keystore belongs to 4
    env.credentials
        .add(WALLET_KEY, &address(3), "Bogus", &keystore_json(&address(4), PASSWORD))
        .unwrap();
    env.credentials
        .add(WALLET_KEY, &address(5), "Garbage", "not json")
        .unwrap();
    env.credentials
        .add("another.wallet", &address(6), "Elsewhere", &keystore_json(&address(6), PASSWORD))
        .unwrap();

    let mut events = env.manager.subscribe();
    env.manager.refresh_keychain_values();

    assert_eq!(env.manager.accounts(), vec![address(1), address(2)]);
    assert_eq!(env.manager.store().nickname(&address(2)), "Imported");
    assert!(drain(&mut events).contains(&WalletEvent::AddedAccount { address: address(2) }));
}

#[tokio::test]
async fn test_keychain_resync_applies_nickname_edits() {
    let env = TestEnvironment::new();
    env.add_account(address(1));

    env.credentials
        .add(WALLET_KEY, &address(1), "Renamed", &keystore_json(&address(1), PASSWORD))
        .unwrap();

    let mut events = env.manager.subscribe();
    env.manager.refresh_keychain_values();
    env.manager.refresh_keychain_values();

    assert_eq!(env.manager.store().nickname(&address(1)), "Renamed");
    let renames: Vec<_> = drain(&mut events)
        .into_iter()
        .filter(|e| matches!(e, WalletEvent::ChangedNickname { .. }))
        .collect();
    assert_eq!(renames.len(), 1);
}

#[tokio::test]
async fn test_foreground_timer_starts_once_and_resyncs() {
    let env = TestEnvironment::new();
    let scheduler = ManualScheduler::new();

    assert!(env.manager.notify_foreground(&scheduler));
    assert!(!env.manager.notify_foreground(&scheduler));
    assert_eq!(scheduler.ticker_count(), 1);

    env.credentials
        .add(WALLET_KEY, &address(8), "Synced", &keystore_json(&address(8), PASSWORD))
        .unwrap();
    assert!(env.manager.accounts().is_empty());

    scheduler.advance();
    let manager = env.manager.clone();
    wait_until(|| manager.accounts().contains(&address(8))).await;
    assert_eq!(env.manager.active_account(), Some(address(8)));
}

#[test]
fn test_timers_need_a_runtime() {
    let env = TestEnvironment::new();
    env.add_account(address(1));
    let scheduler = ManualScheduler::new();

    assert!(!env.manager.notify_foreground(&scheduler));
    assert_eq!(scheduler.ticker_count(), 0);

    let mut reported = None;
    let handles = env.manager.refresh(NETWORK, |ok| reported = Some(ok));
    assert!(handles.is_empty());
    assert_eq!(reported, Some(false));
    assert_eq!(env.network.call_count("eth_getBalance"), 0);
}

// ============================================================================
// Network refresh
// ============================================================================

#[tokio::test]
async fn test_refresh_applies_results_and_calls_back_first() {
    let env = TestEnvironment::new();
    env.add_account(address(1));
    env.add_account(address(2));
    env.network.balances.lock().insert(address(1), U256::from(1_000u64));
    env.network.tx_counts.lock().insert(address(2), 9);

    let mut events = env.manager.subscribe();
    let called_before_queries = Arc::new(AtomicBool::new(false));
    let flag = called_before_queries.clone();
    let network = env.network.clone();

    let handles = env.manager.refresh(NETWORK, move |ok| {
        assert!(ok);
        flag.store(network.calls.lock().is_empty(), Ordering::SeqCst);
    });
    assert!(called_before_queries.load(Ordering::SeqCst));

    futures::future::join_all(handles).await;

    let store = env.manager.store();
    assert_eq!(store.balance(&address(1)), U256::from(1_000u64));
    assert_eq!(store.nonce(&address(2)), 9);
    assert_eq!(store.block_number(NETWORK), 100);
    assert_eq!(store.gas_price(NETWORK), U256::from(20_000_000_000u64));
    assert!(store.sync_date().is_some());

    let events = drain(&mut events);
    assert!(events.contains(&WalletEvent::BalanceChanged {
        address: address(1),
        balance: U256::from(1_000u64),
    }));
    assert!(events
        .iter()
        .any(|e| matches!(e, WalletEvent::DidSync(SyncMarker::Date(_)))));
    assert_eq!(env.network.call_count("eth_getBalance"), 2);
}

#[tokio::test]
async fn test_refresh_failure_leaves_other_values_applied() {
    let env = TestEnvironment::new();
    env.add_account(address(1));
    env.network.fail_balance.store(true, Ordering::SeqCst);
    env.network.tx_counts.lock().insert(address(1), 4);

    let handles = env.manager.refresh(NETWORK, |_| {});
    futures::future::join_all(handles).await;

    let store = env.manager.store();
    assert_eq!(store.balance(&address(1)), U256::zero());
    assert_eq!(store.nonce(&address(1)), 4);
    assert_eq!(store.block_number(NETWORK), 100);
}

#[tokio::test]
async fn test_block_sync_event_needs_active_history() {
    let env = TestEnvironment::new();
    env.add_account(address(1));

    let mut events = env.manager.subscribe();
    futures::future::join_all(env.manager.refresh(NETWORK, |_| {})).await;
    assert!(!drain(&mut events)
        .iter()
        .any(|e| matches!(e, WalletEvent::DidSync(SyncMarker::Block { .. }))));

    env.manager
        .store()
        .merge_transactions(&address(1), &[TransactionInfo::new(TxHash::from_low_u64_be(3), 50, 42)])
        .unwrap();
    env.manager.store().set_tx_block(&address(1), 42).unwrap();
    env.network.block_number.store(101, Ordering::SeqCst);

    futures::future::join_all(env.manager.refresh(NETWORK, |_| {})).await;
    assert!(drain(&mut events).contains(&WalletEvent::DidSync(SyncMarker::Block {
        address: address(1),
        highest_block_number: 42,
    })));
}
