//! Account state cache
//!
//! Owns the ordered account list and the per-address transaction lists in
//! memory, mirrors everything into the persistent keyed store and publishes
//! a [`WalletEvent`] for every change. Setters follow a write-if-changed
//! discipline: repeating a write with the same value is a silent no-op.

use chrono::{DateTime, TimeZone, Utc};
use parking_lot::RwLock;
use primitive_types::U256;
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use std::sync::Arc;

use crate::error::WalletError;
use crate::events::{EventHub, SyncMarker, WalletEvent};
use crate::storage::{keys, KeyValueStore, StoreExt};
use crate::types::{parse_u256, u256_to_hex, Address, NetworkId, TransactionInfo};
use crate::Result;

pub const DEFAULT_NICKNAME: &str = "XClaim";

/// Gas price assumed before the first network sync (18 gwei)
pub const DEFAULT_GAS_PRICE_WEI: u64 = 18_000_000_000;

/// Confirmations after which a transaction is considered final
pub const CONFIRMED_COUNT: u64 = 12;

/// Cached network-wide values for one network
#[derive(Clone, Debug, PartialEq)]
pub struct NetworkSnapshot {
    pub network: NetworkId,
    pub gas_price: U256,
    pub block_number: u64,
    pub sync_date: Option<DateTime<Utc>>,
    pub quote_price: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransactionStatus {
    Pending,
    InProgress { confirmations: u64 },
    Confirmed,
}

impl TransactionStatus {
    pub fn classify(transaction: &TransactionInfo, latest_block: u64) -> Self {
        if transaction.is_pending() {
            return TransactionStatus::Pending;
        }
        let confirmations = (latest_block as i64 - transaction.block_number + 1).max(0) as u64;
        if confirmations < CONFIRMED_COUNT {
            TransactionStatus::InProgress { confirmations }
        } else {
            TransactionStatus::Confirmed
        }
    }
}

/// Transactions of one account split by confirmation status
#[derive(Clone, Debug, Default)]
pub struct TransactionGroups {
    pub pending: Vec<TransactionInfo>,
    pub in_progress: Vec<(TransactionInfo, u64)>,
    pub confirmed: Vec<TransactionInfo>,
}

#[derive(Default)]
struct CacheState {
    order: Vec<Address>,
    transactions: HashMap<Address, Vec<TransactionInfo>>,
}

pub struct AccountStore {
    store: Arc<dyn KeyValueStore>,
    events: EventHub,
    state: RwLock<CacheState>,
}

impl AccountStore {
    pub fn new(store: Arc<dyn KeyValueStore>, events: EventHub) -> Self {
        Self {
            store,
            events,
            state: RwLock::new(CacheState::default()),
        }
    }

    /// Hydrate the ordered list and transaction caches from the keyed store
    pub fn load(&self) {
        let mut order = Vec::new();
        for value in self.store.get_array(keys::USER_ACCOUNTS) {
            let parsed = value.as_str().map(Address::from_str);
            match parsed {
                Some(Ok(address)) if !order.contains(&address) => order.push(address),
                Some(Ok(address)) => log::warn!("Duplicate account {} in stored order", address),
                _ => log::warn!("Skipping unparseable stored account: {}", value),
            }
        }

        let transactions = order
            .iter()
            .map(|address| (*address, self.transactions_for_address(address)))
            .collect();

        log::info!("Loaded {} accounts from store", order.len());

        let mut state = self.state.write();
        state.order = order;
        state.transactions = transactions;
    }

    pub fn events(&self) -> &EventHub {
        &self.events
    }

    // ========================================================================
    // Ordered list
    // ========================================================================

    pub fn addresses(&self) -> Vec<Address> {
        self.state.read().order.clone()
    }

    pub fn cached_addresses(&self) -> HashSet<Address> {
        self.state.read().transactions.keys().copied().collect()
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.state.read().order.contains(address)
    }

    pub fn len(&self) -> usize {
        self.state.read().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn first(&self) -> Option<Address> {
        self.state.read().order.first().copied()
    }

    /// Append a new account to the list and caches, then persist the order
    pub fn insert_account(&self, address: Address) -> Result<()> {
        let transactions = self.transactions_for_address(&address);
        {
            let mut state = self.state.write();
            if state.order.contains(&address) {
                return Err(WalletError::AccountExists(address));
            }
            state.order.push(address);
            state.transactions.insert(address, transactions);
        }
        self.save_order()
    }

    /// Remove an account from the list and caches and delete every derived key.
    /// Returns whether the account was present.
    pub fn purge_account(&self, address: &Address) -> Result<bool> {
        let present = {
            let mut state = self.state.write();
            state.transactions.remove(address);
            match state.order.iter().position(|a| a == address) {
                Some(index) => {
                    state.order.remove(index);
                    true
                }
                None => false,
            }
        };

        for prefix in keys::ACCOUNT_PREFIXES {
            self.store.remove(&keys::account_key(prefix, address))?;
        }
        self.save_order()?;
        Ok(present)
    }

    /// Replace the order with a permutation of the current one
    pub fn reorder(&self, new_order: Vec<Address>) -> Result<()> {
        {
            let mut state = self.state.write();
            let current: HashSet<_> = state.order.iter().collect();
            let proposed: HashSet<_> = new_order.iter().collect();
            if new_order.len() != state.order.len()
                || proposed.len() != new_order.len()
                || current != proposed
            {
                return Err(WalletError::InvalidOrder(format!(
                    "expected a permutation of {} accounts",
                    state.order.len()
                )));
            }
            if state.order == new_order {
                return Ok(());
            }
            state.order = new_order;
        }
        self.save_order()?;
        self.events.publish(WalletEvent::ReorderedAccounts);
        Ok(())
    }

    /// Persist the ordered list as checksummed strings
    pub fn save_order(&self) -> Result<()> {
        let addresses: Vec<Value> = self
            .state
            .read()
            .order
            .iter()
            .map(|a| Value::String(a.checksum()))
            .collect();
        self.store.set(keys::USER_ACCOUNTS, Value::Array(addresses))?;
        Ok(())
    }

    /// Active account as last persisted (may be the zero address)
    pub fn stored_active_account(&self) -> Option<Address> {
        self.store
            .get_string(keys::USER_ACTIVE_ACCOUNT)
            .and_then(|s| Address::from_str(&s).ok())
    }

    pub fn save_active_account(&self, address: Option<&Address>) -> Result<()> {
        match address {
            Some(address) => self
                .store
                .set(keys::USER_ACTIVE_ACCOUNT, Value::String(address.checksum()))?,
            None => self.store.remove(keys::USER_ACTIVE_ACCOUNT)?,
        }
        Ok(())
    }

    // ========================================================================
    // Per-account attributes
    // ========================================================================

    pub fn balance(&self, address: &Address) -> U256 {
        self.store
            .get_string(&keys::balance(address))
            .and_then(|hex| parse_u256(&hex).ok())
            .unwrap_or_default()
    }

    pub fn set_balance(&self, address: &Address, balance: U256) -> Result<bool> {
        if self.balance(address) == balance {
            return Ok(false);
        }
        self.store
            .set(&keys::balance(address), Value::String(u256_to_hex(balance)))?;
        self.events.publish(WalletEvent::BalanceChanged {
            address: *address,
            balance,
        });
        Ok(true)
    }

    pub fn nonce(&self, address: &Address) -> u64 {
        self.store.get_u64(&keys::nonce(address)).unwrap_or(0)
    }

    pub fn set_nonce(&self, address: &Address, nonce: u64) -> Result<bool> {
        Ok(self.store.set_if_changed(&keys::nonce(address), Value::from(nonce))?)
    }

    pub fn nickname(&self, address: &Address) -> String {
        self.store
            .get_string(&keys::nickname(address))
            .unwrap_or_else(|| DEFAULT_NICKNAME.to_string())
    }

    pub fn set_nickname(&self, address: &Address, nickname: &str) -> Result<bool> {
        let changed = self
            .store
            .set_if_changed(&keys::nickname(address), Value::String(nickname.to_string()))?;
        if changed {
            self.events.publish(WalletEvent::ChangedNickname {
                address: *address,
                nickname: nickname.to_string(),
            });
        }
        Ok(changed)
    }

    /// Highest block with a recorded transaction, -1 when unknown
    pub fn tx_block(&self, address: &Address) -> i64 {
        self.store.get_i64(&keys::tx_block(address)).unwrap_or(-1)
    }

    pub fn set_tx_block(&self, address: &Address, block: i64) -> Result<bool> {
        Ok(self.store.set_if_changed(&keys::tx_block(address), Value::from(block))?)
    }

    pub fn proxy_address(&self, address: &Address) -> Option<Address> {
        self.store
            .get_string(&keys::proxy(address))
            .and_then(|s| Address::from_str(&s).ok())
    }

    pub fn set_proxy_address(&self, address: &Address, proxy: &Address) -> Result<bool> {
        Ok(self
            .store
            .set_if_changed(&keys::proxy(address), Value::String(proxy.checksum()))?)
    }

    // ========================================================================
    // Transactions
    // ========================================================================

    /// Persisted transactions of `address` in list order. Malformed records are skipped.
    pub fn transactions_for_address(&self, address: &Address) -> Vec<TransactionInfo> {
        let records = match self.store.get(&keys::transactions(address)) {
            Some(Value::Object(records)) => records,
            Some(other) => {
                log::warn!("Transaction map for {} is not an object: {}", address, other);
                return Vec::new();
            }
            None => return Vec::new(),
        };

        let mut transactions: Vec<TransactionInfo> = records
            .into_iter()
            .filter_map(|(hash, record)| match serde_json::from_value(record) {
                Ok(info) => Some(info),
                Err(e) => {
                    log::warn!("Bad transaction {} for {}: {}", hash, address, e);
                    None
                }
            })
            .collect();
        transactions.sort_by(TransactionInfo::list_order);
        transactions
    }

    /// In-memory transaction list, empty for unknown accounts
    pub fn cached_transactions(&self, address: &Address) -> Vec<TransactionInfo> {
        self.state
            .read()
            .transactions
            .get(address)
            .cloned()
            .unwrap_or_default()
    }

    /// Merge `incoming` into the persisted map by hash.
    ///
    /// Returns the highest block number among the account's transactions
    /// (-1 if none). Events are published only when a record is new or differs.
    pub fn merge_transactions(&self, address: &Address, incoming: &[TransactionInfo]) -> Result<i64> {
        if !self.contains(address) {
            return Err(WalletError::AccountNotFound(*address));
        }

        let key = keys::transactions(address);
        let mut records = match self.store.get(&key) {
            Some(Value::Object(records)) => records,
            _ => Map::new(),
        };

        let mut changed = Vec::new();
        for transaction in incoming {
            let hash = transaction.hash.to_hex();
            let previous = records
                .get(&hash)
                .and_then(|v| serde_json::from_value::<TransactionInfo>(v.clone()).ok());
            if previous.as_ref() == Some(transaction) {
                continue;
            }
            records.insert(hash, serde_json::to_value(transaction).map_err(crate::error::StorageError::from)?);
            changed.push(transaction.clone());
        }

        if !changed.is_empty() {
            self.store.set(&key, Value::Object(records))?;
            let refreshed = self.transactions_for_address(address);
            self.state.write().transactions.insert(*address, refreshed);
        }

        let highest_block_number = self
            .state
            .read()
            .transactions
            .get(address)
            .and_then(|list| list.iter().map(|t| t.block_number).max())
            .unwrap_or(-1);

        if !changed.is_empty() {
            log::debug!("{} transactions changed for {}", changed.len(), address);
            self.events.publish(WalletEvent::AccountTransactionsUpdated {
                address: *address,
                highest_block_number,
            });
            for transaction in changed {
                self.events.publish(WalletEvent::TransactionChanged {
                    address: *address,
                    transaction,
                });
            }
        }

        Ok(highest_block_number)
    }

    pub fn classify_transactions(&self, address: &Address, network: NetworkId) -> TransactionGroups {
        let latest = self.block_number(network);
        let mut groups = TransactionGroups::default();
        for transaction in self.cached_transactions(address) {
            match TransactionStatus::classify(&transaction, latest) {
                TransactionStatus::Pending => groups.pending.push(transaction),
                TransactionStatus::InProgress { confirmations } => {
                    groups.in_progress.push((transaction, confirmations))
                }
                TransactionStatus::Confirmed => groups.confirmed.push(transaction),
            }
        }
        groups
    }

    // ========================================================================
    // Network snapshot
    // ========================================================================

    pub fn gas_price(&self, network: NetworkId) -> U256 {
        self.store
            .get_string(&keys::gas_price(network))
            .and_then(|hex| parse_u256(&hex).ok())
            .unwrap_or_else(|| U256::from(DEFAULT_GAS_PRICE_WEI))
    }

    pub fn set_gas_price(&self, network: NetworkId, gas_price: U256) -> Result<bool> {
        Ok(self
            .store
            .set_if_changed(&keys::gas_price(network), Value::String(u256_to_hex(gas_price)))?)
    }

    pub fn block_number(&self, network: NetworkId) -> u64 {
        self.store.get_u64(&keys::block_number(network)).unwrap_or(0)
    }

    pub fn set_block_number(&self, network: NetworkId, block_number: u64) -> Result<bool> {
        Ok(self
            .store
            .set_if_changed(&keys::block_number(network), Value::from(block_number))?)
    }

    pub fn quote_price(&self, network: NetworkId) -> f64 {
        self.store.get_f64(&keys::ether_price(network)).unwrap_or(0.0)
    }

    pub fn set_quote_price(&self, network: NetworkId, price: f64) -> Result<bool> {
        Ok(self
            .store
            .set_if_changed(&keys::ether_price(network), Value::from(price))?)
    }

    pub fn sync_date(&self) -> Option<DateTime<Utc>> {
        self.store
            .get_i64(keys::NETWORK_SYNC_DATE)
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
    }

    pub fn set_sync_date(&self, at: DateTime<Utc>) -> Result<bool> {
        let secs = at.timestamp();
        let changed = self
            .store
            .set_if_changed(keys::NETWORK_SYNC_DATE, Value::from(secs))?;
        if changed {
            self.events.publish(WalletEvent::DidSync(SyncMarker::Date(secs)));
        }
        Ok(changed)
    }

    pub fn network_snapshot(&self, network: NetworkId) -> NetworkSnapshot {
        NetworkSnapshot {
            network,
            gas_price: self.gas_price(network),
            block_number: self.block_number(network),
            sync_date: self.sync_date(),
            quote_price: self.quote_price(network),
        }
    }
}
