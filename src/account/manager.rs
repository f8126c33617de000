//! Account lifecycle and active-account selection
//!
//! `AccountManager` is the single owner of the account cache. It keeps the
//! credential store, the ordered account list and the active account in
//! agreement, and fans refresh results out to subscribers.

use chrono::Utc;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use super::keychain::{CredentialStore, Keystore, UnlockedAccount};
use super::store::AccountStore;
use crate::config::WalletConfig;
use crate::error::WalletError;
use crate::events::{EventHub, SyncMarker, WalletEvent};
use crate::network::NetworkClient;
use crate::scheduler::Scheduler;
use crate::storage::KeyValueStore;
use crate::types::{Address, BlockTag, NetworkId};
use crate::Result;

pub struct AccountManager {
    wallet_key: String,
    keystore_password: String,
    keychain_refresh: Duration,
    store: Arc<AccountStore>,
    credentials: Arc<dyn CredentialStore>,
    keystore: Arc<dyn Keystore>,
    client: Arc<dyn NetworkClient>,
    events: EventHub,
    keystore_json: RwLock<HashMap<Address, String>>,
    unlocked: RwLock<HashMap<Address, UnlockedAccount>>,
    active: RwLock<Option<Address>>,
    foreground_started: AtomicBool,
}

impl AccountManager {
    /// Load cached state for `config.wallet_key` and reconcile it with the credential store
    pub fn new(
        config: &WalletConfig,
        store: Arc<dyn KeyValueStore>,
        credentials: Arc<dyn CredentialStore>,
        keystore: Arc<dyn Keystore>,
        client: Arc<dyn NetworkClient>,
    ) -> Self {
        let events = EventHub::new();
        let account_store = Arc::new(AccountStore::new(store, events.clone()));
        account_store.load();

        let active = account_store
            .stored_active_account()
            .or_else(|| account_store.first());

        let manager = Self {
            wallet_key: config.wallet_key.clone(),
            keystore_password: config.keystore_password.clone(),
            keychain_refresh: Duration::from_secs(config.keychain_refresh_secs),
            store: account_store,
            credentials,
            keystore,
            client,
            events,
            keystore_json: RwLock::new(HashMap::new()),
            unlocked: RwLock::new(HashMap::new()),
            active: RwLock::new(active),
            foreground_started: AtomicBool::new(false),
        };

        manager.refresh_keychain_values();
        manager
    }

    pub fn store(&self) -> &Arc<AccountStore> {
        &self.store
    }

    pub fn client(&self) -> &Arc<dyn NetworkClient> {
        &self.client
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WalletEvent> {
        self.events.subscribe()
    }

    pub fn accounts(&self) -> Vec<Address> {
        self.store.addresses()
    }

    pub fn number_of_accounts(&self) -> usize {
        self.store.len()
    }

    pub fn active_account(&self) -> Option<Address> {
        *self.active.read()
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Register an account whose keystore JSON is already encrypted
    pub fn add_account(&self, address: Address, keystore_json: String) -> Result<()> {
        if self.store.contains(&address) {
            return Err(WalletError::AccountExists(address));
        }

        let nickname = self.store.nickname(&address);
        self.credentials
            .add(&self.wallet_key, &address, &nickname, &keystore_json)?;
        self.store.set_nickname(&address, &nickname)?;
        self.keystore_json.write().insert(address, keystore_json);
        self.store.insert_account(address)?;
        self.refresh_active_account()?;

        log::info!("Added account {}", address);
        self.events.publish(WalletEvent::AddedAccount { address });
        Ok(())
    }

    pub fn remove_account(&self, address: &Address) -> Result<()> {
        if !self.store.contains(address) {
            return Err(WalletError::AccountNotFound(*address));
        }

        self.credentials.remove(&self.wallet_key, address)?;
        self.unlocked.write().remove(address);
        self.keystore_json.write().remove(address);
        self.store.purge_account(address)?;
        self.repair_active_account(false)?;

        log::info!("Removed account {}", address);
        self.events.publish(WalletEvent::RemovedAccount { address: *address });
        self.events.publish(WalletEvent::ChangedActiveAccount {
            address: self.active_account(),
        });
        Ok(())
    }

    /// Generate, encrypt and register a fresh account
    pub async fn create_account(&self) -> Result<UnlockedAccount> {
        let account = self.keystore.generate().await?;
        let json = self
            .keystore
            .encrypt(&account, &self.keystore_password)
            .await?;

        self.unlocked.write().insert(account.address, account.clone());
        self.add_account(account.address, json)?;
        Ok(account)
    }

    /// Decrypt the keystore of `address`. Failures are logged and yield `None`.
    pub async fn unlock_account(&self, address: &Address) -> Option<UnlockedAccount> {
        let json = match self.keystore_json_for(address) {
            Some(json) => json,
            None => {
                log::error!("Missing keystore JSON for {}", address);
                return None;
            }
        };

        match self.keystore.decrypt(&json, &self.keystore_password).await {
            Ok(account) => {
                self.unlocked.write().insert(*address, account.clone());
                Some(account)
            }
            Err(e) => {
                log::error!("Unlock failed for {}: {}", address, e);
                None
            }
        }
    }

    /// Previously unlocked or created handle, if any
    pub fn unlocked_account(&self, address: &Address) -> Option<UnlockedAccount> {
        self.unlocked.read().get(address).cloned()
    }

    fn keystore_json_for(&self, address: &Address) -> Option<String> {
        if let Some(json) = self.keystore_json.read().get(address) {
            return Some(json.clone());
        }
        let json = self.credentials.get(&self.wallet_key, address)?;
        self.keystore_json.write().insert(*address, json.clone());
        Some(json)
    }

    pub fn reorder_accounts(&self, order: Vec<Address>) -> Result<()> {
        self.store.reorder(order)
    }

    pub fn record_proxy_address(&self, address: &Address, proxy: &Address) -> Result<()> {
        if self.store.set_proxy_address(address, proxy)? {
            log::info!("Identity proxy for {} is {}", address, proxy);
        }
        Ok(())
    }

    pub fn proxy_address(&self, address: &Address) -> Option<Address> {
        self.store.proxy_address(address)
    }

    // ========================================================================
    // Active account
    // ========================================================================

    pub fn set_active_account(&self, address: Address) -> Result<()> {
        if self.active_account() == Some(address) {
            return Ok(());
        }
        if !address.is_zero() && !self.store.contains(&address) {
            return Err(WalletError::AccountNotFound(address));
        }
        self.update_active(Some(address), true)
    }

    /// Reset the active account to the first entry when it is unset, zero or unknown
    pub fn refresh_active_account(&self) -> Result<()> {
        self.repair_active_account(true).map(|_| ())
    }

    fn repair_active_account(&self, notify: bool) -> Result<bool> {
        let current = self.active_account();
        if let Some(address) = current {
            if !address.is_zero() && self.store.contains(&address) {
                return Ok(false);
            }
        }

        let fallback = self.store.first();
        if fallback == current {
            return Ok(false);
        }
        self.update_active(fallback, notify)?;
        Ok(true)
    }

    fn update_active(&self, address: Option<Address>, notify: bool) -> Result<()> {
        *self.active.write() = address;
        self.store.save_active_account(address.as_ref())?;
        if notify {
            self.events
                .publish(WalletEvent::ChangedActiveAccount { address });
        }
        Ok(())
    }

    // ========================================================================
    // Credential store resync
    // ========================================================================

    /// Admit credential entries that are not known locally and apply nickname edits.
    /// Entries whose JSON is missing, malformed or for another address are skipped.
    pub fn refresh_keychain_values(&self) {
        let nicknames = self.credentials.nicknames(&self.wallet_key);

        for (address, nickname) in nicknames {
            let known = self.keystore_json.read().contains_key(&address);
            if !known {
                let json = match self.credentials.get(&self.wallet_key, &address) {
                    Some(json) => json,
                    None => {
                        log::warn!("Keychain resync: missing JSON for {}", address);
                        continue;
                    }
                };

                if !keystore_matches(&json, &address) {
                    log::warn!("Keychain resync: keystore does not match {}", address);
                    continue;
                }

                self.keystore_json.write().insert(address, json);
                if !self.store.contains(&address) {
                    if let Err(e) = self.store.insert_account(address) {
                        log::warn!("Keychain resync: could not admit {}: {}", address, e);
                        continue;
                    }
                    self.events.publish(WalletEvent::AddedAccount { address });
                }
            }

            if nickname != self.store.nickname(&address) {
                if let Err(e) = self.store.set_nickname(&address, &nickname) {
                    log::warn!("Keychain resync: nickname for {}: {}", address, e);
                }
            }
        }

        if let Err(e) = self.refresh_active_account() {
            log::warn!("Keychain resync: active account: {}", e);
        }
    }

    /// Start the periodic keychain resync on the first foreground activation.
    ///
    /// Returns `false` when the timer was already running or no Tokio
    /// runtime is available to run it.
    pub fn notify_foreground(self: &Arc<Self>, scheduler: &dyn Scheduler) -> bool {
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                log::warn!("Keychain resync not started: {}", e);
                return false;
            }
        };
        if self.foreground_started.swap(true, Ordering::SeqCst) {
            return false;
        }

        log::debug!("Starting keychain resync every {:?}", self.keychain_refresh);
        let mut ticker = scheduler.ticker(self.keychain_refresh);
        let manager = Arc::downgrade(self);
        runtime.spawn(async move {
            loop {
                ticker.tick().await;
                match manager.upgrade() {
                    Some(manager) => manager.refresh_keychain_values(),
                    None => break,
                }
            }
        });
        true
    }

    // ========================================================================
    // Network refresh
    // ========================================================================

    /// Query balance, nonce, gas price and block number for every account.
    ///
    /// `callback(true)` runs before any query is issued. Each result is applied
    /// as soon as it arrives; subscribers learn about new data from events.
    /// Outside a Tokio runtime nothing is queried and `callback(false)` runs.
    pub fn refresh<F>(self: &Arc<Self>, network: NetworkId, callback: F) -> Vec<JoinHandle<()>>
    where
        F: FnOnce(bool),
    {
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                log::warn!("Refresh skipped: {}", e);
                callback(false);
                return Vec::new();
            }
        };
        log::debug!("Refreshing {} accounts on network {}", self.store.len(), network);
        let addresses = self.store.addresses();
        callback(true);

        addresses
            .into_iter()
            .map(|address| {
                let manager = Arc::clone(self);
                runtime.spawn(async move { manager.refresh_account(network, address).await })
            })
            .collect()
    }

    async fn refresh_account(&self, network: NetworkId, address: Address) {
        let balance = async {
            match self
                .client
                .get_balance(network, &address, BlockTag::Pending)
                .await
            {
                Ok(balance) => {
                    self.mark_synced();
                    if let Err(e) = self.store.set_balance(&address, balance) {
                        log::warn!("Storing balance for {}: {}", address, e);
                    }
                }
                Err(e) => log::warn!("getBalance {} failed: {}", address, e),
            }
        };

        let nonce = async {
            match self
                .client
                .get_transaction_count(network, &address, BlockTag::Pending)
                .await
            {
                Ok(nonce) => {
                    self.mark_synced();
                    if let Err(e) = self.store.set_nonce(&address, nonce) {
                        log::warn!("Storing nonce for {}: {}", address, e);
                    }
                }
                Err(e) => log::warn!("getTransactionCount {} failed: {}", address, e),
            }
        };

        let gas_price = async {
            match self.client.get_gas_price(network).await {
                Ok(price) => {
                    if let Err(e) = self.store.set_gas_price(network, price) {
                        log::warn!("Storing gas price: {}", e);
                    }
                }
                Err(e) => log::warn!("getGasPrice failed: {}", e),
            }
        };

        let block_number = async {
            match self.client.get_block_number(network).await {
                Ok(block) => self.apply_block_number(network, block),
                Err(e) => log::warn!("getBlockNumber failed: {}", e),
            }
        };

        futures::join!(balance, nonce, gas_price, block_number);
    }

    fn mark_synced(&self) {
        if let Err(e) = self.store.set_sync_date(Utc::now()) {
            log::warn!("Storing sync date: {}", e);
        }
    }

    fn apply_block_number(&self, network: NetworkId, block: u64) {
        if let Err(e) = self.store.set_block_number(network, block) {
            log::warn!("Storing block number: {}", e);
            return;
        }

        if let Some(active) = self.active_account() {
            if !self.store.cached_transactions(&active).is_empty() {
                self.events.publish(WalletEvent::DidSync(SyncMarker::Block {
                    address: active,
                    highest_block_number: self.store.tx_block(&active),
                }));
            }
        }
    }
}

/// The keystore JSON must name the address it is stored under
fn keystore_matches(json: &str, address: &Address) -> bool {
    let parsed: serde_json::Value = match serde_json::from_str(json) {
        Ok(value) => value,
        Err(_) => return false,
    };
    parsed
        .get("address")
        .and_then(|v| v.as_str())
        .and_then(|s| Address::from_str(s).ok())
        .map(|embedded| embedded == *address)
        .unwrap_or(false)
}
