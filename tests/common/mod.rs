//! Common test utilities for wallet integration tests
//!
//! This module provides shared test infrastructure including:
//! - In-process fakes for the network, keystore, ABI encoder and faucet
//! - Contract metadata for the identity contracts
//! - A fully wired `TestEnvironment`
#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use xclaim_wallet::account::{AccountManager, MemoryCredentialStore};
use xclaim_wallet::config::{NetworkInterface, WalletConfig};
use xclaim_wallet::identity::{IdentityWorkflow, MemoryContentStore};
use xclaim_wallet::network::{faucet_hash, Faucet, FaucetMethod, NetworkClient};
use xclaim_wallet::scheduler::ImmediateScheduler;
use xclaim_wallet::storage::MemoryStore;
use xclaim_wallet::transaction::{
    AbiEncoder, ContractInterface, PendingTransaction, ReceiptPoller, StaticContracts, TransactionPipeline,
};
use xclaim_wallet::{
    Address, BlockTag, Keystore, NetworkId, ReceiptLog, Result, TransactionReceipt, TransactionSigner, TxHash,
    UnlockedAccount, WalletError, U256,
};

pub const NETWORK: NetworkId = NetworkId(4);
pub const CHAIN_ID: u64 = 1337;
pub const WALLET_KEY: &str = "test.wallet";
pub const PASSWORD: &str = "secret";

pub fn init_logging() {
    env_logger::builder()
        .filter_level(log::LevelFilter::Debug)
        .is_test(true)
        .try_init()
        .ok();
}

pub fn address(n: u8) -> Address {
    Address::from_bytes([n; 20])
}

pub fn identity_manager() -> Address {
    Address::from_str("0x00000000000000000000000000000000000000aa").unwrap()
}

pub fn registry() -> Address {
    Address::from_str("0x00000000000000000000000000000000000000bb").unwrap()
}

/// 32-byte word holding `address` in its low 20 bytes
pub fn address_word(address: &Address) -> String {
    format!("0x{:0>64}", hex::encode(address.as_bytes()))
}

pub fn keystore_json(address: &Address, password: &str) -> String {
    json!({ "address": hex::encode(address.as_bytes()), "password": password }).to_string()
}

/// Poll `condition` until it holds, yielding to spawned tasks in between
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached in time");
}

// ============================================================================
// Network
// ============================================================================

#[derive(Default)]
pub struct FakeNetwork {
    pub calls: Mutex<Vec<&'static str>>,
    pub balances: Mutex<HashMap<Address, U256>>,
    pub tx_counts: Mutex<HashMap<Address, u64>>,
    pub gas_price: Mutex<U256>,
    pub block_number: AtomicU64,
    /// hash -> (null polls left, receipt)
    receipts: Mutex<HashMap<TxHash, (u32, TransactionReceipt)>>,
    /// Logs attached to the receipts of the next submissions, in order
    pub next_logs: Mutex<VecDeque<Vec<ReceiptLog>>>,
    pub node_submissions: Mutex<Vec<PendingTransaction>>,
    pub raw_submissions: Mutex<Vec<Vec<u8>>>,
    pub call_result: Mutex<Vec<u8>>,
    pub fail_receipts: AtomicBool,
    pub fail_balance: AtomicBool,
    /// Null polls before each newly submitted transaction is mined
    pub mining_delay: AtomicU32,
    hash_counter: AtomicU64,
}

impl FakeNetwork {
    pub fn new() -> Arc<Self> {
        let network = Self::default();
        network.block_number.store(100, Ordering::SeqCst);
        *network.gas_price.lock() = U256::from(20_000_000_000u64);
        Arc::new(network)
    }

    fn record(&self, method: &'static str) {
        self.calls.lock().push(method);
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.calls.lock().iter().filter(|m| **m == method).count()
    }

    /// Make `hash` minable with the given logs after the configured delay
    pub fn mine(&self, hash: TxHash, logs: Vec<ReceiptLog>) {
        let receipt = TransactionReceipt {
            transaction_hash: hash,
            block_number: self.block_number.load(Ordering::SeqCst) + 1,
            contract_address: None,
            status: Some(1),
            logs,
        };
        let delay = self.mining_delay.load(Ordering::SeqCst);
        self.receipts.lock().insert(hash, (delay, receipt));
    }

    fn accept(&self) -> TxHash {
        let hash = TxHash::from_low_u64_be(0x1000 + self.hash_counter.fetch_add(1, Ordering::SeqCst));
        let logs = self.next_logs.lock().pop_front().unwrap_or_default();
        self.mine(hash, logs);
        hash
    }

    pub fn push_logs(&self, logs: Vec<ReceiptLog>) {
        self.next_logs.lock().push_back(logs);
    }
}

#[async_trait]
impl NetworkClient for FakeNetwork {
    async fn get_balance(&self, _network: NetworkId, address: &Address, _tag: BlockTag) -> Result<U256> {
        self.record("eth_getBalance");
        if self.fail_balance.load(Ordering::SeqCst) {
            return Err(WalletError::network("balance endpoint down"));
        }
        Ok(self.balances.lock().get(address).copied().unwrap_or_default())
    }

    async fn get_transaction_count(&self, _network: NetworkId, address: &Address, _tag: BlockTag) -> Result<u64> {
        self.record("eth_getTransactionCount");
        Ok(self.tx_counts.lock().get(address).copied().unwrap_or(0))
    }

    async fn get_gas_price(&self, _network: NetworkId) -> Result<U256> {
        self.record("eth_gasPrice");
        Ok(*self.gas_price.lock())
    }

    async fn get_block_number(&self, _network: NetworkId) -> Result<u64> {
        self.record("eth_blockNumber");
        Ok(self.block_number.load(Ordering::SeqCst))
    }

    async fn send_raw_transaction(&self, _network: NetworkId, raw: &[u8]) -> Result<TxHash> {
        self.record("eth_sendRawTransaction");
        self.raw_submissions.lock().push(raw.to_vec());
        Ok(self.accept())
    }

    async fn send_transaction(&self, _network: NetworkId, transaction: &PendingTransaction) -> Result<TxHash> {
        self.record("eth_sendTransaction");
        self.node_submissions.lock().push(transaction.clone());
        Ok(self.accept())
    }

    async fn get_transaction_receipt(&self, _network: NetworkId, hash: &TxHash) -> Result<Option<TransactionReceipt>> {
        self.record("eth_getTransactionReceipt");
        if self.fail_receipts.load(Ordering::SeqCst) {
            return Err(WalletError::network("connection reset"));
        }
        let mut receipts = self.receipts.lock();
        match receipts.get_mut(hash) {
            Some((0, receipt)) => Ok(Some(receipt.clone())),
            Some((left, _)) => {
                *left -= 1;
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn call(
        &self,
        _network: NetworkId,
        _from: &Address,
        _to: &Address,
        _data: &[u8],
        _tag: BlockTag,
    ) -> Result<Vec<u8>> {
        self.record("eth_call");
        Ok(self.call_result.lock().clone())
    }
}

// ============================================================================
// Keystore
// ============================================================================

/// Signer that remembers what it signed
pub struct FakeSigner {
    signed: Arc<Mutex<Vec<(PendingTransaction, u64)>>>,
}

impl TransactionSigner for FakeSigner {
    fn sign(&self, transaction: &PendingTransaction, chain_id: u64) -> Result<Vec<u8>> {
        self.signed.lock().push((transaction.clone(), chain_id));
        Ok(transaction.data.clone())
    }
}

/// Keystore whose "encryption" is a JSON blob carrying the password
pub struct FakeKeystore {
    next: AtomicU8,
    pub signed: Arc<Mutex<Vec<(PendingTransaction, u64)>>>,
}

impl FakeKeystore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            next: AtomicU8::new(0xa0),
            signed: Arc::new(Mutex::new(Vec::new())),
        })
    }

    pub fn account(&self, address: Address) -> UnlockedAccount {
        UnlockedAccount {
            address,
            public_key: format!("0x04{}", hex::encode(address.as_bytes())),
            signer: Arc::new(FakeSigner {
                signed: self.signed.clone(),
            }),
        }
    }

    pub fn signed_transactions(&self) -> Vec<PendingTransaction> {
        self.signed.lock().iter().map(|(tx, _)| tx.clone()).collect()
    }
}

#[async_trait]
impl Keystore for FakeKeystore {
    async fn generate(&self) -> Result<UnlockedAccount> {
        let n = self.next.fetch_add(1, Ordering::SeqCst);
        Ok(self.account(address(n)))
    }

    async fn encrypt(&self, account: &UnlockedAccount, password: &str) -> Result<String> {
        Ok(keystore_json(&account.address, password))
    }

    async fn decrypt(&self, json: &str, password: &str) -> Result<UnlockedAccount> {
        let parsed: Value = serde_json::from_str(json).map_err(|e| WalletError::Keystore(e.to_string()))?;
        if parsed["password"] != password {
            return Err(WalletError::Keystore("wrong password".to_string()));
        }
        let address = parsed["address"]
            .as_str()
            .ok_or_else(|| WalletError::Keystore("no address".to_string()))
            .and_then(Address::from_str)?;
        Ok(self.account(address))
    }
}

// ============================================================================
// Contracts
// ============================================================================

/// Encoder that renders calls as readable bytes and remembers them
#[derive(Default)]
pub struct FakeEncoder {
    pub calls: Mutex<Vec<(String, Vec<String>)>>,
}

impl AbiEncoder for FakeEncoder {
    fn encode_call(&self, _contract: &ContractInterface, method: &str, params: &[String]) -> Result<Vec<u8>> {
        self.calls.lock().push((method.to_string(), params.to_vec()));
        Ok(format!("{}({})", method, params.join(",")).into_bytes())
    }
}

fn artifact(name: &str, methods: &[&str], bytecode: &str) -> ContractInterface {
    let abi: Vec<Value> = methods
        .iter()
        .map(|m| json!({ "type": "function", "name": m, "inputs": [] }))
        .collect();
    serde_json::from_value(json!({
        "contractName": name,
        "abi": abi,
        "unlinked_binary": bytecode,
    }))
    .unwrap()
}

pub fn contracts() -> StaticContracts {
    StaticContracts::new()
        .with(artifact(
            "MetaIdentityManager",
            &["createIdentity", "forwardTo"],
            "0x6060",
        ))
        .with(artifact("UportRegistry", &["set", "get"], "0x6061"))
        .with(artifact("Counter", &["increment"], "0x60606040"))
}

// ============================================================================
// Faucet
// ============================================================================

pub struct FakeFaucet {
    network: Arc<FakeNetwork>,
    pub reply: Mutex<Value>,
    pub requests: Mutex<Vec<Address>>,
}

impl FakeFaucet {
    pub fn new(network: Arc<FakeNetwork>) -> Arc<Self> {
        Arc::new(Self {
            network,
            reply: Mutex::new(json!({ "status": "OK", "tx": TxHash::from_low_u64_be(0xfa0c).to_hex() })),
            requests: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl Faucet for FakeFaucet {
    async fn request_funds(&self, _network: NetworkId, address: &Address) -> Result<TxHash> {
        self.requests.lock().push(*address);
        let hash = faucet_hash(&self.reply.lock());
        if !hash.is_zero() {
            self.network.mine(hash, Vec::new());
        }
        Ok(hash)
    }
}

// ============================================================================
// Environment
// ============================================================================

pub fn test_config() -> WalletConfig {
    WalletConfig {
        wallet_key: WALLET_KEY.to_string(),
        keystore_password: PASSWORD.to_string(),
        default_network: NETWORK,
        networks: vec![NetworkInterface {
            id: NETWORK,
            rpc_url: "http://127.0.0.1:8545".to_string(),
            chain_id: Some(CHAIN_ID),
            identity_manager: identity_manager(),
            registry: registry(),
            faucet_url: None,
            faucet_method: FaucetMethod::Post,
        }],
        receipt_max_attempts: Some(25),
        ..WalletConfig::default()
    }
}

/// Fully wired wallet over in-process fakes
pub struct TestEnvironment {
    pub config: WalletConfig,
    pub network: Arc<FakeNetwork>,
    pub store: Arc<MemoryStore>,
    pub credentials: Arc<MemoryCredentialStore>,
    pub keystore: Arc<FakeKeystore>,
    pub encoder: Arc<FakeEncoder>,
    pub faucet: Arc<FakeFaucet>,
    pub content: Arc<MemoryContentStore>,
    pub manager: Arc<AccountManager>,
    pub pipeline: Arc<TransactionPipeline>,
    pub workflow: IdentityWorkflow,
}

impl TestEnvironment {
    pub fn new() -> Self {
        Self::with_parts(test_config(), Arc::new(MemoryStore::new()), Arc::new(MemoryCredentialStore::new()))
    }

    /// Build over an existing keyed store and credential store (simulates a restart)
    pub fn with_parts(
        config: WalletConfig,
        store: Arc<MemoryStore>,
        credentials: Arc<MemoryCredentialStore>,
    ) -> Self {
        init_logging();

        let network = FakeNetwork::new();
        let keystore = FakeKeystore::new();
        let encoder = Arc::new(FakeEncoder::default());
        let faucet = FakeFaucet::new(network.clone());
        let content = Arc::new(MemoryContentStore::new());

        let manager = Arc::new(AccountManager::new(
            &config,
            store.clone(),
            credentials.clone(),
            keystore.clone(),
            network.clone(),
        ));

        let poller = ReceiptPoller::new(network.clone(), Arc::new(ImmediateScheduler), config.poll_policy());
        let pipeline = Arc::new(TransactionPipeline::new(
            &config,
            manager.clone(),
            Arc::new(contracts()),
            encoder.clone(),
            poller,
        ));

        let workflow = IdentityWorkflow::new(config.clone(), pipeline.clone(), faucet.clone(), content.clone());

        Self {
            config,
            network,
            store,
            credentials,
            keystore,
            encoder,
            faucet,
            content,
            manager,
            pipeline,
            workflow,
        }
    }

    /// Register an account with a valid keystore entry
    pub fn add_account(&self, address: Address) {
        self.manager
            .add_account(address, keystore_json(&address, PASSWORD))
            .unwrap();
    }
}
