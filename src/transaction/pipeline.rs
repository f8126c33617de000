//! Transaction pipeline
//!
//! Every run walks the same stages:
//!
//! ```text
//! Built -> Submitted -> AwaitingReceipt -> Confirmed
//! ```
//!
//! A run that fails stops at the stage it reached; nothing is retried or
//! rolled back.

use primitive_types::U256;
use std::collections::HashMap;
use std::sync::Arc;

use super::abi;
use super::contracts::{AbiEncoder, ContractRegistry};
use super::nonce::NonceSequencer;
use super::receipt::ReceiptPoller;
use crate::account::AccountManager;
use crate::config::WalletConfig;
use crate::error::WalletError;
use crate::types::{Address, NetworkId, TransactionReceipt, TxHash};
use crate::Result;

/// Returned by `send_transaction` when no receipt log decodes
pub const UNDECODED_RESULT: [&str; 2] = ["-1", "-1"];

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum PipelineStage {
    Built,
    Submitted,
    AwaitingReceipt,
    Confirmed,
}

/// How a built transaction reaches the network
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubmitMode {
    /// Signed locally with the unlocked sender, sent raw
    SignedRaw,
    /// Sent unsigned; the node signs with an account it manages
    NodeManaged,
}

/// What the caller wants done
#[derive(Clone, Debug)]
pub struct TransactionRequest {
    pub network: NetworkId,
    pub from: Address,
    pub contract: String,
    pub method: String,
    pub params: Vec<String>,
    /// Deployed contract to call; `None` deploys `contract` instead
    pub target: Option<Address>,
    pub value: U256,
    /// Pre-estimated gas limit
    pub gas_limit: Option<u64>,
}

impl TransactionRequest {
    pub fn call(
        network: NetworkId,
        from: Address,
        contract: &str,
        method: &str,
        params: Vec<String>,
        target: Address,
    ) -> Self {
        Self {
            network,
            from,
            contract: contract.to_string(),
            method: method.to_string(),
            params,
            target: Some(target),
            value: U256::zero(),
            gas_limit: None,
        }
    }

    pub fn deploy(network: NetworkId, from: Address, contract: &str) -> Self {
        Self {
            network,
            from,
            contract: contract.to_string(),
            method: String::new(),
            params: Vec::new(),
            target: None,
            value: U256::zero(),
            gas_limit: None,
        }
    }

    pub fn with_gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = Some(gas_limit);
        self
    }
}

/// A transaction ready for submission
#[derive(Clone, Debug, PartialEq)]
pub struct PendingTransaction {
    pub from: Address,
    /// Contract address, or the sender itself for a deployment
    pub to: Address,
    pub contract: String,
    /// `None` for a deployment
    pub method: Option<String>,
    pub data: Vec<u8>,
    pub value: U256,
    pub nonce: Option<u64>,
    pub gas_limit: u64,
    pub gas_price: Option<U256>,
}

impl PendingTransaction {
    pub fn is_deploy(&self) -> bool {
        self.method.is_none()
    }
}

/// Outcome of one pipeline run
#[derive(Clone, Debug)]
pub struct PipelineRun {
    pub stage: PipelineStage,
    pub transaction: PendingTransaction,
    pub hash: TxHash,
    pub receipt: TransactionReceipt,
}

/// Result of deploying an identity proxy
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IdentityCreation {
    pub sender: Address,
    /// `None` when no receipt log carried the proxy address
    pub identity: Option<Address>,
}

pub struct TransactionPipeline {
    accounts: Arc<AccountManager>,
    contracts: Arc<dyn ContractRegistry>,
    encoder: Arc<dyn AbiEncoder>,
    nonces: Arc<NonceSequencer>,
    poller: ReceiptPoller,
    default_gas_limit: u64,
    chain_ids: HashMap<NetworkId, u64>,
}

impl TransactionPipeline {
    pub fn new(
        config: &WalletConfig,
        accounts: Arc<AccountManager>,
        contracts: Arc<dyn ContractRegistry>,
        encoder: Arc<dyn AbiEncoder>,
        poller: ReceiptPoller,
    ) -> Self {
        let nonces = Arc::new(NonceSequencer::new(accounts.client().clone()));
        Self {
            accounts,
            contracts,
            encoder,
            nonces,
            poller,
            default_gas_limit: config.default_gas_limit,
            chain_ids: config.chain_ids(),
        }
    }

    pub fn accounts(&self) -> &Arc<AccountManager> {
        &self.accounts
    }

    pub fn nonces(&self) -> &Arc<NonceSequencer> {
        &self.nonces
    }

    pub fn poller(&self) -> &ReceiptPoller {
        &self.poller
    }

    /// Encode a call to `contract.method` without submitting anything
    pub fn encode_call(&self, contract: &str, method: &str, params: &[String]) -> Result<Vec<u8>> {
        let contract = self.contracts.load(contract)?;
        if contract.find_method(method).is_none() {
            return Err(WalletError::invalid_method(&contract.name, method));
        }
        self.encoder.encode_call(&contract, method, params)
    }

    /// Resolve the contract and encode the call (or take the bytecode for a deployment)
    pub fn build(&self, request: &TransactionRequest) -> Result<PendingTransaction> {
        let contract = self.contracts.load(&request.contract)?;

        let (to, method, data) = match request.target {
            Some(target) => {
                if contract.find_method(&request.method).is_none() {
                    return Err(WalletError::invalid_method(&contract.name, &request.method));
                }
                let data = self
                    .encoder
                    .encode_call(&contract, &request.method, &request.params)?;
                (target, Some(request.method.clone()), data)
            }
            None => (request.from, None, contract.bytecode()?),
        };

        Ok(PendingTransaction {
            from: request.from,
            to,
            contract: request.contract.clone(),
            method,
            data,
            value: request.value,
            nonce: self.nonces.current(&request.from),
            gas_limit: request.gas_limit.unwrap_or(self.default_gas_limit),
            gas_price: None,
        })
    }

    async fn submit(
        &self,
        network: NetworkId,
        transaction: &PendingTransaction,
        mode: SubmitMode,
    ) -> Result<TxHash> {
        let client = self.accounts.client();
        match mode {
            SubmitMode::SignedRaw => {
                let account = match self.accounts.unlocked_account(&transaction.from) {
                    Some(account) => account,
                    None => self
                        .accounts
                        .unlock_account(&transaction.from)
                        .await
                        .ok_or(WalletError::UnlockFailed(transaction.from))?,
                };
                let chain_id = self.chain_ids.get(&network).copied().unwrap_or(network.0);
                let raw = account.signer.sign(transaction, chain_id)?;
                client.send_raw_transaction(network, &raw).await
            }
            SubmitMode::NodeManaged => client.send_transaction(network, transaction).await,
        }
    }

    /// Run a request through every stage up to a mined receipt
    pub async fn execute(&self, request: &TransactionRequest, mode: SubmitMode) -> Result<PipelineRun> {
        let transaction = self.build(request)?;
        log::debug!(
            "[{:?}] {}.{} from {} (gas {})",
            PipelineStage::Built,
            transaction.contract,
            transaction.method.as_deref().unwrap_or("<deploy>"),
            transaction.from,
            transaction.gas_limit
        );

        let hash = self.submit(request.network, &transaction, mode).await?;
        log::debug!("[{:?}] {}", PipelineStage::Submitted, hash);

        log::debug!("[{:?}] {}", PipelineStage::AwaitingReceipt, hash);
        let receipt = self.poller.wait_for_receipt(request.network, &hash).await?;

        log::debug!("[{:?}] {} in block {}", PipelineStage::Confirmed, hash, receipt.block_number);
        Ok(PipelineRun {
            stage: PipelineStage::Confirmed,
            transaction,
            hash,
            receipt,
        })
    }

    /// Signed transaction; returns the words of the first decodable log, or `["-1", "-1"]`
    pub async fn send_transaction(&self, request: &TransactionRequest) -> Result<Vec<String>> {
        let run = self.execute(request, SubmitMode::SignedRaw).await?;
        Ok(first_decoded_log(&run.receipt)
            .unwrap_or_else(|| UNDECODED_RESULT.iter().map(|s| s.to_string()).collect()))
    }

    /// Node-managed transaction; returns the words of the first decodable log, or nothing
    pub async fn send_meta_transaction(&self, request: &TransactionRequest) -> Result<Vec<String>> {
        let run = self.execute(request, SubmitMode::NodeManaged).await?;
        Ok(first_decoded_log(&run.receipt).unwrap_or_default())
    }

    /// Deploy an identity proxy and record its address on the sender's account
    pub async fn create_identity_transaction(&self, request: &TransactionRequest) -> Result<IdentityCreation> {
        let run = self.execute(request, SubmitMode::SignedRaw).await?;

        let identity = run
            .receipt
            .logs
            .iter()
            .find(|log| log.topics.len() > 1)
            .and_then(|log| match abi::decode_address_word(&log.topics[1]) {
                Ok(address) => Some(address),
                Err(e) => {
                    log::warn!("Identity topic did not decode: {}", e);
                    None
                }
            });

        match identity {
            Some(identity) => self.accounts.record_proxy_address(&request.from, &identity)?,
            None => log::warn!("No identity address in receipt {}", run.hash),
        }

        Ok(IdentityCreation {
            sender: request.from,
            identity,
        })
    }
}

fn first_decoded_log(receipt: &TransactionReceipt) -> Option<Vec<String>> {
    receipt
        .logs
        .iter()
        .find_map(|log| abi::decode_words(&log.data).ok())
}
