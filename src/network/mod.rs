//! Chain access
//!
//! - `NetworkClient`: the RPC surface the wallet consumes, per network id
//! - `JsonRpcClient`: reqwest implementation over HTTP JSON-RPC
//! - `Faucet`: test-funds endpoint used while bootstrapping an identity

pub mod faucet;
pub mod rpc;

pub use faucet::{faucet_hash, Faucet, FaucetMethod, HttpFaucet};
pub use rpc::JsonRpcClient;

use async_trait::async_trait;
use primitive_types::U256;

use crate::transaction::PendingTransaction;
use crate::types::{Address, BlockTag, NetworkId, TransactionReceipt, TxHash};
use crate::Result;

#[async_trait]
pub trait NetworkClient: Send + Sync {
    async fn get_balance(&self, network: NetworkId, address: &Address, tag: BlockTag) -> Result<U256>;

    async fn get_transaction_count(
        &self,
        network: NetworkId,
        address: &Address,
        tag: BlockTag,
    ) -> Result<u64>;

    async fn get_gas_price(&self, network: NetworkId) -> Result<U256>;

    async fn get_block_number(&self, network: NetworkId) -> Result<u64>;

    /// Broadcast a transaction signed locally
    async fn send_raw_transaction(&self, network: NetworkId, raw: &[u8]) -> Result<TxHash>;

    /// Hand an unsigned transaction to the node, which signs it with an account it manages
    async fn send_transaction(&self, network: NetworkId, transaction: &PendingTransaction) -> Result<TxHash>;

    /// `None` while the transaction is not yet known to the node
    async fn get_transaction_receipt(
        &self,
        network: NetworkId,
        hash: &TxHash,
    ) -> Result<Option<TransactionReceipt>>;

    /// Read-only contract call, returns the raw ABI-encoded result
    async fn call(
        &self,
        network: NetworkId,
        from: &Address,
        to: &Address,
        data: &[u8],
        tag: BlockTag,
    ) -> Result<Vec<u8>>;
}
