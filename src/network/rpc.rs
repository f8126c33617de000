use async_trait::async_trait;
use primitive_types::U256;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use super::NetworkClient;
use crate::error::WalletError;
use crate::transaction::PendingTransaction;
use crate::types::{
    parse_quantity, parse_u256, strip_hex_prefix, to_quantity, u256_to_hex, Address, BlockTag,
    NetworkId, ReceiptLog, TransactionReceipt, TxHash,
};
use crate::Result;

/// HTTP JSON-RPC client with one endpoint per network
pub struct JsonRpcClient {
    client: reqwest::Client,
    endpoints: HashMap<NetworkId, String>,
    next_id: AtomicU64,
}

impl JsonRpcClient {
    pub fn new(endpoints: HashMap<NetworkId, String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoints,
            next_id: AtomicU64::new(1),
        }
    }

    /// Client for a single network
    pub fn single(network: NetworkId, url: impl Into<String>) -> Self {
        Self::new(HashMap::from([(network, url.into())]))
    }

    fn endpoint(&self, network: NetworkId) -> Result<&str> {
        self.endpoints
            .get(&network)
            .map(String::as_str)
            .ok_or_else(|| WalletError::UnknownNetwork(network.to_string()))
    }

    async fn request(&self, network: NetworkId, method: &str, params: Value) -> Result<Value> {
        let url = self.endpoint(network)?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        log::debug!("→ {} {} {}", network, method, body["params"]);

        let response = self.client.post(url).json(&body).send().await?;
        if !response.status().is_success() {
            return Err(WalletError::network(format!(
                "{} returned HTTP {}",
                method,
                response.status()
            )));
        }

        let payload: Value = response.json().await?;
        extract_result(payload)
    }

    async fn request_str(&self, network: NetworkId, method: &str, params: Value) -> Result<String> {
        let result = self.request(network, method, params).await?;
        result
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| WalletError::encoding(format!("{}: expected string, got {}", method, result)))
    }
}

/// Unwrap a JSON-RPC response envelope
pub(crate) fn extract_result(payload: Value) -> Result<Value> {
    if let Some(error) = payload.get("error").filter(|e| !e.is_null()) {
        return Err(WalletError::Rpc {
            code: error.get("code").and_then(Value::as_i64).unwrap_or(0),
            message: error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string(),
        });
    }
    Ok(payload.get("result").cloned().unwrap_or(Value::Null))
}

pub(crate) fn parse_receipt(value: &Value) -> Result<Option<TransactionReceipt>> {
    if value.is_null() {
        return Ok(None);
    }

    let transaction_hash = value
        .get("transactionHash")
        .and_then(Value::as_str)
        .ok_or_else(|| WalletError::encoding("receipt without transactionHash"))
        .and_then(TxHash::from_str)?;

    let block_number = match value.get("blockNumber").and_then(Value::as_str) {
        Some(hex) => parse_quantity(hex)?,
        None => 0,
    };

    let contract_address = value
        .get("contractAddress")
        .and_then(Value::as_str)
        .map(Address::from_str)
        .transpose()?;

    let status = value
        .get("status")
        .and_then(Value::as_str)
        .map(parse_quantity)
        .transpose()?;

    let logs = value
        .get("logs")
        .and_then(Value::as_array)
        .map(|logs| logs.iter().map(parse_log).collect())
        .unwrap_or_default();

    Ok(Some(TransactionReceipt {
        transaction_hash,
        block_number,
        contract_address,
        status,
        logs,
    }))
}

fn parse_log(value: &Value) -> ReceiptLog {
    ReceiptLog {
        address: value
            .get("address")
            .and_then(Value::as_str)
            .and_then(|s| Address::from_str(s).ok()),
        data: value
            .get("data")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        topics: value
            .get("topics")
            .and_then(Value::as_array)
            .map(|topics| {
                topics
                    .iter()
                    .filter_map(|t| t.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default(),
    }
}

fn decode_hex_bytes(s: &str) -> Result<Vec<u8>> {
    hex::decode(strip_hex_prefix(s)).map_err(|e| WalletError::encoding(format!("{}: {}", s, e)))
}

fn transaction_object(transaction: &PendingTransaction) -> Value {
    let mut object = json!({
        "from": transaction.from.to_lower_hex(),
        "to": transaction.to.to_lower_hex(),
        "data": format!("0x{}", hex::encode(&transaction.data)),
        "gas": to_quantity(transaction.gas_limit),
        "value": u256_to_hex(transaction.value),
    });
    if let Some(nonce) = transaction.nonce {
        object["nonce"] = Value::String(to_quantity(nonce));
    }
    if let Some(gas_price) = transaction.gas_price {
        object["gasPrice"] = Value::String(u256_to_hex(gas_price));
    }
    object
}

#[async_trait]
impl NetworkClient for JsonRpcClient {
    async fn get_balance(&self, network: NetworkId, address: &Address, tag: BlockTag) -> Result<U256> {
        let hex = self
            .request_str(
                network,
                "eth_getBalance",
                json!([address.to_lower_hex(), tag.as_param()]),
            )
            .await?;
        parse_u256(&hex)
    }

    async fn get_transaction_count(
        &self,
        network: NetworkId,
        address: &Address,
        tag: BlockTag,
    ) -> Result<u64> {
        let hex = self
            .request_str(
                network,
                "eth_getTransactionCount",
                json!([address.to_lower_hex(), tag.as_param()]),
            )
            .await?;
        parse_quantity(&hex)
    }

    async fn get_gas_price(&self, network: NetworkId) -> Result<U256> {
        let hex = self.request_str(network, "eth_gasPrice", json!([])).await?;
        parse_u256(&hex)
    }

    async fn get_block_number(&self, network: NetworkId) -> Result<u64> {
        let hex = self.request_str(network, "eth_blockNumber", json!([])).await?;
        parse_quantity(&hex)
    }

    async fn send_raw_transaction(&self, network: NetworkId, raw: &[u8]) -> Result<TxHash> {
        let hash = self
            .request_str(
                network,
                "eth_sendRawTransaction",
                json!([format!("0x{}", hex::encode(raw))]),
            )
            .await?;
        log::info!("Broadcast raw transaction {}", hash);
        TxHash::from_str(&hash)
    }

    async fn send_transaction(&self, network: NetworkId, transaction: &PendingTransaction) -> Result<TxHash> {
        let hash = self
            .request_str(
                network,
                "eth_sendTransaction",
                json!([transaction_object(transaction)]),
            )
            .await?;
        log::info!("Node accepted transaction {}", hash);
        TxHash::from_str(&hash)
    }

    async fn get_transaction_receipt(
        &self,
        network: NetworkId,
        hash: &TxHash,
    ) -> Result<Option<TransactionReceipt>> {
        let result = self
            .request(network, "eth_getTransactionReceipt", json!([hash.to_hex()]))
            .await?;
        parse_receipt(&result)
    }

    async fn call(
        &self,
        network: NetworkId,
        from: &Address,
        to: &Address,
        data: &[u8],
        tag: BlockTag,
    ) -> Result<Vec<u8>> {
        let hex = self
            .request_str(
                network,
                "eth_call",
                json!([
                    {
                        "from": from.to_lower_hex(),
                        "to": to.to_lower_hex(),
                        "data": format!("0x{}", hex::encode(data)),
                    },
                    tag.as_param()
                ]),
            )
            .await?;
        decode_hex_bytes(&hex)
    }
}
