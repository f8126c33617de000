use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::str::FromStr;

use crate::error::WalletError;
use crate::types::{Address, NetworkId, TxHash};
use crate::Result;

/// Placeholder in faucet URL templates
pub const ADDRESS_PLACEHOLDER: &str = "$ADDRESS";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FaucetMethod {
    Get,
    #[default]
    Post,
}

impl FromStr for FaucetMethod {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().trim_start_matches('.').to_lowercase().as_str() {
            "get" => Ok(FaucetMethod::Get),
            "post" => Ok(FaucetMethod::Post),
            other => Err(WalletError::Config(format!("unknown faucet method: {}", other))),
        }
    }
}

#[async_trait]
pub trait Faucet: Send + Sync {
    /// Ask for test funds. The zero hash means nothing was sent.
    async fn request_funds(&self, network: NetworkId, address: &Address) -> Result<TxHash>;
}

/// Funding transaction hash from a faucet reply.
///
/// Anything other than `{"status": "OK", "tx": <hash>}` yields the zero hash.
pub fn faucet_hash(reply: &Value) -> TxHash {
    let ok = reply.get("status").and_then(Value::as_str) == Some("OK");
    if !ok {
        log::warn!("Faucet declined: {}", reply);
        return TxHash::zero();
    }
    match reply.get("tx").and_then(Value::as_str).map(TxHash::from_str) {
        Some(Ok(hash)) => hash,
        _ => {
            log::warn!("Faucet reply without usable tx: {}", reply);
            TxHash::zero()
        }
    }
}

#[derive(Clone, Debug)]
pub struct FaucetEndpoint {
    pub url_template: String,
    pub method: FaucetMethod,
}

/// Faucet reached over HTTP, one endpoint per network
pub struct HttpFaucet {
    client: reqwest::Client,
    endpoints: HashMap<NetworkId, FaucetEndpoint>,
}

impl HttpFaucet {
    pub fn new(endpoints: HashMap<NetworkId, FaucetEndpoint>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoints,
        }
    }
}

#[async_trait]
impl Faucet for HttpFaucet {
    async fn request_funds(&self, network: NetworkId, address: &Address) -> Result<TxHash> {
        let endpoint = self
            .endpoints
            .get(&network)
            .ok_or_else(|| WalletError::UnknownNetwork(network.to_string()))?;
        let url = endpoint
            .url_template
            .replace(ADDRESS_PLACEHOLDER, &address.checksum());

        log::info!("💧 Requesting funds for {} from {}", address, url);

        let request = match endpoint.method {
            FaucetMethod::Get => self.client.get(&url),
            FaucetMethod::Post => self.client.post(&url),
        };

        let response = request
            .send()
            .await
            .map_err(|e| WalletError::Faucet(e.to_string()))?;

        if !response.status().is_success() {
            return Err(WalletError::Faucet(format!("HTTP {}", response.status())));
        }

        let reply: Value = response
            .json()
            .await
            .map_err(|e| WalletError::Faucet(e.to_string()))?;

        Ok(faucet_hash(&reply))
    }
}
