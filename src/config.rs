//! Wallet configuration
//!
//! Loaded from environment variables (`from_env`) or a TOML file
//! (`from_toml_file`). Every field has a default so partial files work.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::error::WalletError;
use crate::network::faucet::FaucetEndpoint;
use crate::network::FaucetMethod;
use crate::transaction::PollPolicy;
use crate::types::{Address, NetworkId};
use crate::Result;

pub const DEFAULT_WALLET_KEY: &str = "us.proviv.claim";
pub const DEFAULT_KEYSTORE_PASSWORD: &str = "secret";
pub const DEFAULT_NETWORK_ID: u64 = 4;
pub const DEFAULT_RPC_URL: &str = "http://localhost:8545";
pub const DEFAULT_GAS_LIMIT: u64 = 350_000;

/// Endpoints and well-known contract addresses of one network
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NetworkInterface {
    pub id: NetworkId,
    pub rpc_url: String,
    /// Chain id used when signing; defaults to the network id
    #[serde(default)]
    pub chain_id: Option<u64>,
    /// MetaIdentityManager contract
    #[serde(default = "Address::zero")]
    pub identity_manager: Address,
    /// UportRegistry contract
    #[serde(default = "Address::zero")]
    pub registry: Address,
    /// Faucet URL template; `$ADDRESS` is replaced by the checksummed address
    #[serde(default)]
    pub faucet_url: Option<String>,
    #[serde(default)]
    pub faucet_method: FaucetMethod,
}

impl NetworkInterface {
    pub fn chain_id(&self) -> u64 {
        self.chain_id.unwrap_or(self.id.0)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalletConfig {
    /// Scope of this wallet in the credential store and keyed store
    pub wallet_key: String,
    pub keystore_password: String,
    pub default_network: NetworkId,
    pub networks: Vec<NetworkInterface>,
    pub default_gas_limit: u64,
    pub receipt_poll_secs: u64,
    pub receipt_timeout_secs: Option<u64>,
    pub receipt_max_attempts: Option<u32>,
    pub keychain_refresh_secs: u64,
    pub contracts_dir: PathBuf,
    pub store_dir: PathBuf,
    /// Network label and MNID chain id written into profile documents
    pub profile_network: String,
    pub profile_chain_id: String,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            wallet_key: DEFAULT_WALLET_KEY.to_string(),
            keystore_password: DEFAULT_KEYSTORE_PASSWORD.to_string(),
            default_network: NetworkId(DEFAULT_NETWORK_ID),
            networks: Vec::new(),
            default_gas_limit: DEFAULT_GAS_LIMIT,
            receipt_poll_secs: 5,
            receipt_timeout_secs: None,
            receipt_max_attempts: None,
            keychain_refresh_secs: 30,
            contracts_dir: PathBuf::from("contracts"),
            store_dir: PathBuf::from("./wallet-data"),
            profile_network: "carechain".to_string(),
            profile_chain_id: "0x00".to_string(),
        }
    }
}

fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    let raw = env::var(name).ok()?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            log::warn!("⚠️  Ignoring {}={:?}: not a valid value", name, raw);
            None
        }
    }
}

impl WalletConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `WALLET_KEYCHAIN_KEY`, `WALLET_KEYSTORE_PASSWORD`
    /// - `NETWORK_ID` (default 4), `RPC_URL` (default http://localhost:8545), `CHAIN_ID`
    /// - `IDENTITY_MANAGER_ADDRESS`, `REGISTRY_ADDRESS`
    /// - `FAUCET_URL` (with `$ADDRESS`), `FAUCET_METHOD` (get|post)
    /// - `CONTRACTS_DIR`, `WALLET_STORE_DIR`
    /// - `RECEIPT_POLL_SECS`, `RECEIPT_TIMEOUT_SECS`, `RECEIPT_MAX_ATTEMPTS`
    /// - `KEYCHAIN_REFRESH_SECS`
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(key) = env::var("WALLET_KEYCHAIN_KEY") {
            config.wallet_key = key;
        }
        if let Ok(password) = env::var("WALLET_KEYSTORE_PASSWORD") {
            config.keystore_password = password;
        }
        log::info!("🔑 Wallet key: {}", config.wallet_key);

        let id = NetworkId(env_parse("NETWORK_ID").unwrap_or(DEFAULT_NETWORK_ID));
        config.default_network = id;

        let rpc_url = env::var("RPC_URL").unwrap_or_else(|_| DEFAULT_RPC_URL.to_string());
        log::info!("📡 Network {} via {}", id, rpc_url);

        let identity_manager = env_parse::<Address>("IDENTITY_MANAGER_ADDRESS").unwrap_or_default();
        let registry = env_parse::<Address>("REGISTRY_ADDRESS").unwrap_or_default();
        if identity_manager.is_zero() || registry.is_zero() {
            log::warn!("⚠️  Identity manager or registry address not configured");
        }

        let faucet_url = env::var("FAUCET_URL").ok();
        if let Some(ref url) = faucet_url {
            log::info!("💧 Faucet: {}", url);
        }

        config.networks = vec![NetworkInterface {
            id,
            rpc_url,
            chain_id: env_parse("CHAIN_ID"),
            identity_manager,
            registry,
            faucet_url,
            faucet_method: env_parse("FAUCET_METHOD").unwrap_or_default(),
        }];

        if let Ok(dir) = env::var("CONTRACTS_DIR") {
            config.contracts_dir = PathBuf::from(dir);
        }
        if let Ok(dir) = env::var("WALLET_STORE_DIR") {
            config.store_dir = PathBuf::from(dir);
        }

        if let Some(secs) = env_parse("RECEIPT_POLL_SECS") {
            config.receipt_poll_secs = secs;
        }
        config.receipt_timeout_secs = env_parse("RECEIPT_TIMEOUT_SECS");
        config.receipt_max_attempts = env_parse("RECEIPT_MAX_ATTEMPTS");
        if let Some(secs) = env_parse("KEYCHAIN_REFRESH_SECS") {
            config.keychain_refresh_secs = secs;
        }

        log::info!(
            "⏱  Receipt polling every {}s (timeout: {:?}, max attempts: {:?})",
            config.receipt_poll_secs,
            config.receipt_timeout_secs,
            config.receipt_max_attempts
        );

        config
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| WalletError::Config(e.to_string()))
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| WalletError::Config(format!("{}: {}", path.display(), e)))?;
        let config = Self::from_toml_str(&contents)?;
        log::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn network(&self, id: NetworkId) -> Result<&NetworkInterface> {
        self.networks
            .iter()
            .find(|n| n.id == id)
            .ok_or_else(|| WalletError::UnknownNetwork(id.to_string()))
    }

    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            interval: Duration::from_secs(self.receipt_poll_secs),
            timeout: self.receipt_timeout_secs.map(Duration::from_secs),
            max_attempts: self.receipt_max_attempts,
        }
    }

    pub fn rpc_endpoints(&self) -> HashMap<NetworkId, String> {
        self.networks
            .iter()
            .map(|n| (n.id, n.rpc_url.clone()))
            .collect()
    }

    pub fn chain_ids(&self) -> HashMap<NetworkId, u64> {
        self.networks.iter().map(|n| (n.id, n.chain_id())).collect()
    }

    pub fn faucet_endpoints(&self) -> HashMap<NetworkId, FaucetEndpoint> {
        self.networks
            .iter()
            .filter_map(|n| {
                n.faucet_url.as_ref().map(|url| {
                    (
                        n.id,
                        FaucetEndpoint {
                            url_template: url.clone(),
                            method: n.faucet_method,
                        },
                    )
                })
            })
            .collect()
    }
}
