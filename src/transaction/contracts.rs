//! Contract metadata and the ABI encoder seam
//!
//! Metadata is the truffle artifact layout: `contractName`, `abi` and
//! `unlinked_binary` (or `bytecode`).

use parking_lot::RwLock;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::WalletError;
use crate::types::strip_hex_prefix;
use crate::Result;

#[derive(Clone, Debug, Deserialize)]
pub struct ContractInterface {
    #[serde(rename = "contractName", alias = "name")]
    pub name: String,
    #[serde(default)]
    pub abi: Vec<Value>,
    #[serde(rename = "unlinked_binary", alias = "bytecode", default)]
    pub unlinked_binary: String,
}

impl ContractInterface {
    /// ABI entry of the function called `method`
    pub fn find_method(&self, method: &str) -> Option<&Value> {
        self.abi.iter().find(|entry| {
            entry.get("type").and_then(Value::as_str).unwrap_or("function") == "function"
                && entry.get("name").and_then(Value::as_str) == Some(method)
        })
    }

    pub fn bytecode(&self) -> Result<Vec<u8>> {
        hex::decode(strip_hex_prefix(&self.unlinked_binary)).map_err(|e| {
            WalletError::encoding(format!("{} bytecode is not hex: {}", self.name, e))
        })
    }
}

/// Resolves contract metadata by name
pub trait ContractRegistry: Send + Sync {
    /// Fails with `ContractNotFound` when no metadata exists for `name`
    fn load(&self, name: &str) -> Result<Arc<ContractInterface>>;
}

/// Encodes contract method calls from string parameters
pub trait AbiEncoder: Send + Sync {
    fn encode_call(
        &self,
        contract: &ContractInterface,
        method: &str,
        params: &[String],
    ) -> Result<Vec<u8>>;
}

/// Loads `<dir>/<Name>.json`, caching parsed artifacts
pub struct DirectoryContracts {
    dir: PathBuf,
    cache: RwLock<HashMap<String, Arc<ContractInterface>>>,
}

impl DirectoryContracts {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            cache: RwLock::new(HashMap::new()),
        }
    }
}

impl ContractRegistry for DirectoryContracts {
    fn load(&self, name: &str) -> Result<Arc<ContractInterface>> {
        if let Some(contract) = self.cache.read().get(name) {
            return Ok(contract.clone());
        }

        let path = self.dir.join(format!("{}.json", name));
        let contents =
            fs::read_to_string(&path).map_err(|_| WalletError::ContractNotFound(name.to_string()))?;
        let contract: ContractInterface = serde_json::from_str(&contents).map_err(|e| {
            log::error!("Unreadable contract metadata {}: {}", path.display(), e);
            WalletError::ContractNotFound(name.to_string())
        })?;

        let contract = Arc::new(contract);
        self.cache.write().insert(name.to_string(), contract.clone());
        Ok(contract)
    }
}

/// Fixed set of contracts held in memory
#[derive(Default)]
pub struct StaticContracts {
    contracts: HashMap<String, Arc<ContractInterface>>,
}

impl StaticContracts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, contract: ContractInterface) -> Self {
        self.contracts
            .insert(contract.name.clone(), Arc::new(contract));
        self
    }
}

impl ContractRegistry for StaticContracts {
    fn load(&self, name: &str) -> Result<Arc<ContractInterface>> {
        self.contracts
            .get(name)
            .cloned()
            .ok_or_else(|| WalletError::ContractNotFound(name.to_string()))
    }
}
