//! Error types for wallet account and transaction operations
//!
//! Failures are surfaced as human-readable messages; there is no structured
//! error code beyond the variant itself.

use thiserror::Error;

use crate::types::{Address, TxHash};

/// Core error type for account, transaction and identity operations
#[derive(Error, Debug)]
pub enum WalletError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Network error: {0}")]
    Network(String),

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Contract not found: {0}")]
    ContractNotFound(String),

    #[error("Invalid method '{method}' for contract {contract}")]
    InvalidMethod { contract: String, method: String },

    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("Unknown network: {0}")]
    UnknownNetwork(String),

    #[error("Account already exists: {0}")]
    AccountExists(Address),

    #[error("Account not found: {0}")]
    AccountNotFound(Address),

    #[error("Invalid account order: {0}")]
    InvalidOrder(String),

    #[error("Unlock account failed: {0}")]
    UnlockFailed(Address),

    #[error("Keystore error: {0}")]
    Keystore(String),

    #[error("Credential store error: {0}")]
    Credential(String),

    #[error("Content store error: {0}")]
    ContentStore(String),

    #[error("Faucet error: {0}")]
    Faucet(String),

    #[error("Identity contract not created for {0}")]
    IdentityNotCreated(Address),

    #[error("No receipt for {hash} after {attempts} polls")]
    ReceiptTimeout { hash: TxHash, attempts: u32 },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Store directory not found: {0}")]
    DirectoryNotFound(String),
}

impl From<reqwest::Error> for WalletError {
    fn from(e: reqwest::Error) -> Self {
        WalletError::Network(e.to_string())
    }
}

// Helper functions for common error scenarios
impl WalletError {
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    pub fn encoding(msg: impl Into<String>) -> Self {
        Self::Encoding(msg.into())
    }

    pub fn invalid_method(contract: impl Into<String>, method: impl Into<String>) -> Self {
        Self::InvalidMethod {
            contract: contract.into(),
            method: method.into(),
        }
    }
}
