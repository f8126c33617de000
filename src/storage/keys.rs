//! Keyspace of the persistent store
//!
//! Per-account keys are a prefix followed by the checksummed address.
//! Network snapshot keys are scoped by network id, except the sync date.

use crate::types::{Address, NetworkId};

pub const ACCOUNT_BALANCE: &str = "ACCOUNT_BALANCE_";
pub const ACCOUNT_NAME: &str = "ACCOUNT_NAME_";
pub const ACCOUNT_NONCE: &str = "ACCOUNT_NONCE_";
pub const ACCOUNT_TX_BLOCK: &str = "ACCOUNT_TX_BLOCK_";
pub const ACCOUNT_TXS: &str = "ACCOUNT_TXS_";
pub const ACCOUNT_PROXY: &str = "ACCOUNT_PROXY_";

pub const USER_ACCOUNTS: &str = "USER_ACCOUNTS";
pub const USER_ACTIVE_ACCOUNT: &str = "USER_ACTIVE_ACCOUNT";

pub const NETWORK_GAS_PRICE: &str = "NETWORK_GAS_PRICE_";
pub const NETWORK_BLOCK_NUMBER: &str = "NETWORK_BLOCK_NUMBER_";
pub const NETWORK_ETHER_PRICE: &str = "NETWORK_ETHER_PRICE_";
pub const NETWORK_SYNC_DATE: &str = "NETWORK_SYNC_DATE";

/// Every per-account prefix, purged together on removal
pub const ACCOUNT_PREFIXES: [&str; 6] = [
    ACCOUNT_BALANCE,
    ACCOUNT_NAME,
    ACCOUNT_NONCE,
    ACCOUNT_TX_BLOCK,
    ACCOUNT_TXS,
    ACCOUNT_PROXY,
];

pub fn account_key(prefix: &str, address: &Address) -> String {
    format!("{}{}", prefix, address.checksum())
}

pub fn balance(address: &Address) -> String {
    account_key(ACCOUNT_BALANCE, address)
}

pub fn nickname(address: &Address) -> String {
    account_key(ACCOUNT_NAME, address)
}

pub fn nonce(address: &Address) -> String {
    account_key(ACCOUNT_NONCE, address)
}

pub fn tx_block(address: &Address) -> String {
    account_key(ACCOUNT_TX_BLOCK, address)
}

pub fn transactions(address: &Address) -> String {
    account_key(ACCOUNT_TXS, address)
}

pub fn proxy(address: &Address) -> String {
    account_key(ACCOUNT_PROXY, address)
}

pub fn gas_price(network: NetworkId) -> String {
    format!("{}{}", NETWORK_GAS_PRICE, network)
}

pub fn block_number(network: NetworkId) -> String {
    format!("{}{}", NETWORK_BLOCK_NUMBER, network)
}

pub fn ether_price(network: NetworkId) -> String {
    format!("{}{}", NETWORK_ETHER_PRICE, network)
}
