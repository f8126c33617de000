//! Primitive chain types shared across the crate
//!
//! - `Address`: 20-byte account address, rendered with EIP-55 checksum casing
//! - `TxHash`: 32-byte transaction hash
//! - `NetworkId`: numeric network identifier used to pick an RPC endpoint
//! - `BlockTag`: block/state selector for RPC queries

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha3::{Digest, Keccak256};
use std::fmt;
use std::str::FromStr;

use crate::error::WalletError;

pub use primitive_types::U256;

/// 20-byte account address
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address([u8; 20]);

impl Address {
    pub const LEN: usize = 20;

    pub const fn zero() -> Self {
        Self([0u8; 20])
    }

    pub const fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, WalletError> {
        let array: [u8; 20] = bytes.try_into().map_err(|_| {
            WalletError::InvalidAddress(format!("expected 20 bytes, got {}", bytes.len()))
        })?;
        Ok(Self(array))
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }

    /// Lowercase `0x`-prefixed hex
    pub fn to_lower_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// EIP-55 mixed-case checksum form (used as the persisted key suffix)
    pub fn checksum(&self) -> String {
        let lower = hex::encode(self.0);
        let hash = Keccak256::digest(lower.as_bytes());

        let mut out = String::with_capacity(42);
        out.push_str("0x");
        for (i, c) in lower.chars().enumerate() {
            let nibble = (hash[i / 2] >> (if i % 2 == 0 { 4 } else { 0 })) & 0x0f;
            if c.is_ascii_alphabetic() && nibble >= 8 {
                out.push(c.to_ascii_uppercase());
            } else {
                out.push(c);
            }
        }
        out
    }
}

impl FromStr for Address {
    type Err = WalletError;

    /// Accepts `0x`-prefixed or bare hex in any casing
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = strip_hex_prefix(s.trim());
        if trimmed.len() != 40 {
            return Err(WalletError::InvalidAddress(s.to_string()));
        }
        let bytes = hex::decode(trimmed).map_err(|_| WalletError::InvalidAddress(s.to_string()))?;
        Self::from_slice(&bytes)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.checksum())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.checksum())
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.checksum())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Address::from_str(&s).map_err(serde::de::Error::custom)
    }
}

/// 32-byte transaction hash
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct TxHash([u8; 32]);

impl TxHash {
    pub const fn zero() -> Self {
        Self([0u8; 32])
    }

    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Hash whose low 8 bytes hold `n` big-endian
    pub fn from_low_u64_be(n: u64) -> Self {
        let mut bytes = [0u8; 32];
        bytes[24..].copy_from_slice(&n.to_be_bytes());
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl FromStr for TxHash {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = strip_hex_prefix(s.trim());
        if trimmed.len() != 64 {
            return Err(WalletError::encoding(format!("invalid transaction hash: {}", s)));
        }
        let bytes = hex::decode(trimmed)
            .map_err(|e| WalletError::encoding(format!("invalid transaction hash {}: {}", s, e)))?;
        let mut array = [0u8; 32];
        array.copy_from_slice(&bytes);
        Ok(Self(array))
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxHash({})", self.to_hex())
    }
}

impl Serialize for TxHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for TxHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        TxHash::from_str(&s).map_err(serde::de::Error::custom)
    }
}

/// Numeric network identifier
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NetworkId(pub u64);

impl fmt::Display for NetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for NetworkId {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .map(NetworkId)
            .map_err(|e| WalletError::UnknownNetwork(format!("{}: {}", s, e)))
    }
}

/// Block/state selector for RPC queries
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockTag {
    Latest,
    Pending,
    Earliest,
    Number(u64),
}

impl BlockTag {
    pub fn as_param(&self) -> String {
        match self {
            BlockTag::Latest => "latest".to_string(),
            BlockTag::Pending => "pending".to_string(),
            BlockTag::Earliest => "earliest".to_string(),
            BlockTag::Number(n) => to_quantity(*n),
        }
    }
}

/// One observed transaction of an account.
///
/// `block_number` is -1 while the transaction is pending. Any other fields of
/// the source record are kept verbatim in `metadata`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionInfo {
    pub hash: TxHash,
    pub timestamp: u64,
    #[serde(default = "pending_block")]
    pub block_number: i64,
    #[serde(flatten)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

fn pending_block() -> i64 {
    -1
}

impl TransactionInfo {
    pub fn new(hash: TxHash, timestamp: u64, block_number: i64) -> Self {
        Self {
            hash,
            timestamp,
            block_number,
            metadata: serde_json::Map::new(),
        }
    }

    pub fn is_pending(&self) -> bool {
        self.block_number < 0
    }

    /// List order: newest first, equal timestamps by ascending hash
    pub fn list_order(&self, other: &Self) -> std::cmp::Ordering {
        other
            .timestamp
            .cmp(&self.timestamp)
            .then_with(|| self.hash.cmp(&other.hash))
    }
}

/// Log entry emitted by a mined transaction
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ReceiptLog {
    #[serde(default)]
    pub address: Option<Address>,
    #[serde(default)]
    pub data: String,
    #[serde(default)]
    pub topics: Vec<String>,
}

/// Mined transaction receipt. The default value is the empty receipt of the zero hash.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionReceipt {
    pub transaction_hash: TxHash,
    /// 0 until mined
    pub block_number: u64,
    pub contract_address: Option<Address>,
    pub status: Option<u64>,
    pub logs: Vec<ReceiptLog>,
}

impl TransactionReceipt {
    pub fn is_mined(&self) -> bool {
        self.block_number > 0
    }
}

pub(crate) fn strip_hex_prefix(s: &str) -> &str {
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s)
}

/// Hex quantity (`0x1a`) as used by JSON-RPC
pub fn to_quantity(n: u64) -> String {
    format!("{:#x}", n)
}

pub fn parse_quantity(s: &str) -> Result<u64, WalletError> {
    let digits = strip_hex_prefix(s.trim());
    if digits.is_empty() {
        return Ok(0);
    }
    u64::from_str_radix(digits, 16)
        .map_err(|e| WalletError::encoding(format!("invalid quantity {}: {}", s, e)))
}

pub fn parse_u256(s: &str) -> Result<U256, WalletError> {
    let digits = strip_hex_prefix(s.trim());
    if digits.is_empty() {
        return Ok(U256::zero());
    }
    U256::from_str_radix(digits, 16)
        .map_err(|e| WalletError::encoding(format!("invalid big number {}: {:?}", s, e)))
}

pub fn u256_to_hex(value: U256) -> String {
    format!("{:#x}", value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_matches_eip55_vectors() {
        // Reference vectors from EIP-55
        for expected in [
            "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed",
            "0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359",
            "0xdbF03B407c01E7cD3CBea99509d93f8DDDC8C6FB",
            "0xD1220A0cf47c7B9Be7A2E6BA89F429762e7b9aDb",
        ] {
            let address = Address::from_str(&expected.to_lowercase()).unwrap();
            assert_eq!(address.checksum(), expected);
        }
    }

    #[test]
    fn test_address_parse_rejects_wrong_length() {
        assert!(Address::from_str("0x1234").is_err());
        assert!(Address::from_str("zz5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed").is_err());
    }

    #[test]
    fn test_tx_hash_ordering_follows_hex() {
        let a = TxHash::from_low_u64_be(0x0a);
        let b = TxHash::from_low_u64_be(0x0b);
        assert!(a < b);
        assert_eq!(TxHash::from_str(&a.to_hex()).unwrap(), a);
    }

    #[test]
    fn test_transaction_order() {
        let b = TransactionInfo::new(TxHash::from_low_u64_be(0x0b), 10, 1);
        let a = TransactionInfo::new(TxHash::from_low_u64_be(0x0a), 10, 1);
        let c = TransactionInfo::new(TxHash::from_low_u64_be(0x0c), 5, 1);

        let mut list = vec![b.clone(), a.clone(), c.clone()];
        list.sort_by(TransactionInfo::list_order);
        assert_eq!(list, vec![a, b, c]);
    }

    #[test]
    fn test_transaction_record_keeps_metadata() {
        let json = serde_json::json!({
            "hash": TxHash::from_low_u64_be(1).to_hex(),
            "timestamp": 42,
            "value": "0x10",
        });
        let info: TransactionInfo = serde_json::from_value(json).unwrap();
        assert!(info.is_pending());
        assert_eq!(info.metadata.get("value"), Some(&serde_json::json!("0x10")));
    }

    #[test]
    fn test_quantities() {
        assert_eq!(parse_quantity("0x1a").unwrap(), 26);
        assert_eq!(parse_quantity("0x").unwrap(), 0);
        assert_eq!(to_quantity(26), "0x1a");
        assert_eq!(parse_u256("0xde0b6b3a7640000").unwrap(), U256::from(1_000_000_000_000_000_000u64));
        assert_eq!(u256_to_hex(U256::from(255u64)), "0xff");
        assert_eq!(BlockTag::Pending.as_param(), "pending");
    }
}
