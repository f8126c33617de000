//! Content-addressed storage for profile documents and images

use async_trait::async_trait;
use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;

use crate::error::WalletError;
use crate::Result;

/// sha2-256 multihash code and digest length
pub const SHA2_256_PREFIX: [u8; 2] = [0x12, 0x20];

/// Self-describing content hash: `[code][length][digest]`
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Multihash(Vec<u8>);

impl Multihash {
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        if bytes.len() < 2 || bytes.len() != 2 + bytes[1] as usize {
            return Err(WalletError::encoding(format!(
                "malformed multihash of {} bytes",
                bytes.len()
            )));
        }
        Ok(Self(bytes))
    }

    pub fn sha2_256(digest: &[u8; 32]) -> Self {
        let mut bytes = SHA2_256_PREFIX.to_vec();
        bytes.extend_from_slice(digest);
        Self(bytes)
    }

    pub fn from_base58(s: &str) -> Result<Self> {
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|e| WalletError::encoding(format!("{}: {}", s, e)))?;
        Self::from_bytes(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Hash bytes without the 2-byte prefix
    pub fn digest(&self) -> &[u8] {
        &self.0[2..]
    }

    pub fn to_base58(&self) -> String {
        bs58::encode(&self.0).into_string()
    }
}

impl fmt::Display for Multihash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base58())
    }
}

impl fmt::Debug for Multihash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Multihash({})", self.to_base58())
    }
}

#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Store `bytes` under a file name hint and return their content hash
    async fn put(&self, file_name: &str, bytes: Vec<u8>) -> Result<Multihash>;

    async fn get(&self, hash: &Multihash) -> Result<Vec<u8>>;
}

/// Content store held in memory, addressed by sha2-256
#[derive(Default)]
pub struct MemoryContentStore {
    objects: RwLock<HashMap<Multihash, Vec<u8>>>,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn put(&self, file_name: &str, bytes: Vec<u8>) -> Result<Multihash> {
        let digest: [u8; 32] = Sha256::digest(&bytes).into();
        let hash = Multihash::sha2_256(&digest);
        log::debug!("Stored {} ({} bytes) as {}", file_name, bytes.len(), hash);
        self.objects.write().insert(hash.clone(), bytes);
        Ok(hash)
    }

    async fn get(&self, hash: &Multihash) -> Result<Vec<u8>> {
        self.objects
            .read()
            .get(hash)
            .cloned()
            .ok_or_else(|| WalletError::ContentStore(format!("{} not found", hash)))
    }
}
