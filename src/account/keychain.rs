//! Credential store and keystore seams
//!
//! Key generation, keystore encryption and transaction signing live outside
//! this crate. The wallet only moves opaque keystore JSON between the
//! credential store and the keystore codec.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::transaction::PendingTransaction;
use crate::types::Address;
use crate::Result;

/// Secure storage for keystore JSON, scoped by wallet key.
///
/// May be mutated out-of-band by other processes; the account manager
/// reconciles against it periodically.
pub trait CredentialStore: Send + Sync {
    fn get(&self, wallet_key: &str, address: &Address) -> Option<String>;

    fn add(&self, wallet_key: &str, address: &Address, nickname: &str, value: &str) -> Result<()>;

    fn remove(&self, wallet_key: &str, address: &Address) -> Result<()>;

    /// Nickname of every entry under `wallet_key`
    fn nicknames(&self, wallet_key: &str) -> HashMap<Address, String>;
}

/// Signs a fully built transaction into its raw wire form
pub trait TransactionSigner: Send + Sync {
    fn sign(&self, transaction: &PendingTransaction, chain_id: u64) -> Result<Vec<u8>>;
}

/// Decrypted account handle
#[derive(Clone)]
pub struct UnlockedAccount {
    pub address: Address,
    /// Hex-encoded public key, published in the profile document
    pub public_key: String,
    pub signer: Arc<dyn TransactionSigner>,
}

impl fmt::Debug for UnlockedAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnlockedAccount")
            .field("address", &self.address)
            .field("public_key", &self.public_key)
            .finish_non_exhaustive()
    }
}

/// Password-based keystore codec
#[async_trait]
pub trait Keystore: Send + Sync {
    /// Generate a fresh random account
    async fn generate(&self) -> Result<UnlockedAccount>;

    /// Encrypt into keystore JSON. The JSON must carry an `address` field.
    async fn encrypt(&self, account: &UnlockedAccount, password: &str) -> Result<String>;

    async fn decrypt(&self, json: &str, password: &str) -> Result<UnlockedAccount>;
}

/// Credential store held in process memory
#[derive(Default)]
pub struct MemoryCredentialStore {
    entries: RwLock<HashMap<(String, Address), (String, String)>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self, wallet_key: &str, address: &Address) -> Option<String> {
        self.entries
            .read()
            .get(&(wallet_key.to_string(), *address))
            .map(|(_, value)| value.clone())
    }

    fn add(&self, wallet_key: &str, address: &Address, nickname: &str, value: &str) -> Result<()> {
        self.entries.write().insert(
            (wallet_key.to_string(), *address),
            (nickname.to_string(), value.to_string()),
        );
        Ok(())
    }

    fn remove(&self, wallet_key: &str, address: &Address) -> Result<()> {
        self.entries.write().remove(&(wallet_key.to_string(), *address));
        Ok(())
    }

    fn nicknames(&self, wallet_key: &str) -> HashMap<Address, String> {
        self.entries
            .read()
            .iter()
            .filter(|((key, _), _)| key == wallet_key)
            .map(|((_, address), (nickname, _))| (*address, nickname.clone()))
            .collect()
    }
}
