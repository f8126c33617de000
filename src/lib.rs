//! XClaim wallet core: account cache and transaction orchestration
//!
//! This crate keeps a set of locally held accounts and their chain-derived
//! state (balance, nonce, nickname, transaction history) in a persistent
//! keyed store, and drives the on-chain identity bootstrap: fund an address,
//! deploy an identity proxy, publish a profile document and register it.
//!
//! # Architecture
//!
//! - **AccountStore / AccountManager**: ordered account list, active account,
//!   write-if-changed caches and change events
//! - **TransactionPipeline**: build → submit → await receipt → confirm, with
//!   nonce sequencing and receipt polling
//! - **IdentityWorkflow**: the multi-step identity saga
//! - **MNID**: checksummed chain-qualified identifiers
//!
//! Key generation, keystore encryption, signing, the OS credential store and
//! the ABI encoder are supplied by the embedding application through the
//! traits in [`account::keychain`] and [`transaction::contracts`].
//!
//! # Example
//!
//! ```ignore
//! use xclaim_wallet::{mnid, Address};
//!
//! let address: Address = "0x00521965e7bd230323c423d96c657db5b79d099f".parse()?;
//! let id = mnid::encode(&address, &[0x04]);
//! assert_eq!(mnid::decode(&id)?.address, address);
//! ```

// Public modules
pub mod account;
pub mod config;
pub mod error;
pub mod events;
pub mod identity;
pub mod mnid;
pub mod network;
pub mod scheduler;
pub mod storage;
pub mod transaction;
pub mod types;

// Re-exports for convenience
pub use account::{
    AccountManager, AccountStore, CredentialStore, Keystore, MemoryCredentialStore, NetworkSnapshot,
    TransactionSigner, TransactionStatus, UnlockedAccount,
};
pub use config::{NetworkInterface, WalletConfig};
pub use error::{StorageError, WalletError};
pub use events::{EventHub, SyncMarker, WalletEvent};
pub use identity::{ContentStore, IdentitySetup, IdentityWorkflow, MemoryContentStore, Multihash, ProfileDocument};
pub use network::{Faucet, HttpFaucet, JsonRpcClient, NetworkClient};
pub use scheduler::{ImmediateScheduler, ManualScheduler, Scheduler, Ticker, TokioScheduler};
pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use transaction::{
    AbiEncoder, ContractInterface, ContractRegistry, DirectoryContracts, NonceSequencer, PendingTransaction,
    PipelineStage, PollPolicy, ReceiptPoller, SubmitMode, TransactionPipeline, TransactionRequest,
};
pub use types::{Address, BlockTag, NetworkId, ReceiptLog, TransactionInfo, TransactionReceipt, TxHash, U256};

// Common result type
pub type Result<T> = std::result::Result<T, WalletError>;
