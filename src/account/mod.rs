//! Accounts: credential seams, cached state and lifecycle management

pub mod keychain;
pub mod manager;
pub mod store;

pub use keychain::{CredentialStore, Keystore, MemoryCredentialStore, TransactionSigner, UnlockedAccount};
pub use manager::AccountManager;
pub use store::{AccountStore, NetworkSnapshot, TransactionGroups, TransactionStatus};
