//! On-chain identity bootstrap and profile publishing

pub mod content;
pub mod profile;
pub mod workflow;

pub use content::{ContentStore, MemoryContentStore, Multihash};
pub use profile::{registration_key, registry_digest, ProfileDocument};
pub use workflow::{IdentitySetup, IdentityWorkflow};
