//! Identity bootstrap saga
//!
//! create account → unlock → fund → deploy identity proxy → publish profile →
//! register the profile digest through the proxy.
//!
//! Steps run strictly in order. The first failure stops the saga; anything
//! already broadcast stays on chain.

use std::sync::Arc;

use super::content::{ContentStore, Multihash};
use super::profile::{registration_key, registry_digest, ProfileDocument};
use crate::account::{AccountManager, UnlockedAccount};
use crate::config::WalletConfig;
use crate::error::WalletError;
use crate::mnid;
use crate::network::Faucet;
use crate::transaction::{IdentityCreation, TransactionPipeline, TransactionRequest};
use crate::types::{Address, BlockTag, NetworkId, TransactionReceipt};
use crate::Result;

pub const IDENTITY_MANAGER_CONTRACT: &str = "MetaIdentityManager";
pub const REGISTRY_CONTRACT: &str = "UportRegistry";

/// Addresses produced by a completed setup
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IdentitySetup {
    pub sender: Address,
    pub identity: Address,
    pub profile: Multihash,
}

pub struct IdentityWorkflow {
    config: WalletConfig,
    accounts: Arc<AccountManager>,
    pipeline: Arc<TransactionPipeline>,
    faucet: Arc<dyn Faucet>,
    content: Arc<dyn ContentStore>,
}

impl IdentityWorkflow {
    pub fn new(
        config: WalletConfig,
        pipeline: Arc<TransactionPipeline>,
        faucet: Arc<dyn Faucet>,
        content: Arc<dyn ContentStore>,
    ) -> Self {
        Self {
            accounts: pipeline.accounts().clone(),
            config,
            pipeline,
            faucet,
            content,
        }
    }

    async fn unlock(&self, address: &Address) -> Result<UnlockedAccount> {
        self.accounts
            .unlock_account(address)
            .await
            .ok_or(WalletError::UnlockFailed(*address))
    }

    /// Request test funds and wait for them. A declined request resolves
    /// with the empty receipt of the zero hash.
    pub async fn fund_address(&self, network: NetworkId, address: &Address) -> Result<TransactionReceipt> {
        let hash = self.faucet.request_funds(network, address).await?;
        self.pipeline.poller().wait_for_receipt(network, &hash).await
    }

    /// Create a funded account and deploy its identity proxy
    pub async fn new_identity(&self, network: NetworkId) -> Result<IdentityCreation> {
        let interface = self.config.network(network)?;

        let created = self.accounts.create_account().await?;
        let sender = created.address;
        log::info!("🆕 New account {}", sender);

        self.unlock(&sender).await?;
        self.fund_address(network, &sender).await?;
        self.pipeline.nonces().update_nonce(network, &sender).await?;

        let request = TransactionRequest::call(
            network,
            sender,
            IDENTITY_MANAGER_CONTRACT,
            "createIdentity",
            vec![sender.checksum(), sender.checksum()],
            interface.identity_manager,
        );
        self.pipeline.create_identity_transaction(&request).await
    }

    /// Upload the avatar, then the profile document referencing it
    pub async fn make_profile_object(
        &self,
        name: &str,
        image: &[u8],
        account: &UnlockedAccount,
        identity: &Address,
    ) -> Result<Multihash> {
        let image_hash = self
            .content
            .put(&format!("{}.png", uuid::Uuid::new_v4()), image.to_vec())
            .await?;

        let identity_mnid = mnid::encode_hex(identity, &self.config.profile_chain_id)?;
        let document = ProfileDocument::person(
            name,
            identity_mnid,
            &account.public_key,
            &self.config.profile_network,
            &image_hash,
        );
        let json = serde_json::to_vec_pretty(&document)
            .map_err(|e| WalletError::encoding(e.to_string()))?;

        let hash = self
            .content
            .put(&format!("{}.json", uuid::Uuid::new_v4()), json)
            .await?;
        log::info!("📄 Profile for {} stored as {}", identity, hash);
        Ok(hash)
    }

    /// Relay `UportRegistry.set(key, identity, digest)` through the identity proxy
    pub async fn forward_to(
        &self,
        network: NetworkId,
        sender: &Address,
        identity: &Address,
        destination: &Address,
        value: u64,
        registry_digest: &str,
    ) -> Result<Vec<String>> {
        let interface = self.config.network(network)?;

        let inner = self.pipeline.encode_call(
            REGISTRY_CONTRACT,
            "set",
            &[
                registration_key(),
                identity.to_lower_hex(),
                registry_digest.to_lowercase(),
            ],
        )?;

        let request = TransactionRequest::call(
            network,
            *sender,
            IDENTITY_MANAGER_CONTRACT,
            "forwardTo",
            vec![
                sender.to_lower_hex(),
                identity.to_lower_hex(),
                destination.to_lower_hex(),
                value.to_string(),
                format!("0x{}", hex::encode(inner)),
            ],
            interface.identity_manager,
        );
        self.pipeline.send_transaction(&request).await
    }

    /// Register a published profile for `identity` in the registry
    pub async fn connect_registry(
        &self,
        network: NetworkId,
        sender: &Address,
        identity: &Address,
        registry: &Address,
        profile: &Multihash,
    ) -> Result<Vec<String>> {
        let digest = registry_digest(profile);
        log::debug!("Registering {} (digest {})", profile, digest);

        self.pipeline.nonces().update_nonce(network, sender).await?;
        self.forward_to(network, sender, identity, registry, 0, &digest)
            .await
    }

    /// Run the whole saga. A failure is logged once and returned.
    pub async fn setup_identity(&self, network: NetworkId, name: &str, image: &[u8]) -> Result<IdentitySetup> {
        let result = self.run_setup(network, name, image).await;
        match &result {
            Ok(setup) => log::info!(
                "✅ Identity {} ready for {} (profile {})",
                setup.identity,
                setup.sender,
                setup.profile
            ),
            Err(e) => log::error!("Identity setup failed: {}", e),
        }
        result
    }

    async fn run_setup(&self, network: NetworkId, name: &str, image: &[u8]) -> Result<IdentitySetup> {
        let registry = self.config.network(network)?.registry;

        let creation = self.new_identity(network).await?;
        let sender = creation.sender;
        let identity = creation
            .identity
            .ok_or(WalletError::IdentityNotCreated(sender))?;

        self.pipeline.nonces().update_nonce(network, &sender).await?;
        let account = self.unlock(&sender).await?;

        let profile = self
            .make_profile_object(name, image, &account, &identity)
            .await?;
        self.connect_registry(network, &sender, &identity, &registry, &profile)
            .await?;

        Ok(IdentitySetup {
            sender,
            identity,
            profile,
        })
    }

    /// Read the registered profile of `identity`. `None` when nothing is registered.
    pub async fn get_identity_profile(
        &self,
        network: NetworkId,
        sender: &Address,
        identity: &Address,
    ) -> Result<Option<ProfileDocument>> {
        let interface = self.config.network(network)?;

        let data = self.pipeline.encode_call(
            REGISTRY_CONTRACT,
            "get",
            &[registration_key(), identity.checksum(), identity.checksum()],
        )?;
        let word = self
            .accounts
            .client()
            .call(network, sender, &interface.registry, &data, BlockTag::Latest)
            .await?;

        if word.len() < 32 || crate::transaction::abi::is_zero_word(&word[..32]) {
            log::info!("No profile registered for {}", identity);
            return Ok(None);
        }

        let mut digest = [0u8; 32];
        digest.copy_from_slice(&word[..32]);
        let hash = Multihash::sha2_256(&digest);

        let bytes = self.content.get(&hash).await?;
        let document = serde_json::from_slice(&bytes)
            .map_err(|e| WalletError::ContentStore(format!("{} is not a profile: {}", hash, e)))?;
        Ok(Some(document))
    }
}
