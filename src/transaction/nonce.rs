use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::network::NetworkClient;
use crate::types::{Address, BlockTag, NetworkId};
use crate::Result;

/// Next nonce per sender, as last observed on the network.
///
/// Values are never incremented locally; refresh right before each
/// transaction that needs one.
pub struct NonceSequencer {
    client: Arc<dyn NetworkClient>,
    nonces: RwLock<HashMap<Address, u64>>,
}

impl NonceSequencer {
    pub fn new(client: Arc<dyn NetworkClient>) -> Self {
        Self {
            client,
            nonces: RwLock::new(HashMap::new()),
        }
    }

    /// Record the pending transaction count of `address` as its next nonce
    pub async fn update_nonce(&self, network: NetworkId, address: &Address) -> Result<u64> {
        let nonce = self
            .client
            .get_transaction_count(network, address, BlockTag::Pending)
            .await?;
        log::debug!("Next nonce for {} is {}", address, nonce);
        self.nonces.write().insert(*address, nonce);
        Ok(nonce)
    }

    pub fn current(&self, address: &Address) -> Option<u64> {
        self.nonces.read().get(address).copied()
    }
}
