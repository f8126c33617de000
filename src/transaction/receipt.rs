use std::sync::Arc;
use std::time::Duration;

use crate::error::WalletError;
use crate::network::NetworkClient;
use crate::scheduler::Scheduler;
use crate::types::{NetworkId, TransactionReceipt, TxHash};
use crate::Result;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Receipt polling cadence and optional bounds.
///
/// Both bounds default to `None`: polling continues until the transaction
/// is mined or the network reports an error. `timeout` counts scheduler
/// ticks times `interval`, not wall-clock time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub timeout: Option<Duration>,
    pub max_attempts: Option<u32>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            timeout: None,
            max_attempts: None,
        }
    }
}

pub struct ReceiptPoller {
    client: Arc<dyn NetworkClient>,
    scheduler: Arc<dyn Scheduler>,
    policy: PollPolicy,
}

impl ReceiptPoller {
    pub fn new(client: Arc<dyn NetworkClient>, scheduler: Arc<dyn Scheduler>, policy: PollPolicy) -> Self {
        Self {
            client,
            scheduler,
            policy,
        }
    }

    pub fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    /// Poll once per interval until a receipt with a positive block number arrives.
    ///
    /// The zero hash resolves at once with the default receipt. A network
    /// error ends polling and is returned as is.
    pub async fn wait_for_receipt(&self, network: NetworkId, hash: &TxHash) -> Result<TransactionReceipt> {
        if hash.is_zero() {
            return Ok(TransactionReceipt::default());
        }

        let mut ticker = self.scheduler.ticker(self.policy.interval);
        let mut attempts = 0u32;

        loop {
            ticker.tick().await;
            attempts += 1;

            match self.client.get_transaction_receipt(network, hash).await? {
                Some(receipt) if receipt.is_mined() => {
                    log::info!("✓ {} mined in block {}", hash, receipt.block_number);
                    return Ok(receipt);
                }
                _ => log::trace!("{} not mined yet (poll {})", hash, attempts),
            }

            let out_of_attempts = self.policy.max_attempts.map_or(false, |max| attempts >= max);
            let out_of_time = self
                .policy
                .timeout
                .map_or(false, |timeout| self.policy.interval * attempts >= timeout);
            if out_of_attempts || out_of_time {
                log::warn!("Gave up waiting for {} after {} polls", hash, attempts);
                return Err(WalletError::ReceiptTimeout {
                    hash: *hash,
                    attempts,
                });
            }
        }
    }
}
