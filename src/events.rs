//! Change notifications
//!
//! Account and network cache changes are published on a broadcast channel.
//! Delivery is fire-and-forget: publishing never blocks, a hub without
//! subscribers drops events, and a lagging subscriber loses the oldest ones.

use primitive_types::U256;
use tokio::sync::broadcast;

use crate::types::{Address, TransactionInfo};

pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

#[derive(Clone, Debug, PartialEq)]
pub enum SyncMarker {
    /// Network snapshot sync time (unix seconds)
    Date(i64),
    /// Transaction history synced for one account
    Block {
        address: Address,
        highest_block_number: i64,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub enum WalletEvent {
    AddedAccount {
        address: Address,
    },
    RemovedAccount {
        address: Address,
    },
    ChangedActiveAccount {
        address: Option<Address>,
    },
    ReorderedAccounts,
    BalanceChanged {
        address: Address,
        balance: U256,
    },
    TransactionChanged {
        address: Address,
        transaction: TransactionInfo,
    },
    AccountTransactionsUpdated {
        address: Address,
        highest_block_number: i64,
    },
    ChangedNickname {
        address: Address,
        nickname: String,
    },
    DidSync(SyncMarker),
}

/// Publisher side of the event channel. Cloning shares the same channel.
#[derive(Clone)]
pub struct EventHub {
    sender: broadcast::Sender<WalletEvent>,
}

impl EventHub {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WalletEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of subscribers that received the event
    pub fn publish(&self, event: WalletEvent) -> usize {
        log::trace!("event: {:?}", event);
        self.sender.send(event).unwrap_or(0)
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}

/// Drain everything currently buffered for `receiver` without waiting
pub fn drain(receiver: &mut broadcast::Receiver<WalletEvent>) -> Vec<WalletEvent> {
    let mut events = Vec::new();
    loop {
        match receiver.try_recv() {
            Ok(event) => events.push(event),
            Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                log::warn!("Subscriber lagged, {} events dropped", skipped);
            }
            Err(_) => break,
        }
    }
    events
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_without_subscribers_is_silent() {
        let hub = EventHub::new();
        assert_eq!(hub.publish(WalletEvent::ReorderedAccounts), 0);
    }

    #[test]
    fn test_every_subscriber_sees_events() {
        let hub = EventHub::new();
        let mut first = hub.subscribe();
        let mut second = hub.clone().subscribe();

        assert_eq!(hub.publish(WalletEvent::ReorderedAccounts), 2);
        assert_eq!(drain(&mut first), vec![WalletEvent::ReorderedAccounts]);
        assert_eq!(drain(&mut second), vec![WalletEvent::ReorderedAccounts]);
        assert!(drain(&mut first).is_empty());
    }
}
