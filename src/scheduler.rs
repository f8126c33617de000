//! Timer abstraction for periodic work (receipt polling, keychain resync)
//!
//! Production code uses [`TokioScheduler`]. Tests inject
//! [`ImmediateScheduler`] or [`ManualScheduler`] to drive ticks without
//! real delays.

use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::broadcast;

/// A recurring timer. Each call to `tick` waits for the next period.
#[async_trait]
pub trait Ticker: Send {
    async fn tick(&mut self);
}

pub trait Scheduler: Send + Sync {
    /// Start a ticker whose first tick fires one `period` from now
    fn ticker(&self, period: Duration) -> Box<dyn Ticker>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct TokioScheduler;

struct TokioTicker {
    interval: tokio::time::Interval,
}

#[async_trait]
impl Ticker for TokioTicker {
    async fn tick(&mut self) {
        self.interval.tick().await;
    }
}

impl Scheduler for TokioScheduler {
    fn ticker(&self, period: Duration) -> Box<dyn Ticker> {
        let start = tokio::time::Instant::now() + period;
        let mut interval = tokio::time::interval_at(start, period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        Box::new(TokioTicker { interval })
    }
}

/// Ticks as fast as the runtime polls it
#[derive(Clone, Copy, Debug, Default)]
pub struct ImmediateScheduler;

struct ImmediateTicker;

#[async_trait]
impl Ticker for ImmediateTicker {
    async fn tick(&mut self) {
        tokio::task::yield_now().await;
    }
}

impl Scheduler for ImmediateScheduler {
    fn ticker(&self, _period: Duration) -> Box<dyn Ticker> {
        Box::new(ImmediateTicker)
    }
}

/// Ticks only when [`ManualScheduler::advance`] is called.
///
/// Every ticker created from the same scheduler observes every advance made
/// after its creation.
#[derive(Clone)]
pub struct ManualScheduler {
    sender: broadcast::Sender<()>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(64);
        Self { sender }
    }

    /// Fire one tick on every live ticker
    pub fn advance(&self) -> usize {
        self.sender.send(()).unwrap_or(0)
    }

    pub fn ticker_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ManualScheduler {
    fn default() -> Self {
        Self::new()
    }
}

struct ManualTicker {
    receiver: broadcast::Receiver<()>,
}

#[async_trait]
impl Ticker for ManualTicker {
    async fn tick(&mut self) {
        loop {
            match self.receiver.recv().await {
                Ok(()) | Err(broadcast::error::RecvError::Lagged(_)) => return,
                // Scheduler dropped: never tick again
                Err(broadcast::error::RecvError::Closed) => std::future::pending::<()>().await,
            }
        }
    }
}

impl Scheduler for ManualScheduler {
    fn ticker(&self, _period: Duration) -> Box<dyn Ticker> {
        Box::new(ManualTicker {
            receiver: self.sender.subscribe(),
        })
    }
}
