//! In-process fan-out of queue-updated events

use async_trait::async_trait;
use boothline_core::domain::QueueUpdated;
use boothline_core::error::Result;
use boothline_core::port::QueueNotifier;
use tokio::sync::broadcast;
use tracing::trace;

const DEFAULT_CAPACITY: usize = 1024;

/// Broadcasts every event to all live subscribers; each subscriber filters by booth
#[derive(Clone)]
pub struct BroadcastNotifier {
    tx: broadcast::Sender<QueueUpdated>,
}

impl Default for BroadcastNotifier {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl BroadcastNotifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<QueueUpdated> {
        self.tx.subscribe()
    }
}

#[async_trait]
impl QueueNotifier for BroadcastNotifier {
    async fn publish(&self, event: QueueUpdated) -> Result<()> {
        // No receivers is normal when nobody watches the booth
        match self.tx.send(event) {
            Ok(receivers) => trace!(receivers = receivers, "Queue update broadcast"),
            Err(_) => trace!("Queue update dropped, no subscribers"),
        }
        Ok(())
    }
}
