// Queue Notification Port (real-time fan-out)

use crate::domain::QueueUpdated;
use crate::error::Result;
use async_trait::async_trait;

/// Pushes queue-updated events to every subscriber of a booth's queue.
/// Delivery is best effort; the engine never rolls back on failure.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QueueNotifier: Send + Sync {
    async fn publish(&self, event: QueueUpdated) -> Result<()>;
}

pub mod mocks {
    use super::*;
    use std::sync::Mutex;

    /// Keeps every published event for assertions
    #[derive(Default)]
    pub struct RecordingNotifier {
        events: Mutex<Vec<QueueUpdated>>,
    }

    impl RecordingNotifier {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn events(&self) -> Vec<QueueUpdated> {
            self.events.lock().map(|e| e.clone()).unwrap_or_default()
        }
    }

    #[async_trait]
    impl QueueNotifier for RecordingNotifier {
        async fn publish(&self, event: QueueUpdated) -> Result<()> {
            if let Ok(mut events) = self.events.lock() {
                events.push(event);
            }
            Ok(())
        }
    }
}
