// Queue Repository Port (Interface)

use crate::domain::{BoothId, Queue, Version};
use crate::error::Result;
use async_trait::async_trait;

/// Persistence for queue documents, one record per booth.
///
/// Writes are conditional on the stored `version`, which is the only
/// concurrency control the engine relies on.
#[async_trait]
pub trait QueueRepository: Send + Sync {
    /// Load a queue; the returned `version` is the stored revision
    async fn find(&self, booth_id: &str) -> Result<Option<Queue>>;

    /// Store `queue` at version 1 unless the booth already has one.
    /// Returns whichever document is stored afterwards.
    async fn insert_if_absent(&self, queue: &Queue) -> Result<Queue>;

    /// Replace the document iff its stored version equals `expected_version`.
    /// The stored version becomes `queue.version`. Returns false on conflict.
    async fn compare_and_swap(&self, queue: &Queue, expected_version: Version) -> Result<bool>;

    /// All booths that own a queue
    async fn list_booth_ids(&self) -> Result<Vec<BoothId>>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::error::AppError;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    /// In-memory repository with injectable write conflicts
    #[derive(Default)]
    pub struct InMemoryQueueRepository {
        queues: Mutex<BTreeMap<BoothId, Queue>>,
        conflicts_to_inject: AtomicU32,
        cas_calls: AtomicU32,
    }

    impl InMemoryQueueRepository {
        pub fn new() -> Self {
            Self::default()
        }

        /// Make the next `n` compare-and-swap calls fail as if another writer won
        pub fn inject_conflicts(&self, n: u32) {
            self.conflicts_to_inject.store(n, Ordering::SeqCst);
        }

        pub fn cas_calls(&self) -> u32 {
            self.cas_calls.load(Ordering::SeqCst)
        }

        fn lock(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<BoothId, Queue>>> {
            self.queues
                .lock()
                .map_err(|_| AppError::Internal("queue map poisoned".to_string()))
        }
    }

    #[async_trait]
    impl QueueRepository for InMemoryQueueRepository {
        async fn find(&self, booth_id: &str) -> Result<Option<Queue>> {
            Ok(self.lock()?.get(booth_id).cloned())
        }

        async fn insert_if_absent(&self, queue: &Queue) -> Result<Queue> {
            let mut queues = self.lock()?;
            let stored = queues.entry(queue.booth_id.clone()).or_insert_with(|| {
                let mut fresh = queue.clone();
                fresh.version = 1;
                fresh
            });
            Ok(stored.clone())
        }

        async fn compare_and_swap(&self, queue: &Queue, expected_version: Version) -> Result<bool> {
            self.cas_calls.fetch_add(1, Ordering::SeqCst);

            let injected = self
                .conflicts_to_inject
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if injected {
                return Ok(false);
            }

            let mut queues = self.lock()?;
            match queues.get_mut(&queue.booth_id) {
                Some(stored) if stored.version == expected_version => {
                    *stored = queue.clone();
                    Ok(true)
                }
                Some(_) => Ok(false),
                None => Err(AppError::NotFound(format!("Queue {} not found", queue.booth_id))),
            }
        }

        async fn list_booth_ids(&self) -> Result<Vec<BoothId>> {
            Ok(self.lock()?.keys().cloned().collect())
        }
    }
}
