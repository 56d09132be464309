// QueueDirectory - booth -> queue resolution and the transaction funnel
//
// Every mutating operation runs as: read document -> apply engine
// transition on a copy -> conditional write on the read version. A lost
// race re-runs the whole operation from a fresh read.

use crate::application::constants::{
    DEFAULT_MAX_CONTENTION_RETRIES, DEFAULT_RETRY_BASE_DELAY_MS, MAX_RETRY_DELAY_MS,
};
use crate::application::engine::QueueEngine;
use crate::domain::{
    EntryView, JoinReceipt, LeaveReceipt, Queue, QueueSettings, QueueSnapshot, QueueStatus,
    QueueUpdated, SettingsUpdate, UserPosition,
};
use crate::error::{AppError, Result};
use crate::port::{IdProvider, QueueNotifier, QueueRepository, TimeProvider};
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Bounded retry policy for write conflicts
#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    /// Total attempts per operation (at least 1)
    pub max_attempts: u32,
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_CONTENTION_RETRIES,
            base_delay_ms: DEFAULT_RETRY_BASE_DELAY_MS,
        }
    }
}

impl RetryConfig {
    /// Exponential backoff with full jitter on top
    fn delay(&self, attempt: u32) -> Duration {
        let exp = self
            .base_delay_ms
            .saturating_mul(1u64 << attempt.saturating_sub(1).min(16));
        let jitter = rand::thread_rng().gen_range(0..=self.base_delay_ms);
        Duration::from_millis(exp.saturating_add(jitter).min(MAX_RETRY_DELAY_MS))
    }
}

/// What one sweep of a queue did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub expired: usize,
    pub advanced: bool,
}

pub struct QueueDirectory {
    repo: Arc<dyn QueueRepository>,
    notifier: Arc<dyn QueueNotifier>,
    id_provider: Arc<dyn IdProvider>,
    time_provider: Arc<dyn TimeProvider>,
    engine: QueueEngine,
    default_settings: QueueSettings,
    retry: RetryConfig,
}

impl QueueDirectory {
    pub fn new(
        repo: Arc<dyn QueueRepository>,
        notifier: Arc<dyn QueueNotifier>,
        id_provider: Arc<dyn IdProvider>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            repo,
            notifier,
            id_provider,
            time_provider,
            engine: QueueEngine::default(),
            default_settings: QueueSettings::default(),
            retry: RetryConfig::default(),
        }
    }

    pub fn with_engine(mut self, engine: QueueEngine) -> Self {
        self.engine = engine;
        self
    }

    /// Settings copied into queues created by `join`
    pub fn with_default_settings(mut self, settings: QueueSettings) -> Self {
        self.default_settings = settings;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// GetOrCreate: the only place a queue is constructed
    pub async fn get_or_create(
        &self,
        booth_id: &str,
        event_id: &str,
        default_settings: QueueSettings,
    ) -> Result<Queue> {
        if booth_id.trim().is_empty() {
            return Err(AppError::Validation("booth_id must not be empty".to_string()));
        }

        if let Some(queue) = self.repo.find(booth_id).await? {
            return Ok(queue);
        }

        default_settings.validate()?;
        let now = self.time_provider.now_millis();
        let queue = self
            .repo
            .insert_if_absent(&Queue::new(booth_id, event_id, default_settings, now))
            .await?;

        info!(
            booth_id = %booth_id,
            event_id = %queue.event_id,
            max_queue_size = queue.settings.max_queue_size,
            "Queue resolved for booth"
        );
        Ok(queue)
    }

    /// Join, creating the booth's queue on first use
    pub async fn join(&self, booth_id: &str, event_id: &str, user_id: &str) -> Result<JoinReceipt> {
        if user_id.trim().is_empty() {
            return Err(AppError::Validation("user_id must not be empty".to_string()));
        }
        self.get_or_create(booth_id, event_id, self.default_settings)
            .await?;

        self.transact(booth_id, |engine, queue, now| {
            engine.expire_stale(queue, now);
            engine.join(queue, user_id, now)
        })
        .await
    }

    pub async fn leave(
        &self,
        booth_id: &str,
        user_id: &str,
        leave_message: Option<String>,
    ) -> Result<LeaveReceipt> {
        self.transact(booth_id, |engine, queue, now| {
            engine.expire_stale(queue, now);
            engine.leave(queue, user_id, leave_message.clone(), now)
        })
        .await
    }

    /// `Ok(None)` means nobody is waiting; it is not an error
    pub async fn serve_next(&self, booth_id: &str) -> Result<Option<EntryView>> {
        self.transact(booth_id, |engine, queue, now| {
            engine.expire_stale(queue, now);
            engine.serve_next(queue, now)
        })
        .await
    }

    pub async fn complete_current(&self, booth_id: &str) -> Result<Option<EntryView>> {
        self.transact(booth_id, |engine, queue, now| {
            engine.expire_stale(queue, now);
            engine.complete_current(queue, now)
        })
        .await
    }

    /// Read-only; never expires or otherwise mutates the queue
    pub async fn status(&self, booth_id: &str) -> Result<QueueSnapshot> {
        let queue = self.load(booth_id).await?;
        Ok(self.engine.status(&queue))
    }

    pub async fn user_position(&self, booth_id: &str, user_id: &str) -> Result<Option<UserPosition>> {
        let queue = self.load(booth_id).await?;
        Ok(self.engine.user_position(&queue, user_id))
    }

    pub async fn update_settings(
        &self,
        booth_id: &str,
        update: SettingsUpdate,
    ) -> Result<QueueSettings> {
        self.transact(booth_id, |engine, queue, _now| {
            engine.update_settings(queue, &update)
        })
        .await
    }

    /// Returns the previous status
    pub async fn update_status(&self, booth_id: &str, status: QueueStatus) -> Result<QueueStatus> {
        self.transact(booth_id, |engine, queue, _now| {
            Ok(engine.update_status(queue, status))
        })
        .await
    }

    /// Time-based housekeeping for one queue: expiry and auto-advance
    pub async fn sweep(&self, booth_id: &str) -> Result<SweepReport> {
        self.transact(booth_id, |engine, queue, now| {
            let expired = engine.expire_stale(queue, now).len();
            let advanced = if engine.auto_advance_due(queue, now) {
                match engine.serve_next(queue, now)? {
                    Some(_) => true,
                    None => engine.complete_current(queue, now)?.is_some(),
                }
            } else {
                false
            };
            Ok(SweepReport { expired, advanced })
        })
        .await
    }

    pub async fn booth_ids(&self) -> Result<Vec<String>> {
        self.repo.list_booth_ids().await
    }

    async fn load(&self, booth_id: &str) -> Result<Queue> {
        self.repo
            .find(booth_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Queue for booth {} not found", booth_id)))
    }

    /// Run `op` as one optimistic transaction on the booth's queue.
    ///
    /// Domain errors abort without writing. Unchanged documents are not
    /// written. Conflicts retry from a fresh read up to `max_attempts`.
    async fn transact<T, F>(&self, booth_id: &str, op: F) -> Result<T>
    where
        F: Fn(&QueueEngine, &mut Queue, i64) -> crate::domain::error::Result<T> + Send,
        T: Send,
    {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;

            let stored = self.load(booth_id).await?;
            let now = self.time_provider.now_millis();
            let mut queue = stored.clone();

            let value = op(&self.engine, &mut queue, now)?;

            if queue == stored {
                debug!(booth_id = %booth_id, "No change, skipping write");
                return Ok(value);
            }

            let expected = stored.version;
            queue.version = expected + 1;
            queue.updated_at = now;

            if self.repo.compare_and_swap(&queue, expected).await? {
                debug!(
                    booth_id = %booth_id,
                    version = queue.version,
                    attempt = attempt,
                    "Queue transition committed"
                );
                self.publish(&queue, now).await;
                return Ok(value);
            }

            if attempt >= max_attempts {
                warn!(
                    booth_id = %booth_id,
                    attempts = attempt,
                    "Giving up after repeated write conflicts"
                );
                return Err(AppError::Contention {
                    booth_id: booth_id.to_string(),
                    attempts: attempt,
                });
            }

            let delay = self.retry.delay(attempt);
            debug!(
                booth_id = %booth_id,
                attempt = attempt,
                delay_ms = delay.as_millis() as u64,
                "Write conflict, retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }

    async fn publish(&self, queue: &Queue, now: i64) {
        let event = QueueUpdated {
            event_id: self.id_provider.generate_id(),
            booth_id: queue.booth_id.clone(),
            snapshot: self.engine.status(queue),
            timestamp: now,
        };
        if let Err(e) = self.notifier.publish(event).await {
            warn!(booth_id = %queue.booth_id, error = %e, "Failed to publish queue update");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DomainError, EntryStatus};
    use crate::error::ErrorKind;
    use crate::port::id_provider::mocks::SequentialIdProvider;
    use crate::port::notifier::mocks::RecordingNotifier;
    use crate::port::notifier::MockQueueNotifier;
    use crate::port::queue_repository::mocks::InMemoryQueueRepository;
    use crate::port::time_provider::mocks::ManualClock;
    use std::collections::HashSet;
    use tokio_test::{assert_err, assert_ok};

    struct Fixture {
        repo: Arc<InMemoryQueueRepository>,
        notifier: Arc<RecordingNotifier>,
        clock: Arc<ManualClock>,
        directory: Arc<QueueDirectory>,
    }

    fn fixture(max_queue_size: u32) -> Fixture {
        let repo = Arc::new(InMemoryQueueRepository::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let clock = Arc::new(ManualClock::new(1_700_000_000_000));
        let directory = QueueDirectory::new(
            repo.clone(),
            notifier.clone(),
            Arc::new(SequentialIdProvider::default()),
            clock.clone(),
        )
        .with_default_settings(QueueSettings {
            max_queue_size,
            ..Default::default()
        })
        .with_retry(RetryConfig {
            max_attempts: 4,
            base_delay_ms: 1,
        });
        Fixture {
            repo,
            notifier,
            clock,
            directory: Arc::new(directory),
        }
    }

    #[tokio::test]
    async fn test_get_or_create_is_idempotent() {
        let f = fixture(10);
        let first = f
            .directory
            .get_or_create("booth-1", "fair", QueueSettings::default())
            .await
            .unwrap();
        assert_eq!(first.version, 1);

        let custom = QueueSettings {
            max_queue_size: 3,
            ..Default::default()
        };
        let second = f
            .directory
            .get_or_create("booth-1", "other-fair", custom)
            .await
            .unwrap();
        assert_eq!(second, first);
        assert_eq!(f.repo.list_booth_ids().await.unwrap(), vec!["booth-1"]);
    }

    #[tokio::test]
    async fn test_get_or_create_rejects_bad_defaults() {
        let f = fixture(10);
        let bad = QueueSettings {
            max_queue_size: 0,
            ..Default::default()
        };
        let err = f
            .directory
            .get_or_create("booth-1", "fair", bad)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(f.repo.find("booth-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_join_creates_queue_and_notifies() {
        let f = fixture(10);
        let receipt = f.directory.join("booth-1", "fair", "alice").await.unwrap();
        assert_eq!(receipt.token_number, 1);
        assert_eq!(receipt.position, 1);

        let stored = f.repo.find("booth-1").await.unwrap().unwrap();
        assert_eq!(stored.version, 2);
        assert_eq!(stored.last_token, 1);

        let events = f.notifier.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_id, "evt-1");
        assert_eq!(events[0].snapshot.waiting_count, 1);
    }

    #[tokio::test]
    async fn test_rejected_operations_do_not_write() {
        let f = fixture(1);
        assert_ok!(f.directory.join("booth-1", "fair", "alice").await);
        let version = f.repo.find("booth-1").await.unwrap().unwrap().version;

        let err = f.directory.join("booth-1", "fair", "bob").await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Domain(DomainError::QueueFull { max_queue_size: 1 })
        ));
        assert_err!(f.directory.leave("booth-1", "bob", None).await);

        assert_eq!(f.repo.find("booth-1").await.unwrap().unwrap().version, version);
        assert_eq!(f.notifier.events().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_booth_is_not_found() {
        let f = fixture(10);
        for err in [
            f.directory.serve_next("nope").await.unwrap_err(),
            f.directory.status("nope").await.unwrap_err(),
            f.directory.leave("nope", "alice", None).await.unwrap_err(),
        ] {
            assert_eq!(err.kind(), ErrorKind::NotFound);
        }
    }

    #[tokio::test]
    async fn test_serve_next_on_empty_queue_is_not_an_error() {
        let f = fixture(10);
        f.directory
            .get_or_create("booth-1", "fair", QueueSettings::default())
            .await
            .unwrap();
        assert_eq!(f.directory.serve_next("booth-1").await.unwrap(), None);
        assert!(f.notifier.events().is_empty());
        assert_eq!(f.repo.cas_calls(), 0);
    }

    #[tokio::test]
    async fn test_conflicts_are_retried() {
        let f = fixture(10);
        f.directory.join("booth-1", "fair", "alice").await.unwrap();

        f.repo.inject_conflicts(2);
        let receipt = f.directory.join("booth-1", "fair", "bob").await.unwrap();
        assert_eq!(receipt.token_number, 2);
        // 1 for alice, 3 for bob
        assert_eq!(f.repo.cas_calls(), 4);
        assert_eq!(f.notifier.events().len(), 2);
    }

    #[tokio::test]
    async fn test_contention_surfaces_after_bounded_retries() {
        let f = fixture(10);
        f.directory.join("booth-1", "fair", "alice").await.unwrap();
        let before = f.repo.find("booth-1").await.unwrap().unwrap();

        f.repo.inject_conflicts(100);
        let err = f.directory.serve_next("booth-1").await.unwrap_err();
        assert!(matches!(err, AppError::Contention { attempts: 4, .. }));
        assert!(err.is_transient());
        assert_eq!(f.repo.find("booth-1").await.unwrap().unwrap(), before);
    }

    #[tokio::test]
    async fn test_lazy_expiry_on_join() {
        let f = fixture(1);
        f.directory.join("booth-1", "fair", "alice").await.unwrap();
        f.clock.advance_minutes(31);

        // alice's token expired, so the single slot is free again
        let receipt = f.directory.join("booth-1", "fair", "bob").await.unwrap();
        assert_eq!(receipt.token_number, 2);

        let stored = f.repo.find("booth-1").await.unwrap().unwrap();
        assert_eq!(stored.entries[0].status, EntryStatus::Expired);
        assert_eq!(stored.stats.total_expired, 1);
    }

    #[tokio::test]
    async fn test_status_does_not_expire() {
        let f = fixture(5);
        f.directory.join("booth-1", "fair", "alice").await.unwrap();
        f.clock.advance_minutes(120);

        let first = f.directory.status("booth-1").await.unwrap();
        let second = f.directory.status("booth-1").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.waiting_count, 1);
        assert!(f.directory.user_position("booth-1", "alice").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_sweep_expires_and_auto_advances() {
        let f = fixture(5);
        f.directory.join("booth-1", "fair", "alice").await.unwrap();
        f.directory.join("booth-1", "fair", "bob").await.unwrap();
        f.directory
            .update_settings(
                "booth-1",
                SettingsUpdate {
                    auto_advance_interval: Some(10),
                    token_expiry_minutes: Some(60),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        f.directory.serve_next("booth-1").await.unwrap();

        f.clock.advance_minutes(5);
        assert_eq!(
            f.directory.sweep("booth-1").await.unwrap(),
            SweepReport::default()
        );

        f.clock.advance_minutes(5);
        let report = f.directory.sweep("booth-1").await.unwrap();
        assert!(report.advanced);
        assert_eq!(f.directory.status("booth-1").await.unwrap().current_serving, 2);

        // Nobody left to call: the last interview is closed out
        f.clock.advance_minutes(10);
        assert!(f.directory.sweep("booth-1").await.unwrap().advanced);
        let status = f.directory.status("booth-1").await.unwrap();
        assert_eq!(status.current_serving, 0);
        assert_eq!(status.stats.total_served, 2);
    }

    #[tokio::test]
    async fn test_invalid_settings_rejected() {
        let f = fixture(5);
        f.directory.join("booth-1", "fair", "alice").await.unwrap();
        let err = f
            .directory
            .update_settings(
                "booth-1",
                SettingsUpdate {
                    token_expiry_minutes: Some(121),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_update_status_blocks_joins() {
        let f = fixture(5);
        f.directory.join("booth-1", "fair", "alice").await.unwrap();
        let previous = f
            .directory
            .update_status("booth-1", QueueStatus::Paused)
            .await
            .unwrap();
        assert_eq!(previous, QueueStatus::Active);

        let err = f.directory.join("booth-1", "fair", "bob").await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Domain(DomainError::QueueNotAccepting {
                status: QueueStatus::Paused
            })
        ));
    }

    #[tokio::test]
    async fn test_every_commit_publishes_once() {
        let repo = Arc::new(InMemoryQueueRepository::new());
        let mut notifier = MockQueueNotifier::new();
        notifier
            .expect_publish()
            .withf(|event| event.booth_id == "booth-1")
            .times(3)
            .returning(|_| Ok(()));

        let directory = QueueDirectory::new(
            repo,
            Arc::new(notifier),
            Arc::new(SequentialIdProvider::default()),
            Arc::new(ManualClock::new(0)),
        );
        directory.join("booth-1", "fair", "alice").await.unwrap();
        directory.serve_next("booth-1").await.unwrap();
        directory.serve_next("booth-1").await.unwrap(); // nothing to do
        directory.leave("booth-1", "alice", None).await.unwrap();
    }

    #[tokio::test]
    async fn test_notifier_failure_does_not_undo_commit() {
        let repo = Arc::new(InMemoryQueueRepository::new());
        let mut notifier = MockQueueNotifier::new();
        notifier
            .expect_publish()
            .returning(|_| Err(AppError::Internal("channel closed".to_string())));

        let directory = QueueDirectory::new(
            repo.clone(),
            Arc::new(notifier),
            Arc::new(SequentialIdProvider::default()),
            Arc::new(ManualClock::new(0)),
        );
        assert_ok!(directory.join("booth-1", "fair", "alice").await);
        assert_eq!(repo.find("booth-1").await.unwrap().unwrap().last_token, 1);
    }

    /// Holds back its first event so a later commit is delivered before it
    #[derive(Default)]
    struct SlowFirstNotifier {
        delayed: std::sync::atomic::AtomicBool,
        events: std::sync::Mutex<Vec<QueueUpdated>>,
    }

    #[async_trait::async_trait]
    impl QueueNotifier for SlowFirstNotifier {
        async fn publish(&self, event: QueueUpdated) -> Result<()> {
            if !self.delayed.swap(true, std::sync::atomic::Ordering::SeqCst) {
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
            self.events.lock().unwrap().push(event);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_out_of_order_delivery_is_detectable_by_version() {
        let notifier = Arc::new(SlowFirstNotifier::default());
        let directory = Arc::new(QueueDirectory::new(
            Arc::new(InMemoryQueueRepository::new()),
            notifier.clone(),
            Arc::new(SequentialIdProvider::default()),
            Arc::new(ManualClock::new(1_700_000_000_000)),
        ));

        let first = {
            let directory = directory.clone();
            tokio::spawn(async move { directory.join("booth-1", "fair", "u1").await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_ok!(directory.join("booth-1", "fair", "u2").await);
        assert_ok!(first.await.unwrap());

        let events = notifier.events.lock().unwrap().clone();
        assert_eq!(events.len(), 2);
        // Delivered newest first, same clock reading
        assert_eq!(events[0].timestamp, events[1].timestamp);
        assert!(events[0].snapshot.version > events[1].snapshot.version);

        let latest = events
            .iter()
            .max_by_key(|e| e.snapshot.version)
            .unwrap();
        let stored = directory.status("booth-1").await.unwrap();
        assert_eq!(latest.snapshot.version, stored.version);
        assert_eq!(latest.snapshot.waiting_count, 2);
        assert_eq!(stored.waiting_count, 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_joins_issue_unique_tokens() {
        let f = fixture(100);
        let directory = QueueDirectory::new(
            f.repo.clone(),
            f.notifier.clone(),
            Arc::new(SequentialIdProvider::default()),
            f.clock.clone(),
        )
        .with_default_settings(QueueSettings {
            max_queue_size: 100,
            ..Default::default()
        })
        .with_retry(RetryConfig {
            max_attempts: 50,
            base_delay_ms: 1,
        });
        let directory = Arc::new(directory);

        let mut handles = Vec::new();
        for i in 0..32 {
            let directory = directory.clone();
            handles.push(tokio::spawn(async move {
                directory
                    .join("booth-1", "fair", &format!("user-{}", i))
                    .await
            }));
        }

        let mut tokens = HashSet::new();
        for handle in handles {
            match handle.await.unwrap() {
                Ok(receipt) => assert!(tokens.insert(receipt.token_number)),
                Err(e) => assert_eq!(e.kind(), ErrorKind::Contention),
            }
        }

        let stored = f.repo.find("booth-1").await.unwrap().unwrap();
        assert_eq!(stored.last_token as usize, tokens.len());
        assert_eq!(stored.entries.len(), tokens.len());
        assert_eq!(stored.stats.total_tokens_issued as usize, tokens.len());
    }
}
