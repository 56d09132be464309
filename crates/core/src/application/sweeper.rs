// Expiry Sweeper - periodic expiry and auto-advance for every queue

use crate::application::constants::DEFAULT_SWEEP_INTERVAL;
use crate::application::directory::QueueDirectory;
use crate::application::shutdown::ShutdownSignal;
use crate::error::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info, warn};

/// Totals for one pass over all queues
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepSummary {
    pub queues: usize,
    pub expired: usize,
    pub advanced: usize,
    pub failed: usize,
}

/// Background task visiting every queue on a fixed interval.
///
/// Complements the lazy expiry done inside each mutating transaction, so
/// idle queues do not report stale positions.
pub struct ExpirySweeper {
    directory: Arc<QueueDirectory>,
    interval: Duration,
}

impl ExpirySweeper {
    pub fn new(directory: Arc<QueueDirectory>) -> Self {
        Self {
            directory,
            interval: DEFAULT_SWEEP_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Run until `shutdown` fires. Should be spawned in tokio::spawn
    pub async fn run(self, mut shutdown: ShutdownSignal) {
        info!(
            interval_secs = self.interval.as_secs(),
            "Expiry sweeper started"
        );

        let mut tick = interval(self.interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.triggered() => break,
                _ = tick.tick() => {
                    if let Err(e) = self.sweep_all().await {
                        error!(error = %e, "Sweep pass failed");
                    }
                }
            }
        }

        info!("Expiry sweeper stopped");
    }

    /// One pass over every queue; a failing queue does not stop the pass
    pub async fn sweep_all(&self) -> Result<SweepSummary> {
        let booth_ids = self.directory.booth_ids().await?;
        let mut summary = SweepSummary {
            queues: booth_ids.len(),
            ..Default::default()
        };

        for booth_id in booth_ids {
            match self.directory.sweep(&booth_id).await {
                Ok(report) => {
                    summary.expired += report.expired;
                    if report.advanced {
                        summary.advanced += 1;
                    }
                }
                Err(e) => {
                    warn!(booth_id = %booth_id, error = %e, "Sweep failed for queue");
                    summary.failed += 1;
                }
            }
        }

        if summary.expired > 0 || summary.advanced > 0 {
            info!(
                queues = summary.queues,
                expired = summary.expired,
                advanced = summary.advanced,
                failed = summary.failed,
                "Sweep pass completed"
            );
        }
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::shutdown::shutdown_pair;
    use crate::domain::QueueSettings;
    use crate::port::id_provider::mocks::SequentialIdProvider;
    use crate::port::notifier::mocks::RecordingNotifier;
    use crate::port::queue_repository::mocks::InMemoryQueueRepository;
    use crate::port::time_provider::mocks::ManualClock;

    fn directory(clock: Arc<ManualClock>) -> Arc<QueueDirectory> {
        Arc::new(
            QueueDirectory::new(
                Arc::new(InMemoryQueueRepository::new()),
                Arc::new(RecordingNotifier::new()),
                Arc::new(SequentialIdProvider::default()),
                clock,
            )
            .with_default_settings(QueueSettings {
                token_expiry_minutes: 10,
                ..Default::default()
            }),
        )
    }

    #[tokio::test]
    async fn test_sweep_all_expires_across_queues() {
        let clock = Arc::new(ManualClock::new(0));
        let directory = directory(clock.clone());
        directory.join("booth-a", "fair", "alice").await.unwrap();
        directory.join("booth-b", "fair", "bob").await.unwrap();
        directory.join("booth-b", "fair", "carol").await.unwrap();

        let sweeper = ExpirySweeper::new(directory.clone());
        assert_eq!(sweeper.sweep_all().await.unwrap().expired, 0);

        clock.advance_minutes(10);
        let summary = sweeper.sweep_all().await.unwrap();
        assert_eq!(summary.queues, 2);
        assert_eq!(summary.expired, 3);
        assert_eq!(summary.failed, 0);

        let status = directory.status("booth-b").await.unwrap();
        assert_eq!(status.waiting_count, 0);
        assert_eq!(status.stats.total_expired, 2);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let clock = Arc::new(ManualClock::new(0));
        let sweeper =
            ExpirySweeper::new(directory(clock)).with_interval(Duration::from_millis(10));
        let (trigger, signal) = shutdown_pair();

        let handle = tokio::spawn(sweeper.run(signal));
        tokio::time::sleep(Duration::from_millis(30)).await;
        trigger.trigger();

        let joined = tokio::time::timeout(Duration::from_secs(2), handle).await;
        assert!(joined.is_ok(), "sweeper should stop within 2 seconds");
    }
}
