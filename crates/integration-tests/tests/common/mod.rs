//! Shared wiring for integration tests: a QueueDirectory on real SQLite

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use boothline_core::application::{QueueDirectory, RetryConfig};
use boothline_core::port::id_provider::mocks::SequentialIdProvider;
use boothline_core::port::notifier::mocks::RecordingNotifier;
use boothline_core::port::time_provider::mocks::ManualClock;
use boothline_infra_sqlite::{create_pool, run_migrations, SqliteQueueRepository};
use sqlx::SqlitePool;

pub const T0: i64 = 1_700_000_000_000;
pub const EVENT: &str = "fair-2024";

pub struct Harness {
    pub directory: Arc<QueueDirectory>,
    pub clock: Arc<ManualClock>,
    pub notifier: Arc<RecordingNotifier>,
    pub pool: SqlitePool,
}

pub async fn open_pool(url: &str, max_connections: u32) -> SqlitePool {
    let pool = create_pool(url, max_connections).await.unwrap();
    run_migrations(&pool).await.unwrap();
    pool
}

pub fn harness_on(pool: SqlitePool, clock: Arc<ManualClock>, retry: RetryConfig) -> Harness {
    let notifier = Arc::new(RecordingNotifier::new());
    let directory = Arc::new(
        QueueDirectory::new(
            Arc::new(SqliteQueueRepository::new(pool.clone())),
            notifier.clone(),
            Arc::new(SequentialIdProvider::default()),
            clock.clone(),
        )
        .with_retry(retry),
    );
    Harness {
        directory,
        clock,
        notifier,
        pool,
    }
}

pub async fn in_memory() -> Harness {
    let pool = open_pool("sqlite::memory:", 1).await;
    harness_on(pool, Arc::new(ManualClock::new(T0)), RetryConfig::default())
}

/// A scratch database file that is removed (with its WAL files) on drop
pub struct TempDb {
    pub path: PathBuf,
}

impl TempDb {
    pub fn new(name: &str) -> Self {
        let path = std::env::temp_dir().join(format!(
            "boothline-{}-{}.db",
            name,
            std::process::id()
        ));
        let db = Self { path };
        db.cleanup();
        db
    }

    pub fn url(&self) -> String {
        format!("sqlite://{}", self.path.display())
    }

    fn cleanup(&self) {
        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{}", self.path.display(), suffix));
        }
    }
}

impl Drop for TempDb {
    fn drop(&mut self) {
        self.cleanup();
    }
}
