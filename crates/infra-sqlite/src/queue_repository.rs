// SQLite QueueRepository Implementation
//
// One row per booth. The queue document is stored as JSON; `version` is
// duplicated into its own column so writes can be made conditional on it.

use crate::error::map_sqlx_error;
use async_trait::async_trait;
use boothline_core::domain::{BoothId, Queue, Version};
use boothline_core::error::{AppError, Result};
use boothline_core::port::QueueRepository;
use sqlx::SqlitePool;
use tracing::debug;

pub struct SqliteQueueRepository {
    pool: SqlitePool,
}

impl SqliteQueueRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Booths of one job-fair event
    pub async fn list_by_event(&self, event_id: &str) -> Result<Vec<BoothId>> {
        sqlx::query_scalar("SELECT booth_id FROM booth_queues WHERE event_id = ? ORDER BY booth_id")
            .bind(event_id)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)
    }
}

#[async_trait]
impl QueueRepository for SqliteQueueRepository {
    async fn find(&self, booth_id: &str) -> Result<Option<Queue>> {
        let row = sqlx::query_as::<_, QueueRow>(
            "SELECT booth_id, version, document FROM booth_queues WHERE booth_id = ?",
        )
        .bind(booth_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.map(QueueRow::into_queue).transpose()
    }

    async fn insert_if_absent(&self, queue: &Queue) -> Result<Queue> {
        let mut fresh = queue.clone();
        fresh.version = 1;
        let document = serde_json::to_string(&fresh)?;

        let result = sqlx::query(
            r#"
            INSERT INTO booth_queues (
                booth_id, event_id, status, version, document, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(booth_id) DO NOTHING
            "#,
        )
        .bind(&fresh.booth_id)
        .bind(&fresh.event_id)
        .bind(fresh.status.to_string())
        .bind(fresh.version)
        .bind(&document)
        .bind(fresh.created_at)
        .bind(fresh.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 1 {
            debug!(booth_id = %fresh.booth_id, "Queue row created");
            return Ok(fresh);
        }

        // Lost the creation race; hand back the winner's document
        self.find(&queue.booth_id).await?.ok_or_else(|| {
            AppError::Internal(format!(
                "Queue {} vanished after insert conflict",
                queue.booth_id
            ))
        })
    }

    async fn compare_and_swap(&self, queue: &Queue, expected_version: Version) -> Result<bool> {
        let document = serde_json::to_string(queue)?;

        let result = sqlx::query(
            r#"
            UPDATE booth_queues
            SET status = ?, version = ?, document = ?, updated_at = ?
            WHERE booth_id = ? AND version = ?
            "#,
        )
        .bind(queue.status.to_string())
        .bind(queue.version)
        .bind(&document)
        .bind(queue.updated_at)
        .bind(&queue.booth_id)
        .bind(expected_version)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 1 {
            return Ok(true);
        }

        // Either another writer moved the version on, or the row is gone
        let exists: Option<i64> =
            sqlx::query_scalar("SELECT version FROM booth_queues WHERE booth_id = ?")
                .bind(&queue.booth_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

        match exists {
            Some(current) => {
                debug!(
                    booth_id = %queue.booth_id,
                    expected = expected_version,
                    current = current,
                    "Version conflict"
                );
                Ok(false)
            }
            None => Err(AppError::NotFound(format!(
                "Queue for booth {} not found",
                queue.booth_id
            ))),
        }
    }

    async fn list_booth_ids(&self) -> Result<Vec<BoothId>> {
        sqlx::query_scalar("SELECT booth_id FROM booth_queues ORDER BY booth_id")
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)
    }
}

/// SQLite row representation
#[derive(Debug, sqlx::FromRow)]
struct QueueRow {
    booth_id: String,
    version: i64,
    document: String,
}

impl QueueRow {
    fn into_queue(self) -> Result<Queue> {
        let mut queue: Queue = serde_json::from_str(&self.document).map_err(|e| {
            AppError::Database(format!(
                "Corrupt queue document for booth {}: {}",
                self.booth_id, e
            ))
        })?;
        // The column is authoritative for concurrency control
        queue.version = self.version;
        Ok(queue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{create_pool, run_migrations};
    use boothline_core::domain::{QueueEntry, QueueSettings, QueueStatus};

    async fn setup_test_repo() -> SqliteQueueRepository {
        let pool = create_pool("sqlite::memory:", 1).await.unwrap();
        run_migrations(&pool).await.unwrap();
        SqliteQueueRepository::new(pool)
    }

    fn queue(booth_id: &str) -> Queue {
        Queue::new(booth_id, "fair-2026", QueueSettings::default(), 1_000)
    }

    #[tokio::test]
    async fn test_insert_and_find() {
        let repo = setup_test_repo().await;
        assert!(repo.find("booth-1").await.unwrap().is_none());

        let stored = repo.insert_if_absent(&queue("booth-1")).await.unwrap();
        assert_eq!(stored.version, 1);

        let found = repo.find("booth-1").await.unwrap().unwrap();
        assert_eq!(found, stored);
    }

    #[tokio::test]
    async fn test_insert_if_absent_keeps_first() {
        let repo = setup_test_repo().await;
        repo.insert_if_absent(&queue("booth-1")).await.unwrap();

        let mut other = queue("booth-1");
        other.event_id = "another-fair".to_string();
        let stored = repo.insert_if_absent(&other).await.unwrap();
        assert_eq!(stored.event_id, "fair-2026");
        assert_eq!(repo.list_booth_ids().await.unwrap(), vec!["booth-1"]);
    }

    #[tokio::test]
    async fn test_compare_and_swap() {
        let repo = setup_test_repo().await;
        let mut q = repo.insert_if_absent(&queue("booth-1")).await.unwrap();

        q.entries.push(QueueEntry::new(1, "alice", 2_000, 0));
        q.last_token = 1;
        q.status = QueueStatus::Paused;
        q.version = 2;
        assert!(repo.compare_and_swap(&q, 1).await.unwrap());

        // A writer still holding version 1 loses
        let mut stale = q.clone();
        stale.version = 2;
        assert!(!repo.compare_and_swap(&stale, 1).await.unwrap());

        let found = repo.find("booth-1").await.unwrap().unwrap();
        assert_eq!(found.version, 2);
        assert_eq!(found.entries.len(), 1);
        assert_eq!(found.status, QueueStatus::Paused);
    }

    #[tokio::test]
    async fn test_compare_and_swap_missing_row() {
        let repo = setup_test_repo().await;
        let err = repo.compare_and_swap(&queue("ghost"), 1).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_list_by_event() {
        let repo = setup_test_repo().await;
        repo.insert_if_absent(&queue("booth-b")).await.unwrap();
        repo.insert_if_absent(&queue("booth-a")).await.unwrap();
        let mut elsewhere = queue("booth-c");
        elsewhere.event_id = "spring-fair".to_string();
        repo.insert_if_absent(&elsewhere).await.unwrap();

        assert_eq!(
            repo.list_by_event("fair-2026").await.unwrap(),
            vec!["booth-a", "booth-b"]
        );
    }
}
