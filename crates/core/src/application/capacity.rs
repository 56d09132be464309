// CapacityGuard - admission checks for Join

use crate::domain::error::{DomainError, Result};
use crate::domain::{Queue, QueueStatus};

/// Decide whether `user_id` may join.
///
/// Checks run membership -> capacity -> status so that a duplicate join
/// against a full or closed queue reports `AlreadyInQueue`.
pub fn check(queue: &Queue, user_id: &str) -> Result<()> {
    if let Some(entry) = queue.active_entry(user_id) {
        return Err(DomainError::AlreadyInQueue {
            user_id: user_id.to_string(),
            token: entry.token_number,
        });
    }

    let max_queue_size = queue.settings.max_queue_size;
    if queue.waiting_count() >= max_queue_size as usize {
        return Err(DomainError::QueueFull { max_queue_size });
    }

    if queue.status != QueueStatus::Active {
        return Err(DomainError::QueueNotAccepting {
            status: queue.status,
        });
    }

    Ok(())
}
