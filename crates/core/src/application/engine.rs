// QueueEngine - the per-queue state machine
//
// Every operation here is a pure function of (queue, input, now). Callers
// are responsible for running each call inside one queue-scoped
// transaction (see QueueDirectory).

use crate::application::estimator::WaitTimeEstimator;
use crate::application::{capacity, stats, token};
use crate::domain::error::Result;
use crate::domain::{
    DomainError, EntryStatus, EntryView, JoinReceipt, LeaveReceipt, Queue, QueueEntry,
    QueueSettings, QueueSnapshot, QueueStatus, SettingsUpdate, TokenNumber, UserPosition,
};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, Default)]
pub struct QueueEngine {
    estimator: WaitTimeEstimator,
}

impl QueueEngine {
    pub fn new(estimator: WaitTimeEstimator) -> Self {
        Self { estimator }
    }

    /// Join: admit, issue a token, append a waiting entry
    pub fn join(&self, queue: &mut Queue, user_id: &str, now_millis: i64) -> Result<JoinReceipt> {
        capacity::check(queue, user_id)?;

        // Estimate the line ahead of the newcomer, before appending
        let estimated_wait_time = self.estimator.estimate(queue);
        let token_number = token::next(queue);

        let entry = QueueEntry::new(token_number, user_id, now_millis, estimated_wait_time);
        stats::apply(&mut queue.stats, None, &entry);
        queue.entries.push(entry);

        let position = queue.waiting_count();
        info!(
            booth_id = %queue.booth_id,
            user_id = %user_id,
            token = token_number,
            position = position,
            "Participant joined queue"
        );

        Ok(JoinReceipt {
            token_number,
            position,
            estimated_wait_time,
        })
    }

    /// Leave: withdraw the user's waiting/serving entry
    pub fn leave(
        &self,
        queue: &mut Queue,
        user_id: &str,
        leave_message: Option<String>,
        now_millis: i64,
    ) -> Result<LeaveReceipt> {
        let entry = queue
            .active_entry_mut(user_id)
            .ok_or_else(|| DomainError::NotInQueue(user_id.to_string()))?;

        let before = entry.status;
        let actual_wait_time = entry.leave(now_millis, leave_message)?;
        let token_number = entry.token_number;
        let entry = entry.clone();
        stats::apply(&mut queue.stats, Some(before), &entry);

        if before == EntryStatus::Serving {
            queue.current_serving = 0;
        }

        info!(
            booth_id = %queue.booth_id,
            user_id = %user_id,
            token = token_number,
            was = %before,
            actual_wait_time = actual_wait_time,
            "Participant left queue"
        );

        Ok(LeaveReceipt {
            token_number,
            actual_wait_time,
        })
    }

    /// ServeNext: complete the current participant and call the next one.
    ///
    /// Returns `None` without touching the queue when nobody is waiting.
    pub fn serve_next(&self, queue: &mut Queue, now_millis: i64) -> Result<Option<EntryView>> {
        let current = queue.current_serving;
        let next_token = match queue
            .waiting()
            .find(|e| e.token_number > current)
            .map(|e| e.token_number)
        {
            Some(token) => token,
            None => {
                debug!(booth_id = %queue.booth_id, "No one waiting to serve");
                return Ok(None);
            }
        };

        self.complete_serving(queue, now_millis)?;

        let entry = queue.entry_mut(next_token).ok_or_else(|| {
            DomainError::InvalidStateTransition {
                from: "missing".to_string(),
                to: EntryStatus::Serving.to_string(),
            }
        })?;
        entry.start_serving(now_millis)?;
        let entry = entry.clone();
        stats::apply(&mut queue.stats, Some(EntryStatus::Waiting), &entry);
        queue.current_serving = next_token;

        info!(
            booth_id = %queue.booth_id,
            user_id = %entry.user_id,
            token = next_token,
            waited = entry.actual_wait_time.unwrap_or(0),
            "Now serving"
        );

        Ok(Some(EntryView::from(&entry)))
    }

    /// CompleteCurrent: finish the current interview without calling anyone
    pub fn complete_current(
        &self,
        queue: &mut Queue,
        now_millis: i64,
    ) -> Result<Option<EntryView>> {
        let completed = self.complete_serving(queue, now_millis)?;
        if completed.is_some() {
            queue.current_serving = 0;
        }
        Ok(completed)
    }

    fn complete_serving(&self, queue: &mut Queue, now_millis: i64) -> Result<Option<EntryView>> {
        let serving = queue
            .entries
            .iter_mut()
            .find(|e| e.status == EntryStatus::Serving);

        let entry = match serving {
            Some(entry) => {
                let service_minutes = entry.complete(now_millis)?;
                debug!(
                    token = entry.token_number,
                    service_minutes = service_minutes,
                    "Interview completed"
                );
                entry.clone()
            }
            None => return Ok(None),
        };

        stats::apply(&mut queue.stats, Some(EntryStatus::Serving), &entry);
        Ok(Some(EntryView::from(&entry)))
    }

    /// Expire waiting entries older than the queue's token expiry
    pub fn expire_stale(&self, queue: &mut Queue, now_millis: i64) -> Vec<TokenNumber> {
        let expiry = queue.settings.token_expiry_minutes;
        let mut expired = Vec::new();

        for entry in queue.entries.iter_mut() {
            if entry.is_stale(now_millis, expiry) && entry.expire(now_millis).is_ok() {
                stats::apply(&mut queue.stats, Some(EntryStatus::Waiting), entry);
                expired.push(entry.token_number);
            }
        }

        if !expired.is_empty() {
            info!(
                booth_id = %queue.booth_id,
                expired = ?expired,
                "Expired stale tokens"
            );
        }
        expired
    }

    /// True when auto-advance is on and the current participant has used up the interval
    pub fn auto_advance_due(&self, queue: &Queue, now_millis: i64) -> bool {
        let interval = queue.settings.auto_advance_interval;
        if interval == 0 {
            return false;
        }
        queue
            .serving()
            .and_then(|e| e.served_at)
            .map(|served_at| now_millis - served_at >= i64::from(interval) * 60_000)
            .unwrap_or(false)
    }

    /// Status: read-only snapshot
    pub fn status(&self, queue: &Queue) -> QueueSnapshot {
        let waiting: Vec<EntryView> = queue.waiting().map(EntryView::from).collect();
        let waiting_count = waiting.len();
        let capacity = queue.settings.max_queue_size;

        QueueSnapshot {
            booth_id: queue.booth_id.clone(),
            version: queue.version,
            event_id: queue.event_id.clone(),
            status: queue.status,
            current_serving: queue.current_serving,
            serving: queue.serving().map(EntryView::from),
            waiting,
            waiting_count,
            capacity,
            available_slots: capacity.saturating_sub(waiting_count as u32),
            estimated_wait_time: self.estimator.estimate(queue),
            last_token: queue.last_token,
            settings: queue.settings,
            stats: queue.stats.clone(),
        }
    }

    /// UserPosition: where the user stands, if they hold an active entry
    pub fn user_position(&self, queue: &Queue, user_id: &str) -> Option<UserPosition> {
        let entry = queue.active_entry(user_id)?;
        let position = match entry.status {
            EntryStatus::Serving => 0,
            _ => queue.waiting_position(entry.token_number)?,
        };
        Some(UserPosition {
            token_number: entry.token_number,
            position,
            status: entry.status,
            estimated_wait_time: entry.estimated_wait_time,
        })
    }

    /// UpdateSettings: validate the merged settings, then apply
    pub fn update_settings(
        &self,
        queue: &mut Queue,
        update: &SettingsUpdate,
    ) -> Result<QueueSettings> {
        let merged = queue.settings.merged(update)?;
        if merged != queue.settings {
            info!(
                booth_id = %queue.booth_id,
                max_queue_size = merged.max_queue_size,
                token_expiry_minutes = merged.token_expiry_minutes,
                auto_advance_interval = merged.auto_advance_interval,
                "Queue settings updated"
            );
        }
        queue.settings = merged;
        Ok(merged)
    }

    /// UpdateStatus: returns the previous status
    pub fn update_status(&self, queue: &mut Queue, status: QueueStatus) -> QueueStatus {
        let previous = std::mem::replace(&mut queue.status, status);
        if previous != status {
            info!(
                booth_id = %queue.booth_id,
                from = %previous,
                to = %status,
                "Queue status changed"
            );
        }
        previous
    }
}
