// QueueEntry Domain Model (one per participant visit)

use crate::domain::error::{DomainError, Result};
use crate::domain::queue::{TokenNumber, UserId};
use serde::{Deserialize, Serialize};

const MILLIS_PER_MINUTE: f64 = 60_000.0;

/// Entry status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    Waiting,
    Serving,
    Completed,
    Left,
    Expired,
}

impl EntryStatus {
    /// Waiting and serving entries count towards the one-entry-per-user rule
    pub fn is_active(self) -> bool {
        matches!(self, EntryStatus::Waiting | EntryStatus::Serving)
    }
}

impl std::fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryStatus::Waiting => write!(f, "waiting"),
            EntryStatus::Serving => write!(f, "serving"),
            EntryStatus::Completed => write!(f, "completed"),
            EntryStatus::Left => write!(f, "left"),
            EntryStatus::Expired => write!(f, "expired"),
        }
    }
}

/// Whole minutes between two epoch-ms timestamps, rounded to nearest
pub fn elapsed_minutes(from_millis: i64, to_millis: i64) -> u32 {
    let elapsed = (to_millis - from_millis).max(0) as f64;
    (elapsed / MILLIS_PER_MINUTE).round() as u32
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub token_number: TokenNumber,
    pub user_id: UserId,
    pub status: EntryStatus,

    pub joined_at: i64, // epoch ms
    pub served_at: Option<i64>,
    pub completed_at: Option<i64>,
    /// Set on voluntary departure or expiry
    pub left_at: Option<i64>,

    /// Minutes, snapshot taken at join time
    pub estimated_wait_time: u32,
    /// Minutes, set once the entry leaves `waiting`
    pub actual_wait_time: Option<u32>,
    pub leave_message: Option<String>,
}

impl QueueEntry {
    pub fn new(
        token_number: TokenNumber,
        user_id: impl Into<String>,
        joined_at: i64,
        estimated_wait_time: u32,
    ) -> Self {
        Self {
            token_number,
            user_id: user_id.into(),
            status: EntryStatus::Waiting,
            joined_at,
            served_at: None,
            completed_at: None,
            left_at: None,
            estimated_wait_time,
            actual_wait_time: None,
            leave_message: None,
        }
    }

    fn transition_error(&self, to: EntryStatus) -> DomainError {
        DomainError::InvalidStateTransition {
            from: self.status.to_string(),
            to: to.to_string(),
        }
    }

    /// waiting -> serving; returns the realized wait in minutes
    pub fn start_serving(&mut self, now_millis: i64) -> Result<u32> {
        if self.status != EntryStatus::Waiting {
            return Err(self.transition_error(EntryStatus::Serving));
        }
        let waited = elapsed_minutes(self.joined_at, now_millis);
        self.status = EntryStatus::Serving;
        self.served_at = Some(now_millis);
        self.actual_wait_time = Some(waited);
        Ok(waited)
    }

    /// serving -> completed; returns the service time in minutes
    pub fn complete(&mut self, now_millis: i64) -> Result<u32> {
        let served_at = match (self.status, self.served_at) {
            (EntryStatus::Serving, Some(served_at)) => served_at,
            _ => return Err(self.transition_error(EntryStatus::Completed)),
        };
        self.status = EntryStatus::Completed;
        self.completed_at = Some(now_millis);
        Ok(elapsed_minutes(served_at, now_millis))
    }

    /// waiting|serving -> left; returns the recorded wait in minutes
    pub fn leave(&mut self, now_millis: i64, message: Option<String>) -> Result<u32> {
        if !self.status.is_active() {
            return Err(self.transition_error(EntryStatus::Left));
        }
        self.status = EntryStatus::Left;
        self.left_at = Some(now_millis);
        self.leave_message = message;
        let joined_at = self.joined_at;
        let waited = *self
            .actual_wait_time
            .get_or_insert_with(|| elapsed_minutes(joined_at, now_millis));
        Ok(waited)
    }

    /// waiting -> expired
    pub fn expire(&mut self, now_millis: i64) -> Result<()> {
        if self.status != EntryStatus::Waiting {
            return Err(self.transition_error(EntryStatus::Expired));
        }
        self.status = EntryStatus::Expired;
        self.left_at = Some(now_millis);
        self.actual_wait_time = Some(elapsed_minutes(self.joined_at, now_millis));
        Ok(())
    }

    /// True once `expiry_minutes` have passed since joining while still waiting
    pub fn is_stale(&self, now_millis: i64, expiry_minutes: u32) -> bool {
        self.status == EntryStatus::Waiting
            && now_millis - self.joined_at >= i64::from(expiry_minutes) * 60_000
    }
}
