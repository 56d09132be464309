// Read models returned by queue operations

use crate::domain::entry::{EntryStatus, QueueEntry};
use crate::domain::queue::{
    BoothId, EventId, QueueSettings, QueueStatus, TokenNumber, UserId, Version,
};
use crate::domain::stats::QueueStats;
use serde::{Deserialize, Serialize};

/// Public view of one entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryView {
    pub token_number: TokenNumber,
    pub user_id: UserId,
    pub status: EntryStatus,
    pub joined_at: i64,
    pub served_at: Option<i64>,
    pub estimated_wait_time: u32,
    pub actual_wait_time: Option<u32>,
}

impl From<&QueueEntry> for EntryView {
    fn from(entry: &QueueEntry) -> Self {
        Self {
            token_number: entry.token_number,
            user_id: entry.user_id.clone(),
            status: entry.status,
            joined_at: entry.joined_at,
            served_at: entry.served_at,
            estimated_wait_time: entry.estimated_wait_time,
            actual_wait_time: entry.actual_wait_time,
        }
    }
}

/// Read-only snapshot of a queue (Status)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueSnapshot {
    pub booth_id: BoothId,
    /// Committed document version; later commits carry higher values
    pub version: Version,
    pub event_id: EventId,
    pub status: QueueStatus,
    pub current_serving: TokenNumber,
    pub serving: Option<EntryView>,
    pub waiting: Vec<EntryView>,
    pub waiting_count: usize,
    pub capacity: u32,
    pub available_slots: u32,
    /// Minutes a newcomer would wait right now
    pub estimated_wait_time: u32,
    pub last_token: TokenNumber,
    pub settings: QueueSettings,
    pub stats: QueueStats,
}

/// Successful Join
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinReceipt {
    pub token_number: TokenNumber,
    pub position: usize,
    pub estimated_wait_time: u32,
}

/// Successful Leave
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveReceipt {
    pub token_number: TokenNumber,
    pub actual_wait_time: u32,
}

/// A user's place in line (UserPosition)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPosition {
    pub token_number: TokenNumber,
    /// 1-based rank among waiting entries, 0 while serving
    pub position: usize,
    pub status: EntryStatus,
    pub estimated_wait_time: u32,
}

/// Event pushed to subscribers after every committed transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueUpdated {
    pub event_id: String,
    pub booth_id: BoothId,
    pub snapshot: QueueSnapshot,
    pub timestamp: i64, // epoch ms
}
