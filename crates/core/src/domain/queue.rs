// Queue Domain Model (one queue per booth)

use crate::domain::entry::{EntryStatus, QueueEntry};
use crate::domain::error::{DomainError, Result};
use crate::domain::stats::QueueStats;
use serde::{Deserialize, Serialize};

/// Booth identifier (1:1 with its queue)
pub type BoothId = String;

/// Job-fair event identifier
pub type EventId = String;

/// Participant identifier
pub type UserId = String;

/// Sequential token number, unique within one queue
pub type TokenNumber = u64;

/// Queue document revision used for compare-and-swap writes
pub type Version = i64;

pub const MIN_QUEUE_SIZE: u32 = 1;
pub const MAX_QUEUE_SIZE: u32 = 1000;
pub const MIN_TOKEN_EXPIRY_MINUTES: u32 = 5;
pub const MAX_TOKEN_EXPIRY_MINUTES: u32 = 120;
pub const MAX_AUTO_ADVANCE_MINUTES: u32 = 240;

/// Queue lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueStatus {
    Active,
    Paused,
    Closed,
}

impl std::fmt::Display for QueueStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueueStatus::Active => write!(f, "active"),
            QueueStatus::Paused => write!(f, "paused"),
            QueueStatus::Closed => write!(f, "closed"),
        }
    }
}

impl std::str::FromStr for QueueStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "active" => Ok(QueueStatus::Active),
            "paused" => Ok(QueueStatus::Paused),
            "closed" => Ok(QueueStatus::Closed),
            other => Err(DomainError::InvalidSettings(format!(
                "unknown queue status '{}'",
                other
            ))),
        }
    }
}

/// Per-queue settings, copied from the booth defaults at creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueSettings {
    pub max_queue_size: u32,
    pub token_expiry_minutes: u32,
    /// Minutes a participant may stay `serving` before the sweeper advances (0 = off)
    pub auto_advance_interval: u32,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            max_queue_size: 50,
            token_expiry_minutes: 30,
            auto_advance_interval: 0,
        }
    }
}

impl QueueSettings {
    /// Range-check every field
    pub fn validate(&self) -> Result<()> {
        check_range(
            "max_queue_size",
            self.max_queue_size,
            MIN_QUEUE_SIZE,
            MAX_QUEUE_SIZE,
        )?;
        check_range(
            "token_expiry_minutes",
            self.token_expiry_minutes,
            MIN_TOKEN_EXPIRY_MINUTES,
            MAX_TOKEN_EXPIRY_MINUTES,
        )?;
        check_range(
            "auto_advance_interval",
            self.auto_advance_interval,
            0,
            MAX_AUTO_ADVANCE_MINUTES,
        )
    }

    /// Apply a partial update, validating the merged result before returning it
    pub fn merged(&self, update: &SettingsUpdate) -> Result<Self> {
        if update.is_empty() {
            return Err(DomainError::InvalidSettings(
                "settings patch names no known field".to_string(),
            ));
        }
        let merged = Self {
            max_queue_size: update.max_queue_size.unwrap_or(self.max_queue_size),
            token_expiry_minutes: update
                .token_expiry_minutes
                .unwrap_or(self.token_expiry_minutes),
            auto_advance_interval: update
                .auto_advance_interval
                .unwrap_or(self.auto_advance_interval),
        };
        merged.validate()?;
        Ok(merged)
    }
}

fn check_range(field: &str, value: u32, min: u32, max: u32) -> Result<()> {
    if value < min || value > max {
        return Err(DomainError::InvalidSettings(format!(
            "{} must be in [{}, {}], got {}",
            field, min, max, value
        )));
    }
    Ok(())
}

/// Partial settings patch (absent fields keep their value)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsUpdate {
    #[serde(default)]
    pub max_queue_size: Option<u32>,
    #[serde(default)]
    pub token_expiry_minutes: Option<u32>,
    #[serde(default)]
    pub auto_advance_interval: Option<u32>,
}

impl SettingsUpdate {
    pub fn is_empty(&self) -> bool {
        self.max_queue_size.is_none()
            && self.token_expiry_minutes.is_none()
            && self.auto_advance_interval.is_none()
    }
}

/// Queue document: the unit of locking and persistence
///
/// `entries` is append-only and therefore always ordered by `token_number`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Queue {
    pub booth_id: BoothId,
    pub event_id: EventId,
    pub current_serving: TokenNumber,
    pub last_token: TokenNumber,
    pub entries: Vec<QueueEntry>,
    pub status: QueueStatus,
    pub settings: QueueSettings,
    pub stats: QueueStats,

    /// Revision of the persisted document (0 = never written)
    #[serde(default)]
    pub version: Version,
    pub created_at: i64, // epoch ms
    pub updated_at: i64, // epoch ms
}

impl Queue {
    /// Create an empty, active queue for a booth
    pub fn new(
        booth_id: impl Into<String>,
        event_id: impl Into<String>,
        settings: QueueSettings,
        now_millis: i64,
    ) -> Self {
        Self {
            booth_id: booth_id.into(),
            event_id: event_id.into(),
            current_serving: 0,
            last_token: 0,
            entries: Vec::new(),
            status: QueueStatus::Active,
            settings,
            stats: QueueStats::default(),
            version: 0,
            created_at: now_millis,
            updated_at: now_millis,
        }
    }

    /// Waiting entries in service order
    pub fn waiting(&self) -> impl Iterator<Item = &QueueEntry> {
        self.entries
            .iter()
            .filter(|e| e.status == EntryStatus::Waiting)
    }

    pub fn waiting_count(&self) -> usize {
        self.waiting().count()
    }

    pub fn serving(&self) -> Option<&QueueEntry> {
        self.entries
            .iter()
            .find(|e| e.status == EntryStatus::Serving)
    }

    /// The user's waiting/serving entry, if any
    pub fn active_entry(&self, user_id: &str) -> Option<&QueueEntry> {
        self.entries
            .iter()
            .find(|e| e.user_id == user_id && e.status.is_active())
    }

    pub(crate) fn active_entry_mut(&mut self, user_id: &str) -> Option<&mut QueueEntry> {
        self.entries
            .iter_mut()
            .find(|e| e.user_id == user_id && e.status.is_active())
    }

    pub(crate) fn entry_mut(&mut self, token: TokenNumber) -> Option<&mut QueueEntry> {
        self.entries.iter_mut().find(|e| e.token_number == token)
    }

    /// 1-based rank among waiting entries
    pub fn waiting_position(&self, token: TokenNumber) -> Option<usize> {
        self.waiting()
            .position(|e| e.token_number == token)
            .map(|idx| idx + 1)
    }
}
