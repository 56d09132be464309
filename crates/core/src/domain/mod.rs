// Domain Layer - Pure business logic and entities

pub mod entry;
pub mod error;
pub mod queue;
pub mod snapshot;
pub mod stats;

// Re-exports
pub use entry::{elapsed_minutes, EntryStatus, QueueEntry};
pub use error::DomainError;
pub use queue::{
    BoothId, EventId, Queue, QueueSettings, QueueStatus, SettingsUpdate, TokenNumber, UserId,
    Version,
};
pub use snapshot::{
    EntryView, JoinReceipt, LeaveReceipt, QueueSnapshot, QueueUpdated, UserPosition,
};
pub use stats::QueueStats;
