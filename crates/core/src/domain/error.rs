// Domain Error Types

use crate::domain::{QueueStatus, TokenNumber, UserId};
use thiserror::Error;

/// Errors produced by the queue state machine itself.
///
/// All of them are rejected before any mutation, so the queue is left
/// exactly as it was read.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("User {user_id} already holds token {token} in this queue")]
    AlreadyInQueue { user_id: UserId, token: TokenNumber },

    #[error("Queue is full ({max_queue_size} waiting)")]
    QueueFull { max_queue_size: u32 },

    #[error("Queue is not accepting joins (status: {status})")]
    QueueNotAccepting { status: QueueStatus },

    #[error("User {0} has no active entry in this queue")]
    NotInQueue(UserId),

    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    #[error("Invalid entry state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },
}

impl DomainError {
    /// Validation-class errors come from malformed input rather than queue state
    pub fn is_validation(&self) -> bool {
        matches!(self, DomainError::InvalidSettings(_))
    }
}

pub type Result<T> = std::result::Result<T, DomainError>;
