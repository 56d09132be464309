// Central Error Type for the Application

use crate::domain::BoothId;
use thiserror::Error;

/// Application-level error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Domain error: {0}")]
    Domain(#[from] crate::domain::DomainError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Contention on queue {booth_id}: gave up after {attempts} attempts")]
    Contention { booth_id: BoothId, attempts: u32 },

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Caller-visible error classes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Conflict,
    Contention,
    NotFound,
    Internal,
}

impl AppError {
    /// Classify the error so callers can branch without matching every variant
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Domain(e) if e.is_validation() => ErrorKind::Validation,
            AppError::Domain(_) => ErrorKind::Conflict,
            AppError::Validation(_) => ErrorKind::Validation,
            AppError::NotFound(_) => ErrorKind::NotFound,
            AppError::Contention { .. } => ErrorKind::Contention,
            AppError::Database(_)
            | AppError::Serialization(_)
            | AppError::Config(_)
            | AppError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Contention is the only class worth retrying from the caller side
    pub fn is_transient(&self) -> bool {
        self.kind() == ErrorKind::Contention
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

// Note: sqlx::Error conversion is handled in infra-sqlite crate
// by converting to AppError::Database(String)
