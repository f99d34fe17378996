//! Error types for the fieldsync engine.

use crate::RecordId;
use thiserror::Error;

/// All possible errors from the fieldsync engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Configuration errors
    #[error("invalid batch size: {0} (must be at least 1)")]
    InvalidBatchSize(usize),

    #[error("sync interval too short: {actual}ms (minimum {minimum}ms)")]
    SyncIntervalTooShort { minimum: u64, actual: u64 },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    // Conflict errors
    #[error("conflict not found: {0}")]
    ConflictNotFound(RecordId),

    // State errors
    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),
}

impl Error {
    /// Whether this error comes from validating a sync configuration.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            Error::InvalidBatchSize(_) | Error::SyncIntervalTooShort { .. } | Error::InvalidConfig(_)
        )
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
