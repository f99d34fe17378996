//! Error types for the device-side sync client.

use fieldsync_engine::RecordId;
use thiserror::Error;

/// Failure talking to the sync server.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("network error: {0}")]
    Network(String),

    #[error("server responded {code}: {message}")]
    Status { code: u16, message: String },

    #[error("request timed out")]
    Timeout,

    #[error("invalid response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout
        } else if err.is_decode() {
            TransportError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            TransportError::Status {
                code: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            TransportError::Network(err.to_string())
        }
    }
}

/// Failure of the local record store.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("record not found: {0}")]
    NotFound(RecordId),

    #[error("store write failed: {0}")]
    Write(String),

    #[error("store read failed: {0}")]
    Read(String),
}

/// Errors surfaced to callers of the orchestrator.
///
/// Failures inside a pass never show up here; they are absorbed into record
/// status and the sync log.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SyncError {
    #[error("invalid sync configuration: {0}")]
    Config(fieldsync_engine::Error),

    #[error("sync has not been started")]
    NotStarted,

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("no unresolved conflict for record {0}")]
    ConflictNotFound(RecordId),
}

impl From<fieldsync_engine::Error> for SyncError {
    fn from(err: fieldsync_engine::Error) -> Self {
        match err {
            fieldsync_engine::Error::ConflictNotFound(id) => SyncError::ConflictNotFound(id),
            other => SyncError::Config(other),
        }
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, SyncError>;
