//! Storage errors.
//!
//! Absence of a record is never an error here: `get` returns `Ok(None)` and
//! the increment path returns a [`super::ViewOutcome`]. These variants are
//! genuine medium failures, surfaced to callers as server-side faults. The
//! store performs no retries; retry policy belongs to the backend's own
//! client configuration.

use thiserror::Error;

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// I/O failure in the storage medium.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// Could not reach the medium (connection refused, pool exhausted).
    #[error("storage connection error: {0}")]
    Connection(String),

    /// A read against the medium failed.
    #[error("storage read error: {0}")]
    Read(String),

    /// A write against the medium failed.
    #[error("storage write error: {0}")]
    Write(String),

    /// Malformed stored state or other backend-internal failure.
    #[error("storage internal error: {0}")]
    Internal(String),
}

impl StorageError {
    /// Connection-level failure.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Read failure.
    pub fn read(msg: impl Into<String>) -> Self {
        Self::Read(msg.into())
    }

    /// Write failure.
    pub fn write(msg: impl Into<String>) -> Self {
        Self::Write(msg.into())
    }

    /// Internal failure.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
