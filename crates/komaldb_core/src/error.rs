//! Error types for KomalDB core.

use std::io;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in KomalDB core operations.
///
/// Missing keys are not errors: lookups return `None` and deleting an absent
/// key succeeds. The caller mistakes reported here are transaction-stack
/// misuse and values that cannot be persisted.
#[derive(Debug, Error)]
pub enum CoreError {
    /// `commit` or `rollback` was called with no transaction in progress.
    #[error("no active transaction")]
    NoActiveTransaction,

    /// The value holds a NaN or infinite float, which no snapshot format
    /// can store. Nothing was written.
    #[error("invalid value for key '{key}': {message}")]
    InvalidValue {
        /// Key the value was meant for.
        key: String,
        /// Description of the problem.
        message: String,
    },

    /// Storage backend error.
    #[error("storage error: {0}")]
    Storage(#[from] komaldb_storage::StorageError),

    /// Snapshot codec error.
    #[error("codec error: {0}")]
    Codec(#[from] komaldb_codec::CodecError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Database directory is already open by another engine.
    #[error("database locked: another engine has exclusive access")]
    DatabaseLocked,

    /// Configuration is invalid.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// Description of the problem.
        message: String,
    },

    /// Database directory or snapshot has an unexpected layout.
    #[error("invalid database format: {message}")]
    InvalidFormat {
        /// Description of the format issue.
        message: String,
    },
}

impl CoreError {
    /// Creates an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Creates an invalid value error.
    pub fn invalid_value(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Creates an invalid format error.
    pub fn invalid_format(message: impl Into<String>) -> Self {
        Self::InvalidFormat {
            message: message.into(),
        }
    }
}
