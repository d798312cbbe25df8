//! Persistence error types.

use std::io;

use thiserror::Error;

/// Local key-value storage error variants.
#[derive(Debug, Error)]
#[allow(missing_docs)]
pub enum StorageError {
    #[error("storage location not available: {message}")]
    Unavailable { message: String },

    #[error("invalid storage key {key:?}")]
    InvalidKey { key: String },

    #[error("failed to read {key}: {message}")]
    ReadFailed { key: String, message: String },

    #[error("failed to write {key}: {message}")]
    WriteFailed { key: String, message: String },

    #[error("failed to remove {key}: {message}")]
    RemoveFailed { key: String, message: String },

    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl StorageError {
    /// Creates unavailable error.
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Creates read failure.
    #[must_use]
    pub fn read_failed(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ReadFailed {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Creates write failure.
    #[must_use]
    pub fn write_failed(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::WriteFailed {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Creates remove failure.
    #[must_use]
    pub fn remove_failed(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RemoveFailed {
            key: key.into(),
            message: message.into(),
        }
    }
}
