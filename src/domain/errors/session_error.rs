//! Session store error types.

use thiserror::Error;

use super::StorageError;

/// Errors raised while saving the session record.
///
/// The in-memory session is already updated when one of these is returned;
/// only durability is affected.
#[derive(Debug, Error)]
#[allow(missing_docs)]
pub enum SessionError {
    #[error("failed to encode session record: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("failed to persist session: {0}")]
    Storage(#[from] StorageError),
}
