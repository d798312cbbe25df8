//! Session storage port definition.

use crate::domain::errors::StorageError;

/// Port for durable key-value storage of serialized records.
///
/// Calls are synchronous: a write has reached storage when it returns.
pub trait SessionStoragePort: Send + Sync {
    /// Reads the value stored under `key`.
    fn read(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Stores `value` under `key`, replacing any previous value.
    fn write(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Removes `key`; removing a missing key succeeds.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}
