//! Key-value persistence port.
//!
//! Values are opaque bytes; serialization is the caller's concern and
//! the storage engine is the implementation's.

use async_trait::async_trait;
use thiserror::Error;

/// Errors returned by [`KeyValueStore`] operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// The backing medium could not be read or written.
    #[error("Storage I/O error: {0}")]
    Io(String),

    /// The stored document is corrupt or could not be encoded.
    #[error("Storage encoding error: {0}")]
    Encoding(String),
}

/// Small-value persistence keyed by string.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: &[u8]) -> Result<(), StorageError>;

    /// Remove `key`. Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<(), StorageError>;
}
