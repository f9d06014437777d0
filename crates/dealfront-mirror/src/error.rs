//! Local mirror error types.

use thiserror::Error;

/// Errors that can occur when using the local mirror.
#[derive(Error, Debug)]
pub enum MirrorError {
    /// Failed to open the underlying storage.
    #[error("Failed to open storage: {0}")]
    OpenError(String),

    /// Failed to serialize or parse a value.
    #[error("Serialization error: {0}")]
    SerializeError(#[from] serde_json::Error),

    /// Failed to perform a storage operation.
    #[error("Storage operation failed: {0}")]
    StoreError(String),

    /// Writing would exceed the storage quota.
    #[error("Quota exceeded writing '{key}': needs {needed} bytes, limit is {limit}")]
    QuotaExceeded {
        key: String,
        needed: usize,
        limit: usize,
    },

    /// Key contains characters the backend cannot store.
    #[error("Invalid key: {0}")]
    InvalidKey(String),
}

impl From<std::io::Error> for MirrorError {
    fn from(e: std::io::Error) -> Self {
        MirrorError::StoreError(e.to_string())
    }
}
