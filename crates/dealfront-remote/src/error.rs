//! Remote store error types.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur when talking to the remote catalog store.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RemoteError {
    /// The store could not be reached.
    #[error("Remote store unavailable: {0}")]
    Unavailable(String),

    /// The call did not complete in time.
    #[error("Remote call timed out after {0:?}")]
    Timeout(Duration),

    /// The referenced record does not exist.
    #[error("Record not found: {collection}/{id}")]
    NotFound { collection: String, id: String },

    /// The store refused the request.
    #[error("Request rejected: {0}")]
    Rejected(String),

    /// Stored or received data could not be decoded.
    #[error("Failed to decode remote data: {0}")]
    Decode(String),
}

impl RemoteError {
    pub fn not_found(collection: &str, id: &str) -> Self {
        RemoteError::NotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        }
    }

    /// Whether repeating the call might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, RemoteError::Unavailable(_) | RemoteError::Timeout(_))
    }
}

impl From<serde_json::Error> for RemoteError {
    fn from(e: serde_json::Error) -> Self {
        RemoteError::Decode(e.to_string())
    }
}

impl From<std::io::Error> for RemoteError {
    fn from(e: std::io::Error) -> Self {
        RemoteError::Unavailable(e.to_string())
    }
}
