//! Sync layer error types.

use dealfront_catalog::{Collection, ValidationError};
use dealfront_mirror::MirrorError;
use dealfront_remote::RemoteError;
use thiserror::Error;

use crate::config::ConfigError;

/// Errors surfaced by the catalog facade.
///
/// Storage and remote failures are non-fatal: callers keep working off the
/// local mirror and show a transient notice.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SyncError {
    /// The local mirror could not be read or written.
    #[error("Local storage failed: {0}")]
    StorageFailure(String),

    /// The remote store could not be reached or timed out.
    #[error("Remote store unavailable: {0}")]
    RemoteUnavailable(String),

    /// An operation referenced an id that does not exist.
    #[error("No {collection} entry with id '{id}'")]
    NotFound { collection: Collection, id: String },

    /// A record or payload failed decoding or validation.
    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),

    /// The sync configuration is unusable.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),
}

impl SyncError {
    pub fn not_found(collection: Collection, id: impl Into<String>) -> Self {
        SyncError::NotFound {
            collection,
            id: id.into(),
        }
    }

    /// Whether the error leaves local state intact and can be retried later.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SyncError::StorageFailure(_) | SyncError::RemoteUnavailable(_)
        )
    }
}

impl From<MirrorError> for SyncError {
    fn from(e: MirrorError) -> Self {
        SyncError::StorageFailure(e.to_string())
    }
}

impl From<RemoteError> for SyncError {
    fn from(e: RemoteError) -> Self {
        match &e {
            RemoteError::NotFound { collection, id } => {
                match Collection::ALL.into_iter().find(|c| c.remote_name() == collection.as_str()) {
                    Some(collection) => SyncError::not_found(collection, id.clone()),
                    None => SyncError::RemoteUnavailable(e.to_string()),
                }
            }
            _ => SyncError::RemoteUnavailable(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_remote_errors_map_to_taxonomy() {
        let timeout: SyncError = RemoteError::Timeout(Duration::from_secs(3)).into();
        assert!(matches!(timeout, SyncError::RemoteUnavailable(_)));
        assert!(timeout.is_transient());

        let missing: SyncError = RemoteError::not_found("dailyDeals", "d1").into();
        assert_eq!(missing, SyncError::not_found(Collection::DailyDeal, "d1"));
        assert!(!missing.is_transient());
    }

    #[test]
    fn test_mirror_errors_are_storage_failures() {
        let err: SyncError = MirrorError::QuotaExceeded {
            key: "products".into(),
            needed: 10,
            limit: 5,
        }
        .into();
        assert!(matches!(err, SyncError::StorageFailure(msg) if msg.contains("products")));
    }

    #[test]
    fn test_not_found_message() {
        let err = SyncError::not_found(Collection::Banners, "b7");
        assert_eq!(err.to_string(), "No banners entry with id 'b7'");
    }
}
