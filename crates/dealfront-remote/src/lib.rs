//! Remote catalog store for Dealfront.
//!
//! The remote store is the backend every tab and device shares. The sync
//! layer only depends on the [`RemoteCatalogStore`] contract: per-collection
//! CRUD plus a subscription that delivers the full collection whenever any
//! client mutates it.
//!
//! Backends:
//!
//! - [`MemoryRemoteStore`]: shared in-process store with failure injection
//! - [`FileRemoteStore`]: one JSON file per collection in a directory
//!
//! Calls made by the sync layer go through a [`GuardedRemote`], which bounds
//! each attempt with a timeout and retries transient failures.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use dealfront_remote::prelude::*;
//!
//! let store = MemoryRemoteStore::new();
//! let guarded = GuardedRemote::new(
//!     Arc::new(store.clone()),
//!     RemotePolicy::new(Duration::from_secs(3), RetryPolicy::new(1)),
//! );
//! assert_eq!(guarded.policy().retry.max_attempts, 1);
//! ```

mod error;
mod file;
mod memory;
mod policy;
mod store;

pub use error::RemoteError;
pub use file::FileRemoteStore;
pub use memory::MemoryRemoteStore;
pub use policy::{BackoffStrategy, GuardedRemote, RemotePolicy, RetryCondition, RetryPolicy};
pub use store::{FieldMap, RemoteCatalogStore, RemoteRecord, RemoteSubscription};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{
        FileRemoteStore, GuardedRemote, MemoryRemoteStore, RemoteCatalogStore, RemoteError,
        RemotePolicy, RemoteRecord, RetryPolicy,
    };
}
