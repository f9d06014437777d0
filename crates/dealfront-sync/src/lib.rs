//! Catalog synchronization for the Dealfront storefront.
//!
//! Each tab keeps a durable [local mirror](dealfront_mirror::LocalMirror) of
//! the catalog so it renders instantly and survives the remote store being
//! down. This crate keeps that mirror consistent with the shared
//! [remote store](dealfront_remote::RemoteCatalogStore) and with other tabs:
//!
//! - [`Reconciler`]: initial load, remote subscriptions, full push
//! - [`ChangeNotifier`]: per-collection change events, bridged from storage
//! - [`CatalogView`]: event-driven views with a polling fallback
//! - [`CatalogFacade`]: the API storefront code calls
//!
//! Every mutation is local-first. The local mirror is written and views are
//! notified before the remote write is attempted; a failed remote write is
//! reported as [`RemoteOutcome::Deferred`] and never rolls back the mirror.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use dealfront_remote::MemoryRemoteStore;
//! use dealfront_sync::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), SyncError> {
//! let remote = MemoryRemoteStore::new();
//! let catalog = CatalogFacade::builder()
//!     .remote(Arc::new(remote.clone()))
//!     .build()?;
//! let report = catalog.start().await;
//! assert_eq!(report.get(Collection::Products).map(|l| l.source), Some(LoadSource::Defaults));
//!
//! let banner = catalog
//!     .banners()
//!     .create(NewBanner::new("Spring sale", BannerPosition::Top))
//!     .await?;
//! assert_eq!(banner.remote, RemoteOutcome::Synced);
//! # catalog.shutdown().await;
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod facade;
mod local;
mod notice;
mod notifier;
mod reconciler;
mod transfer;
mod view;

pub use config::{ConfigError, SyncConfig, MAX_POLL_INTERVAL_MS, MIN_POLL_INTERVAL_MS};
pub use error::SyncError;
pub use facade::{CatalogFacade, CollectionHandle, Committed, FacadeBuilder, RemoteOutcome};
pub use local::LocalCatalog;
pub use notice::{Notice, NoticeLevel, Notices};
pub use notifier::{ChangeEvent, ChangeNotifier, ChangeSource};
pub use reconciler::{
    CollectionLoad, LoadReport, LoadSource, PendingWrite, Reconciler, SyncFailure, SyncReport,
};
pub use transfer::{export_entities, parse_import, ImportReport};
pub use view::CatalogView;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{
        CatalogFacade, CatalogView, ChangeEvent, ChangeSource, Committed, LoadReport, LoadSource,
        Notice, NoticeLevel, RemoteOutcome, SyncConfig, SyncError, SyncReport,
    };
    pub use dealfront_catalog::prelude::*;
}
