//! Durable local mirror of the storefront catalog.
//!
//! One [`Storage`] backend is shared by every tab of a browser profile. Each
//! tab wraps it in a [`LocalMirror`], which stores values as JSON and
//! announces its writes on a [`StorageBus`] so the other tabs can refresh.
//!
//! # Example
//!
//! ```rust
//! use dealfront_mirror::prelude::*;
//!
//! let first = LocalMirror::in_memory().with_prefix("shop");
//! let second = first.open_tab();
//! let mut listener = second.listen();
//!
//! first.set("products", &Vec::<String>::new()).unwrap();
//!
//! let event = listener.try_recv().unwrap();
//! assert_eq!(event.key.as_deref(), Some("shop:products"));
//! assert_eq!(second.logical_name("shop:products"), Some("products"));
//! ```

mod error;
mod mirror;
mod signal;
mod storage;

pub use error::MirrorError;
pub use mirror::LocalMirror;
pub use signal::{StorageBus, StorageEvent, StorageListener, TabId};
pub use storage::{FileStorage, MemoryStorage, Storage};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{
        FileStorage, LocalMirror, MemoryStorage, MirrorError, Storage, StorageBus, StorageEvent,
        StorageListener, TabId,
    };
}
