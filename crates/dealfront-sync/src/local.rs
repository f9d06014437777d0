//! Typed collection access over the local mirror.

use std::sync::Arc;

use dealfront_catalog::record::{decode_snapshot, encode_snapshot};
use dealfront_catalog::{CatalogEntity, Collection};
use dealfront_mirror::LocalMirror;
use parking_lot::Mutex;

use crate::SyncError;

/// The local mirror viewed as three typed collections.
///
/// Reads decode strictly: a stored snapshot that does not decode is a
/// `ValidationFailed` error, never partially returned. Writes fully replace
/// the collection. Read-modify-write cycles within one tab are serialized so
/// writes land in call order.
#[derive(Debug, Clone)]
pub struct LocalCatalog {
    mirror: LocalMirror,
    write_lock: Arc<Mutex<()>>,
}

impl LocalCatalog {
    pub fn new(mirror: LocalMirror) -> Self {
        Self {
            mirror,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn mirror(&self) -> &LocalMirror {
        &self.mirror
    }

    /// Read a collection. A missing key is an empty collection.
    pub fn read<T: CatalogEntity>(&self) -> Result<Vec<T>, SyncError> {
        match self.mirror.get_value(T::COLLECTION.storage_key())? {
            Some(value) => Ok(decode_snapshot(value)?),
            None => Ok(Vec::new()),
        }
    }

    /// Replace a collection.
    ///
    /// An empty singleton collection removes its key.
    pub fn write<T: CatalogEntity>(&self, entities: &[T]) -> Result<(), SyncError> {
        let key = T::COLLECTION.storage_key();
        match encode_snapshot(entities).map_err(dealfront_catalog::ValidationError::from)? {
            Some(value) => self.mirror.set(key, &value)?,
            None => self.mirror.delete(key)?,
        }
        Ok(())
    }

    /// Read, change and write back a collection as one step.
    ///
    /// Nothing is written if `change` fails.
    pub fn modify<T, R>(
        &self,
        change: impl FnOnce(&mut Vec<T>) -> Result<R, SyncError>,
    ) -> Result<R, SyncError>
    where
        T: CatalogEntity,
    {
        let _guard = self.write_lock.lock();
        let mut entities = self.read::<T>()?;
        let out = change(&mut entities)?;
        self.write(&entities)?;
        Ok(out)
    }

    /// Replace a collection wholesale, whatever it held before.
    ///
    /// Returns how many entities were replaced; an undecodable snapshot
    /// counts as none.
    pub fn replace<T: CatalogEntity>(&self, entities: &[T]) -> Result<usize, SyncError> {
        let _guard = self.write_lock.lock();
        let replaced = self.read::<T>().map(|current| current.len()).unwrap_or(0);
        self.write(entities)?;
        Ok(replaced)
    }

    /// Replace a collection unless it already holds exactly `entities`.
    ///
    /// Returns whether anything changed.
    pub fn replace_if_changed<T: CatalogEntity>(&self, entities: &[T]) -> Result<bool, SyncError> {
        Ok(self.replace_unless(entities, || false)?.unwrap_or(false))
    }

    /// Like [`replace_if_changed`](Self::replace_if_changed), but first asks
    /// `hold` under the write lock and leaves the collection alone if it
    /// returns true. Returns `None` when held.
    pub fn replace_unless<T: CatalogEntity>(
        &self,
        entities: &[T],
        hold: impl FnOnce() -> bool,
    ) -> Result<Option<bool>, SyncError> {
        let _guard = self.write_lock.lock();
        if hold() {
            return Ok(None);
        }
        // An undecodable snapshot counts as different and gets overwritten.
        let current = self.read::<T>().ok();
        if current.as_deref() == Some(entities) {
            return Ok(Some(false));
        }
        self.write(entities)?;
        Ok(Some(true))
    }

    /// Map a full storage key back to its collection.
    pub fn collection_for_key(&self, key: &str) -> Option<Collection> {
        self.mirror
            .logical_name(key)
            .and_then(Collection::from_storage_key)
    }
}
