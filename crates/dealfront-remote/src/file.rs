//! Directory-backed remote store.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::broadcast;

use crate::store::{generate_record_id, records};
use crate::{FieldMap, RemoteCatalogStore, RemoteError, RemoteRecord, RemoteSubscription};

const SUBSCRIPTION_CAPACITY: usize = 16;

/// A remote store persisted as one JSON file per collection.
///
/// Each file holds a JSON array of flat records in insertion order. Every
/// call re-reads the file, so several processes pointed at the same
/// directory see each other's writes; subscriptions only observe writes made
/// through this instance.
#[derive(Debug)]
pub struct FileRemoteStore {
    dir: PathBuf,
    write_lock: Mutex<()>,
    channels: Mutex<HashMap<String, broadcast::Sender<Vec<RemoteRecord>>>>,
}

impl FileRemoteStore {
    /// Open (creating if needed) a store directory.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, RemoteError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        tracing::debug!(dir = %dir.display(), "opened file remote store");
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
            channels: Mutex::new(HashMap::new()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, collection: &str) -> Result<PathBuf, RemoteError> {
        let valid = !collection.is_empty()
            && collection
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(RemoteError::Rejected(format!(
                "invalid collection name '{}'",
                collection
            )));
        }
        Ok(self.dir.join(format!("{}.json", collection)))
    }

    fn load(&self, collection: &str) -> Result<Vec<RemoteRecord>, RemoteError> {
        let path = self.path_for(collection)?;
        match fs::read_to_string(&path) {
            Ok(content) if content.trim().is_empty() => Ok(Vec::new()),
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, collection: &str, list: &[RemoteRecord]) -> Result<(), RemoteError> {
        let path = self.path_for(collection)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_string_pretty(list)?)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn mutate<T>(
        &self,
        collection: &str,
        op: impl FnOnce(&mut Vec<RemoteRecord>) -> Result<T, RemoteError>,
    ) -> Result<T, RemoteError> {
        let _guard = self.write_lock.lock();
        let mut list = self.load(collection)?;
        let out = op(&mut list)?;
        self.save(collection, &list)?;
        // Still under the write lock, so snapshots go out in write order.
        if let Some(tx) = self.channels.lock().get(collection) {
            let _ = tx.send(list);
        }
        Ok(out)
    }
}

#[async_trait]
impl RemoteCatalogStore for FileRemoteStore {
    async fn create(&self, collection: &str, fields: FieldMap) -> Result<RemoteRecord, RemoteError> {
        let record = RemoteRecord::new(generate_record_id(), fields);
        let created = record.clone();
        self.mutate(collection, move |list| {
            list.push(record);
            Ok(())
        })?;
        Ok(created)
    }

    async fn put(&self, collection: &str, record: RemoteRecord) -> Result<(), RemoteError> {
        self.mutate(collection, |list| {
            records::upsert(list, record);
            Ok(())
        })
    }

    async fn update(&self, collection: &str, record: RemoteRecord) -> Result<(), RemoteError> {
        self.mutate(collection, |list| records::replace(collection, list, record))
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), RemoteError> {
        self.mutate(collection, |list| records::remove(collection, list, id))
    }

    async fn list(&self, collection: &str) -> Result<Vec<RemoteRecord>, RemoteError> {
        self.load(collection)
    }

    async fn subscribe(&self, collection: &str) -> Result<RemoteSubscription, RemoteError> {
        self.path_for(collection)?;
        let rx = self
            .channels
            .lock()
            .entry(collection.to_string())
            .or_insert_with(|| broadcast::channel(SUBSCRIPTION_CAPACITY).0)
            .subscribe();
        Ok(RemoteSubscription::new(collection, rx))
    }
}
