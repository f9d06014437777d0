//! The remote catalog store contract.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;

use crate::RemoteError;

/// A flat field map, one record without its id.
pub type FieldMap = serde_json::Map<String, Value>;

/// One record of a remote collection.
///
/// On the wire the id sits next to the fields, as in a flat JSON object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteRecord {
    pub id: String,
    #[serde(flatten)]
    pub fields: FieldMap,
}

impl RemoteRecord {
    pub fn new(id: impl Into<String>, fields: FieldMap) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }
}

/// An asynchronous, multi-client CRUD store of named collections.
///
/// Every client sees the same collections. Mutations by any client are
/// delivered to all [`RemoteSubscription`]s of that collection as the full
/// current sequence.
#[async_trait]
pub trait RemoteCatalogStore: Send + Sync {
    /// Insert a record, letting the store assign its id.
    async fn create(&self, collection: &str, fields: FieldMap) -> Result<RemoteRecord, RemoteError>;

    /// Insert or overwrite the record with `record.id`.
    async fn put(&self, collection: &str, record: RemoteRecord) -> Result<(), RemoteError>;

    /// Overwrite an existing record.
    ///
    /// Fails with [`RemoteError::NotFound`] if the id is not stored.
    async fn update(&self, collection: &str, record: RemoteRecord) -> Result<(), RemoteError>;

    /// Remove a record.
    ///
    /// Fails with [`RemoteError::NotFound`] if the id is not stored.
    async fn delete(&self, collection: &str, id: &str) -> Result<(), RemoteError>;

    /// All records in insertion order.
    async fn list(&self, collection: &str) -> Result<Vec<RemoteRecord>, RemoteError>;

    /// Watch a collection for changes made by any client.
    async fn subscribe(&self, collection: &str) -> Result<RemoteSubscription, RemoteError>;
}

/// Stream of full collection snapshots.
#[derive(Debug)]
pub struct RemoteSubscription {
    collection: String,
    rx: broadcast::Receiver<Vec<RemoteRecord>>,
}

impl RemoteSubscription {
    pub fn new(collection: impl Into<String>, rx: broadcast::Receiver<Vec<RemoteRecord>>) -> Self {
        Self {
            collection: collection.into(),
            rx,
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Wait for the next snapshot.
    ///
    /// Snapshots are complete, so when the receiver falls behind the skipped
    /// ones are dropped and the next available one is returned. Returns
    /// `None` once the store is gone.
    pub async fn next(&mut self) -> Option<Vec<RemoteRecord>> {
        loop {
            match self.rx.recv().await {
                Ok(snapshot) => return Some(snapshot),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!(collection = %self.collection, skipped, "subscription lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Skip ahead to the newest snapshot already delivered, if any.
    pub fn latest(&mut self, mut snapshot: Vec<RemoteRecord>) -> Vec<RemoteRecord> {
        loop {
            match self.rx.try_recv() {
                Ok(newer) => snapshot = newer,
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => return snapshot,
            }
        }
    }
}

/// Generate a store-assigned record id.
pub(crate) fn generate_record_id() -> String {
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
    use rand::Rng;

    let bytes: [u8; 12] = rand::thread_rng().gen();
    format!("rec_{}", URL_SAFE_NO_PAD.encode(bytes))
}

/// Record-level operations shared by the store backends.
pub(crate) mod records {
    use super::RemoteRecord;
    use crate::RemoteError;

    pub fn upsert(records: &mut Vec<RemoteRecord>, record: RemoteRecord) {
        match records.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => *existing = record,
            None => records.push(record),
        }
    }

    pub fn replace(
        collection: &str,
        records: &mut [RemoteRecord],
        record: RemoteRecord,
    ) -> Result<(), RemoteError> {
        match records.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => {
                *existing = record;
                Ok(())
            }
            None => Err(RemoteError::not_found(collection, &record.id)),
        }
    }

    pub fn remove(
        collection: &str,
        records: &mut Vec<RemoteRecord>,
        id: &str,
    ) -> Result<(), RemoteError> {
        let before = records.len();
        records.retain(|r| r.id != id);
        if records.len() == before {
            return Err(RemoteError::not_found(collection, id));
        }
        Ok(())
    }
}
