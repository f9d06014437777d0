//! Shared in-process remote store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::broadcast;

use crate::store::{generate_record_id, records};
use crate::{FieldMap, RemoteCatalogStore, RemoteError, RemoteRecord, RemoteSubscription};

const SUBSCRIPTION_CAPACITY: usize = 16;

/// A remote store held in memory.
///
/// Clones share the same collections, so each clone behaves like another
/// client of one backend. The store can be switched offline, made to fail a
/// number of upcoming calls, or slowed down, to exercise degraded paths.
#[derive(Debug, Clone, Default)]
pub struct MemoryRemoteStore {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    collections: Mutex<HashMap<String, Vec<RemoteRecord>>>,
    channels: Mutex<HashMap<String, broadcast::Sender<Vec<RemoteRecord>>>>,
    offline: AtomicBool,
    failures_pending: AtomicU32,
    latency_ms: AtomicU64,
    calls: AtomicU64,
}

impl MemoryRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace a collection's contents without notifying subscribers.
    pub fn seed(&self, collection: &str, records: Vec<RemoteRecord>) {
        self.inner
            .collections
            .lock()
            .insert(collection.to_string(), records);
    }

    /// Current records of a collection, bypassing availability checks.
    pub fn snapshot(&self, collection: &str) -> Vec<RemoteRecord> {
        self.inner
            .collections
            .lock()
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    /// Switch the store on or offline.
    pub fn set_online(&self, online: bool) {
        self.inner.offline.store(!online, Ordering::SeqCst);
    }

    pub fn is_online(&self) -> bool {
        !self.inner.offline.load(Ordering::SeqCst)
    }

    /// Fail the next `count` calls with [`RemoteError::Unavailable`].
    pub fn fail_next(&self, count: u32) {
        self.inner.failures_pending.store(count, Ordering::SeqCst);
    }

    /// Delay every call by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        self.inner
            .latency_ms
            .store(latency.as_millis() as u64, Ordering::SeqCst);
    }

    /// Number of calls received so far, including failed ones.
    pub fn calls(&self) -> u64 {
        self.inner.calls.load(Ordering::SeqCst)
    }

    async fn enter(&self) -> Result<(), RemoteError> {
        self.inner.calls.fetch_add(1, Ordering::SeqCst);
        let latency = self.inner.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }
        if self.inner.offline.load(Ordering::SeqCst) {
            return Err(RemoteError::Unavailable("store is offline".to_string()));
        }
        let pending = self.inner.failures_pending.fetch_update(
            Ordering::SeqCst,
            Ordering::SeqCst,
            |n| n.checked_sub(1),
        );
        if pending.is_ok() {
            return Err(RemoteError::Unavailable("injected failure".to_string()));
        }
        Ok(())
    }

    fn mutate<T>(
        &self,
        collection: &str,
        op: impl FnOnce(&mut Vec<RemoteRecord>) -> Result<T, RemoteError>,
    ) -> Result<T, RemoteError> {
        // Broadcast before releasing the lock so subscribers receive
        // snapshots in mutation order.
        let mut collections = self.inner.collections.lock();
        let list = collections.entry(collection.to_string()).or_default();
        let out = op(list)?;
        self.broadcast(collection, list.clone());
        Ok(out)
    }

    fn broadcast(&self, collection: &str, records: Vec<RemoteRecord>) {
        if let Some(tx) = self.inner.channels.lock().get(collection) {
            let _ = tx.send(records);
        }
    }
}

#[async_trait]
impl RemoteCatalogStore for MemoryRemoteStore {
    async fn create(&self, collection: &str, fields: FieldMap) -> Result<RemoteRecord, RemoteError> {
        self.enter().await?;
        let record = RemoteRecord::new(generate_record_id(), fields);
        let created = record.clone();
        self.mutate(collection, move |list| {
            list.push(record);
            Ok(())
        })?;
        Ok(created)
    }

    async fn put(&self, collection: &str, record: RemoteRecord) -> Result<(), RemoteError> {
        self.enter().await?;
        self.mutate(collection, |list| {
            records::upsert(list, record);
            Ok(())
        })
    }

    async fn update(&self, collection: &str, record: RemoteRecord) -> Result<(), RemoteError> {
        self.enter().await?;
        self.mutate(collection, |list| records::replace(collection, list, record))
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), RemoteError> {
        self.enter().await?;
        self.mutate(collection, |list| records::remove(collection, list, id))
    }

    async fn list(&self, collection: &str) -> Result<Vec<RemoteRecord>, RemoteError> {
        self.enter().await?;
        Ok(self.snapshot(collection))
    }

    async fn subscribe(&self, collection: &str) -> Result<RemoteSubscription, RemoteError> {
        self.enter().await?;
        let rx = self
            .inner
            .channels
            .lock()
            .entry(collection.to_string())
            .or_insert_with(|| broadcast::channel(SUBSCRIPTION_CAPACITY).0)
            .subscribe();
        Ok(RemoteSubscription::new(collection, rx))
    }
}
