//! Reconciliation between the local mirror and the remote store.
//!
//! There is no versioning: whichever full collection lands last wins. The
//! remote is authoritative whenever it has data, the local mirror covers for
//! it when it is empty or unreachable, and the bundled defaults cover for
//! both.

use std::sync::Arc;

use dealfront_catalog::record::{from_fields, to_fields};
use dealfront_catalog::{Banner, CatalogEntity, Collection, DailyDeal, Product};
use dealfront_remote::{RemoteCatalogStore, RemoteRecord, RemoteSubscription};
use tokio::sync::{watch, Mutex as AsyncMutex, MutexGuard as AsyncMutexGuard};
use tokio::task::JoinHandle;

use crate::local::LocalCatalog;
use crate::notifier::{ChangeNotifier, ChangeSource};
use crate::SyncError;

/// Where a collection's initial contents came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    /// The remote store had data and it replaced the local mirror.
    Remote,
    /// The remote was empty or unreachable; the local mirror was kept.
    Local,
    /// Both were empty; the bundled dataset was seeded.
    Defaults,
    /// Both were empty and seeding is disabled.
    Empty,
}

/// Outcome of loading one collection.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionLoad {
    pub collection: Collection,
    pub source: LoadSource,
    /// Entities now in the local mirror.
    pub count: usize,
    /// Remote records skipped because they failed to decode.
    pub rejected: usize,
    /// Why the remote could not be used, if it failed.
    pub remote_error: Option<SyncError>,
    /// Why the local mirror could not be read or written, if it failed.
    pub storage_error: Option<SyncError>,
}

impl CollectionLoad {
    fn new(collection: Collection) -> Self {
        Self {
            collection,
            source: LoadSource::Empty,
            count: 0,
            rejected: 0,
            remote_error: None,
            storage_error: None,
        }
    }
}

/// Outcome of the initial load of every collection.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LoadReport {
    pub collections: Vec<CollectionLoad>,
}

impl LoadReport {
    pub fn get(&self, collection: Collection) -> Option<&CollectionLoad> {
        self.collections.iter().find(|c| c.collection == collection)
    }

    /// Whether any collection loaded without the remote or with storage errors.
    pub fn is_degraded(&self) -> bool {
        self.collections
            .iter()
            .any(|c| c.remote_error.is_some() || c.storage_error.is_some())
    }
}

/// Outcome of pushing local entities to the remote.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SyncReport {
    /// Entities written to the remote.
    pub pushed: usize,
    /// Entities that could not be written.
    pub failures: Vec<SyncFailure>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SyncFailure {
    pub collection: Collection,
    pub id: String,
    pub error: SyncError,
}

impl SyncReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    fn merge(&mut self, other: SyncReport) {
        self.pushed += other.pushed;
        self.failures.extend(other.failures);
    }
}

/// Per-collection count of local writes whose remote write has not settled.
#[derive(Debug, Clone)]
struct PendingWrites {
    counts: Arc<[watch::Sender<usize>; 3]>,
}

impl PendingWrites {
    fn new() -> Self {
        Self {
            counts: Arc::new([
                watch::channel(0).0,
                watch::channel(0).0,
                watch::channel(0).0,
            ]),
        }
    }

    fn slot(collection: Collection) -> usize {
        match collection {
            Collection::Products => 0,
            Collection::Banners => 1,
            Collection::DailyDeal => 2,
        }
    }

    fn begin(&self, collection: Collection) -> PendingWrite {
        let slot = Self::slot(collection);
        self.counts[slot].send_modify(|n| *n += 1);
        PendingWrite {
            counts: self.counts.clone(),
            slot,
        }
    }

    fn count(&self, collection: Collection) -> usize {
        *self.counts[Self::slot(collection)].borrow()
    }

    fn watch(&self, collection: Collection) -> watch::Receiver<usize> {
        self.counts[Self::slot(collection)].subscribe()
    }
}

/// Marks a collection as having a local write on its way to the remote.
///
/// Remote snapshots of the collection are held back until every such
/// marker is dropped.
#[must_use = "the write stops counting as pending once this is dropped"]
#[derive(Debug)]
pub struct PendingWrite {
    counts: Arc<[watch::Sender<usize>; 3]>,
    slot: usize,
}

impl Drop for PendingWrite {
    fn drop(&mut self) {
        self.counts[self.slot].send_modify(|n| *n = n.saturating_sub(1));
    }
}

/// Decides which source is authoritative and keeps both converging.
///
/// Local writes never wait for the remote. A mutation marks its collection
/// pending before touching the local mirror and stays pending until its
/// remote write settles; remote snapshots of a pending collection are held
/// back and the newest one is applied once nothing is pending. A tab's own
/// echo therefore never rolls back a newer local write, while snapshots
/// caused by other clients still win.
#[derive(Clone)]
pub struct Reconciler {
    local: LocalCatalog,
    remote: Option<Arc<dyn RemoteCatalogStore>>,
    notifier: ChangeNotifier,
    seed_defaults: bool,
    pending: PendingWrites,
    remote_queue: Arc<AsyncMutex<()>>,
}

impl Reconciler {
    pub fn new(
        local: LocalCatalog,
        remote: Option<Arc<dyn RemoteCatalogStore>>,
        notifier: ChangeNotifier,
        seed_defaults: bool,
    ) -> Self {
        Self {
            local,
            remote,
            notifier,
            seed_defaults,
            pending: PendingWrites::new(),
            remote_queue: Arc::new(AsyncMutex::new(())),
        }
    }

    pub fn has_remote(&self) -> bool {
        self.remote.is_some()
    }

    pub fn remote(&self) -> Option<&Arc<dyn RemoteCatalogStore>> {
        self.remote.as_ref()
    }

    /// Mark a collection as having a local write in flight.
    ///
    /// Take it before writing the local mirror and keep it until the remote
    /// write has settled.
    pub fn begin_write(&self, collection: Collection) -> PendingWrite {
        self.pending.begin(collection)
    }

    /// Wait for this tab's earlier remote writes to finish.
    ///
    /// The queue is fair, so remote writes go out in the order their local
    /// writes were made. Only remote calls wait here, never local writes.
    pub async fn lock_remote(&self) -> AsyncMutexGuard<'_, ()> {
        self.remote_queue.lock().await
    }

    /// Load every collection.
    pub async fn initial_load(&self) -> LoadReport {
        let collections = vec![
            self.load_collection::<Product>().await,
            self.load_collection::<Banner>().await,
            self.load_collection::<DailyDeal>().await,
        ];
        let report = LoadReport { collections };
        for load in &report.collections {
            tracing::info!(
                collection = %load.collection,
                source = ?load.source,
                count = load.count,
                rejected = load.rejected,
                "collection loaded"
            );
        }
        report
    }

    /// Load one collection: non-empty remote, else local, else defaults.
    pub async fn load_collection<T: CatalogEntity>(&self) -> CollectionLoad {
        let mut load = CollectionLoad::new(T::COLLECTION);

        if let Some(remote) = &self.remote {
            match remote.list(T::COLLECTION.remote_name()).await {
                Ok(records) => {
                    let (entities, rejected) = decode_remote::<T>(records);
                    load.rejected = rejected;
                    if !entities.is_empty() {
                        load.source = LoadSource::Remote;
                        load.count = entities.len();
                        match self.local.replace_if_changed(&entities) {
                            Ok(true) => self.notifier.notify(T::COLLECTION, ChangeSource::Remote),
                            Ok(false) => {}
                            Err(e) => {
                                tracing::warn!(collection = %T::COLLECTION, error = %e, "failed to mirror remote snapshot");
                                load.storage_error = Some(e);
                            }
                        }
                        return load;
                    }
                }
                Err(e) => {
                    tracing::warn!(collection = %T::COLLECTION, error = %e, "remote unavailable at load, using local mirror");
                    load.remote_error = Some(e.into());
                }
            }
        }

        match self.local.read::<T>() {
            Ok(entities) if !entities.is_empty() => {
                load.source = LoadSource::Local;
                load.count = entities.len();
                return load;
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(collection = %T::COLLECTION, error = %e, "local snapshot unreadable");
                load.storage_error = Some(e);
            }
        }

        if !self.seed_defaults {
            return load;
        }

        let defaults = T::defaults();
        load.source = LoadSource::Defaults;
        load.count = defaults.len();
        match self.local.write(&defaults) {
            Ok(()) => self.notifier.notify(T::COLLECTION, ChangeSource::Local),
            Err(e) => {
                tracing::warn!(collection = %T::COLLECTION, error = %e, "failed to seed defaults");
                load.storage_error = Some(e);
            }
        }
        if load.remote_error.is_none() && self.remote.is_some() {
            let report = self.push_entities(&defaults).await;
            if !report.is_complete() {
                tracing::warn!(collection = %T::COLLECTION, failed = report.failures.len(), "defaults not pushed to remote");
            }
        }
        load
    }

    /// Apply a snapshot delivered by a remote subscription.
    ///
    /// An empty snapshot is ignored, as at initial load. Otherwise the valid
    /// records replace the local collection if they differ from it, unless
    /// a local write of the collection is still pending. Returns whether the
    /// local mirror changed.
    pub fn apply_remote_snapshot<T: CatalogEntity>(
        &self,
        records: Vec<RemoteRecord>,
    ) -> Result<bool, SyncError> {
        Ok(self.try_apply::<T>(records)?.unwrap_or(false))
    }

    /// Like [`apply_remote_snapshot`](Self::apply_remote_snapshot), but
    /// returns `None` when the snapshot was held back.
    fn try_apply<T: CatalogEntity>(&self, records: Vec<RemoteRecord>) -> Result<Option<bool>, SyncError> {
        let (entities, rejected) = decode_remote::<T>(records);
        if entities.is_empty() {
            tracing::debug!(collection = %T::COLLECTION, rejected, "ignoring empty remote snapshot");
            return Ok(Some(false));
        }
        // Checked under the local write lock, so no mutation can slip in
        // between the check and the replace.
        let pending = &self.pending;
        let changed = self
            .local
            .replace_unless(&entities, || pending.count(T::COLLECTION) > 0)?;
        match changed {
            Some(true) => {
                tracing::debug!(collection = %T::COLLECTION, count = entities.len(), "remote snapshot applied");
                self.notifier.notify(T::COLLECTION, ChangeSource::Remote);
            }
            Some(false) => {}
            None => tracing::debug!(collection = %T::COLLECTION, "remote snapshot held while local writes are pending"),
        }
        Ok(changed)
    }

    /// Subscribe to every remote collection.
    ///
    /// Subscribing happens before the initial load so no change made in
    /// between is lost. Collections that fail to subscribe are skipped.
    pub async fn subscribe_all(&self) -> Vec<RemoteSubscription> {
        let remote = match &self.remote {
            Some(remote) => remote,
            None => return Vec::new(),
        };
        let mut subscriptions = Vec::new();
        for collection in Collection::ALL {
            match remote.subscribe(collection.remote_name()).await {
                Ok(subscription) => subscriptions.push(subscription),
                Err(e) => {
                    tracing::warn!(%collection, error = %e, "remote subscription failed");
                }
            }
        }
        subscriptions
    }

    /// Spawn one task per subscription applying remote snapshots locally.
    pub fn spawn_subscription_tasks(&self, subscriptions: Vec<RemoteSubscription>) -> Vec<JoinHandle<()>> {
        subscriptions
            .into_iter()
            .filter_map(|subscription| {
                let collection = Collection::ALL
                    .into_iter()
                    .find(|c| c.remote_name() == subscription.collection())?;
                let reconciler = self.clone();
                Some(tokio::spawn(async move {
                    match collection {
                        Collection::Products => reconciler.follow::<Product>(subscription).await,
                        Collection::Banners => reconciler.follow::<Banner>(subscription).await,
                        Collection::DailyDeal => reconciler.follow::<DailyDeal>(subscription).await,
                    }
                }))
            })
            .collect()
    }

    async fn follow<T: CatalogEntity>(&self, mut subscription: RemoteSubscription) {
        let mut pending = self.pending.watch(T::COLLECTION);
        let mut held: Option<Vec<RemoteRecord>> = None;
        loop {
            let records = tokio::select! {
                next = subscription.next() => match next {
                    Some(records) => records,
                    None => break,
                },
                changed = pending.changed(), if held.is_some() => {
                    if changed.is_err() {
                        break;
                    }
                    if *pending.borrow_and_update() > 0 {
                        continue;
                    }
                    match held.take() {
                        Some(records) => records,
                        None => continue,
                    }
                }
            };
            // Our own echoes are already queued by the time the last pending
            // write settles, so this picks up the newest state.
            let records = subscription.latest(records);
            match self.try_apply::<T>(records.clone()) {
                Ok(Some(_)) => held = None,
                Ok(None) => held = Some(records),
                Err(e) => {
                    held = None;
                    tracing::warn!(collection = %T::COLLECTION, error = %e, "failed to apply remote snapshot");
                }
            }
        }
        tracing::debug!(collection = %T::COLLECTION, "remote subscription ended");
    }

    /// Push every local entity of every collection to the remote.
    ///
    /// Entities are upserted by id. Remote entities missing locally are left
    /// in place; deletions are not propagated by a full sync.
    pub async fn push_all(&self) -> Result<SyncReport, SyncError> {
        let (products, banners, deals) = futures::try_join!(
            self.push_collection::<Product>(),
            self.push_collection::<Banner>(),
            self.push_collection::<DailyDeal>(),
        )?;
        let mut report = SyncReport::default();
        report.merge(products);
        report.merge(banners);
        report.merge(deals);
        tracing::info!(pushed = report.pushed, failed = report.failures.len(), "full sync finished");
        Ok(report)
    }

    /// Push one local collection to the remote.
    pub async fn push_collection<T: CatalogEntity>(&self) -> Result<SyncReport, SyncError> {
        let entities = self.local.read::<T>()?;
        Ok(self.push_entities(&entities).await)
    }

    /// Upsert entities into their remote collection, in order.
    pub async fn push_entities<T: CatalogEntity>(&self, entities: &[T]) -> SyncReport {
        let mut report = SyncReport::default();
        let remote = match &self.remote {
            Some(remote) => remote,
            None => return report,
        };
        let name = T::COLLECTION.remote_name();
        for entity in entities {
            let outcome = match remote_record(entity) {
                Ok(record) => remote.put(name, record).await.map_err(SyncError::from),
                Err(e) => Err(e),
            };
            match outcome {
                Ok(()) => report.pushed += 1,
                Err(error) => report.failures.push(SyncFailure {
                    collection: T::COLLECTION,
                    id: entity.id().to_string(),
                    error,
                }),
            }
        }
        report
    }
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("local", &self.local)
            .field("has_remote", &self.remote.is_some())
            .field("seed_defaults", &self.seed_defaults)
            .finish()
    }
}

/// Build the remote record for an entity.
pub(crate) fn remote_record<T: CatalogEntity>(entity: &T) -> Result<RemoteRecord, SyncError> {
    let fields = to_fields(entity).map_err(dealfront_catalog::ValidationError::from)?;
    Ok(RemoteRecord::new(entity.id(), fields))
}

/// Decode remote records, skipping (and counting) the ones that fail.
///
/// A singleton collection keeps only its most recent valid record.
fn decode_remote<T: CatalogEntity>(records: Vec<RemoteRecord>) -> (Vec<T>, usize) {
    let mut entities = Vec::with_capacity(records.len());
    let mut rejected = 0;
    for record in records {
        match from_fields::<T>(&record.id, record.fields) {
            Ok(entity) => entities.push(entity),
            Err(e) => {
                rejected += 1;
                tracing::warn!(collection = %T::COLLECTION, id = %record.id, error = %e, "rejected remote record");
            }
        }
    }
    if T::COLLECTION.is_singleton() && entities.len() > 1 {
        entities = entities.split_off(entities.len() - 1);
    }
    (entities, rejected)
}
