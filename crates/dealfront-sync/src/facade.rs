//! The catalog facade: the one API surface storefront code calls.

use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dealfront_catalog::{Banner, CatalogEntity, Collection, DailyDeal, IdGenerator, Product};
use dealfront_mirror::LocalMirror;
use dealfront_remote::{GuardedRemote, RemoteCatalogStore, RemoteError};
use parking_lot::{Mutex, RwLock};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::config::SyncConfig;
use crate::local::LocalCatalog;
use crate::notice::{Notice, NoticeLevel, Notices};
use crate::notifier::{ChangeEvent, ChangeNotifier, ChangeSource};
use crate::reconciler::{remote_record, LoadReport, Reconciler, SyncReport};
use crate::transfer::{self, ImportReport};
use crate::view::CatalogView;
use crate::SyncError;

/// What happened to the remote side of a committed mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteOutcome {
    /// The remote store accepted the change.
    Synced,
    /// The remote write failed; the local change stands and converges on
    /// the next successful sync.
    Deferred(SyncError),
    /// No remote store is configured.
    LocalOnly,
}

/// A mutation applied to the local mirror.
#[derive(Debug, Clone, PartialEq)]
pub struct Committed<T> {
    /// The entity as created, updated, or removed.
    pub value: T,
    pub remote: RemoteOutcome,
}

impl<T> Committed<T> {
    pub fn is_synced(&self) -> bool {
        self.remote == RemoteOutcome::Synced
    }

    pub fn into_value(self) -> T {
        self.value
    }
}

/// Builder for [`CatalogFacade`].
#[derive(Default)]
pub struct FacadeBuilder {
    mirror: Option<LocalMirror>,
    remote: Option<Arc<dyn RemoteCatalogStore>>,
    config: SyncConfig,
}

impl FacadeBuilder {
    /// The local mirror of this tab. Defaults to private in-memory storage.
    pub fn mirror(mut self, mirror: LocalMirror) -> Self {
        self.mirror = Some(mirror);
        self
    }

    /// The shared remote store. Without one the facade works local-only.
    pub fn remote(mut self, remote: Arc<dyn RemoteCatalogStore>) -> Self {
        self.remote = Some(remote);
        self
    }

    pub fn config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<CatalogFacade, SyncError> {
        self.config.validate()?;

        let mut mirror = self.mirror.unwrap_or_else(LocalMirror::in_memory);
        if let Some(prefix) = &self.config.key_prefix {
            mirror = mirror.with_prefix(prefix.clone());
        }
        let local = LocalCatalog::new(mirror);
        let policy = self.config.remote_policy();
        let remote = self
            .remote
            .map(|inner| Arc::new(GuardedRemote::new(inner, policy)) as Arc<dyn RemoteCatalogStore>);
        let notifier = ChangeNotifier::new();
        let reconciler = Reconciler::new(
            local.clone(),
            remote,
            notifier.clone(),
            self.config.seed_defaults,
        );

        Ok(CatalogFacade {
            local,
            reconciler,
            notifier,
            notices: Notices::new(),
            ids: IdGenerator::new(),
            config: self.config,
            load_report: RwLock::new(None),
            tasks: Mutex::new(Vec::new()),
            started: AtomicBool::new(false),
        })
    }
}

/// Catalog state for one tab.
///
/// Constructed once by the application and passed to whatever needs it.
/// [`start`](CatalogFacade::start) loads the catalog and begins following
/// the remote store and other tabs; [`shutdown`](CatalogFacade::shutdown)
/// (or dropping the facade) stops that.
///
/// # Example
///
/// ```rust
/// use dealfront_catalog::{NewProduct, Price};
/// use dealfront_sync::CatalogFacade;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), dealfront_sync::SyncError> {
/// let catalog = CatalogFacade::builder().build()?;
/// catalog.start().await;
///
/// let draft = NewProduct::new("Widget", Price::from_decimal(100.0), Price::from_decimal(80.0));
/// let created = catalog.products().create(draft).await?.into_value();
/// assert!(catalog.products().list().contains(&created));
/// # Ok(())
/// # }
/// ```
pub struct CatalogFacade {
    local: LocalCatalog,
    reconciler: Reconciler,
    notifier: ChangeNotifier,
    notices: Notices,
    ids: IdGenerator,
    config: SyncConfig,
    load_report: RwLock<Option<LoadReport>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    started: AtomicBool,
}

impl CatalogFacade {
    pub fn builder() -> FacadeBuilder {
        FacadeBuilder::default()
    }

    /// Load every collection and start following changes.
    ///
    /// Calling it again returns the first load's report.
    pub async fn start(&self) -> LoadReport {
        if self.started.swap(true, Ordering::SeqCst) {
            return self.load_report().unwrap_or_default();
        }

        // Listen before loading so nothing written meanwhile is missed.
        let listener = self.local.mirror().listen();
        let subscriptions = self.reconciler.subscribe_all().await;
        let report = self.reconciler.initial_load().await;

        for load in &report.collections {
            if let Some(e) = &load.storage_error {
                self.notices.error(
                    Some(load.collection),
                    format!("Saved {} could not be used: {}", load.collection, e),
                );
            } else if load.remote_error.is_some() {
                self.notices.warn(
                    Some(load.collection),
                    format!("Showing saved {}; the remote store is unreachable", load.collection),
                );
            }
        }

        let mut tasks = self.reconciler.spawn_subscription_tasks(subscriptions);
        tasks.push(self.notifier.bridge_storage(listener, self.local.clone()));
        self.tasks.lock().extend(tasks);
        *self.load_report.write() = Some(report.clone());
        report
    }

    /// Stop following the remote store and other tabs.
    pub async fn shutdown(&self) {
        let tasks = std::mem::take(&mut *self.tasks.lock());
        for task in tasks {
            task.abort();
            let _ = task.await;
        }
        tracing::debug!(tab = %self.local.mirror().tab(), "catalog facade shut down");
    }

    pub fn products(&self) -> CollectionHandle<'_, Product> {
        CollectionHandle::new(self)
    }

    pub fn banners(&self) -> CollectionHandle<'_, Banner> {
        CollectionHandle::new(self)
    }

    pub fn daily_deal(&self) -> CollectionHandle<'_, DailyDeal> {
        CollectionHandle::new(self)
    }

    /// Handle for any collection type.
    pub fn collection<T: CatalogEntity>(&self) -> CollectionHandle<'_, T> {
        CollectionHandle::new(self)
    }

    /// The current deal of the day, if any.
    pub fn current_deal(&self) -> Option<DailyDeal> {
        self.daily_deal().list().into_iter().next()
    }

    /// Remove the current deal of the day. Returns `None` if there was none.
    pub async fn clear_deal(&self) -> Result<Option<Committed<DailyDeal>>, SyncError> {
        match self.daily_deal().try_list()?.into_iter().next() {
            Some(deal) => self.daily_deal().delete(deal.id()).await.map(Some),
            None => Ok(None),
        }
    }

    /// Push the whole local mirror to the remote store.
    ///
    /// Entities are upserted by id; remote entities missing locally are not
    /// deleted.
    pub async fn sync_all(&self) -> Result<SyncReport, SyncError> {
        if !self.reconciler.has_remote() {
            self.notices.info(None, "No remote store configured; nothing to sync");
            return Ok(SyncReport::default());
        }
        let _pending: Vec<_> = Collection::ALL
            .into_iter()
            .map(|collection| self.reconciler.begin_write(collection))
            .collect();
        let _queue = self.reconciler.lock_remote().await;
        let report = self
            .reconciler
            .push_all()
            .await
            .map_err(|e| self.report_failure(None, "sync", e))?;
        if report.is_complete() {
            self.notices
                .info(None, format!("Synced {} entries to the remote store", report.pushed));
        } else {
            self.notices.warn(
                None,
                format!(
                    "Synced {} entries; {} could not be pushed",
                    report.pushed,
                    report.failures.len()
                ),
            );
        }
        Ok(report)
    }

    /// Serialize a collection as a pretty-printed JSON array.
    pub fn export(&self, collection: Collection) -> Result<String, SyncError> {
        match collection {
            Collection::Products => transfer::export_entities(&self.products().try_list()?),
            Collection::Banners => transfer::export_entities(&self.banners().try_list()?),
            Collection::DailyDeal => transfer::export_entities(&self.daily_deal().try_list()?),
        }
    }

    /// Replace the product collection with a previously exported file.
    pub async fn import_products(&self, payload: &str) -> Result<ImportReport, SyncError> {
        self.import::<Product>(payload).await
    }

    /// Replace any collection with a previously exported file.
    pub async fn import_collection(
        &self,
        collection: Collection,
        payload: &str,
    ) -> Result<ImportReport, SyncError> {
        match collection {
            Collection::Products => self.import::<Product>(payload).await,
            Collection::Banners => self.import::<Banner>(payload).await,
            Collection::DailyDeal => self.import::<DailyDeal>(payload).await,
        }
    }

    /// Replace a collection with a previously exported file.
    ///
    /// A payload that is not an array, or holds any invalid item, is
    /// rejected and nothing is written. An accepted import replaces the
    /// local collection, notifies views, and pushes the collection to the
    /// remote store.
    pub async fn import<T: CatalogEntity>(&self, payload: &str) -> Result<ImportReport, SyncError> {
        let entities = transfer::parse_import::<T>(payload)
            .map_err(|e| self.report_failure(Some(T::COLLECTION), "import", e))?;

        let _pending = self.reconciler.begin_write(T::COLLECTION);
        let replaced = self
            .local
            .replace(&entities)
            .map_err(|e| self.report_failure(Some(T::COLLECTION), "import", e))?;
        self.notifier.notify(T::COLLECTION, ChangeSource::Local);

        let _queue = self.reconciler.lock_remote().await;
        let sync = match self.reconciler.push_collection::<T>().await {
            Ok(report) => report,
            Err(e) => {
                self.report_failure(Some(T::COLLECTION), "push imported", e);
                SyncReport::default()
            }
        };
        if !sync.is_complete() {
            self.notices.warn(
                Some(T::COLLECTION),
                format!("Imported locally; {} entries not yet on the remote store", sync.failures.len()),
            );
        }
        tracing::info!(collection = %T::COLLECTION, imported = entities.len(), replaced, "import applied");

        Ok(ImportReport {
            collection: T::COLLECTION,
            imported: entities.len(),
            replaced,
            sync,
        })
    }

    /// Open a live view of a collection.
    pub fn view<T: CatalogEntity>(&self) -> CatalogView<T> {
        CatalogView::open(self.local.clone(), &self.notifier, self.config.poll_interval())
    }

    /// Transient notices for the UI.
    pub fn notices(&self) -> broadcast::Receiver<Notice> {
        self.notices.subscribe()
    }

    /// Change events of this tab.
    pub fn subscribe_changes(&self) -> broadcast::Receiver<ChangeEvent> {
        self.notifier.subscribe()
    }

    /// Report of the initial load, once [`start`](CatalogFacade::start) ran.
    pub fn load_report(&self) -> Option<LoadReport> {
        self.load_report.read().clone()
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// The local mirror this tab writes to.
    pub fn mirror(&self) -> &LocalMirror {
        self.local.mirror()
    }

    fn report_failure(&self, collection: Option<Collection>, action: &str, error: SyncError) -> SyncError {
        let level = match &error {
            SyncError::NotFound { .. } | SyncError::RemoteUnavailable(_) => NoticeLevel::Warning,
            _ => NoticeLevel::Error,
        };
        tracing::warn!(collection = ?collection, action, error = %error, "catalog operation failed");
        self.notices
            .publish(level, collection, format!("Could not {}: {}", action, error));
        error
    }

    fn settle(&self, collection: Collection, action: &str, result: Result<(), SyncError>) -> RemoteOutcome {
        match result {
            Ok(()) => RemoteOutcome::Synced,
            Err(e) => {
                tracing::warn!(%collection, action, error = %e, "remote write deferred");
                self.notices.warn(
                    Some(collection),
                    format!("Saved locally; remote {} pending: {}", action, e),
                );
                RemoteOutcome::Deferred(e)
            }
        }
    }
}

impl Drop for CatalogFacade {
    fn drop(&mut self) {
        for task in self.tasks.get_mut().drain(..) {
            task.abort();
        }
    }
}

impl std::fmt::Debug for CatalogFacade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogFacade")
            .field("tab", self.local.mirror().tab())
            .field("reconciler", &self.reconciler)
            .field("started", &self.started.load(Ordering::SeqCst))
            .finish()
    }
}

/// Uniform operations on one collection.
pub struct CollectionHandle<'a, T> {
    facade: &'a CatalogFacade,
    _entity: PhantomData<T>,
}

impl<'a, T: CatalogEntity> CollectionHandle<'a, T> {
    fn new(facade: &'a CatalogFacade) -> Self {
        Self {
            facade,
            _entity: PhantomData,
        }
    }

    /// Current contents of the local mirror.
    ///
    /// Never touches the network. If the mirror cannot be read, a notice is
    /// published and the bundled defaults are returned instead.
    pub fn list(&self) -> Vec<T> {
        match self.facade.local.read::<T>() {
            Ok(entities) => entities,
            Err(e) => {
                self.facade.report_failure(Some(T::COLLECTION), "read saved data", e);
                T::defaults()
            }
        }
    }

    /// Like [`list`](Self::list), but returns the error.
    pub fn try_list(&self) -> Result<Vec<T>, SyncError> {
        self.facade.local.read::<T>()
    }

    pub fn get(&self, id: &str) -> Option<T> {
        self.list().into_iter().find(|e| e.id() == id)
    }

    /// Assign an id, store locally, then write to the remote store.
    ///
    /// The entity is returned whatever the remote outcome. Creating a deal
    /// replaces the current one.
    pub async fn create(&self, draft: T::Draft) -> Result<Committed<T>, SyncError> {
        let facade = self.facade;
        let _pending = facade.reconciler.begin_write(T::COLLECTION);

        let (entity, replaced) = facade
            .local
            .modify::<T, _>(|items| {
                let id = facade
                    .ids
                    .next_unused(|candidate| items.iter().any(|e| e.id() == candidate));
                let entity = T::from_draft(id, draft);
                entity.validate()?;
                let replaced = if T::COLLECTION.is_singleton() {
                    std::mem::take(items)
                } else {
                    Vec::new()
                };
                items.push(entity.clone());
                Ok((entity, replaced))
            })
            .map_err(|e| facade.report_failure(Some(T::COLLECTION), "create", e))?;
        facade.notifier.notify(T::COLLECTION, ChangeSource::Local);
        tracing::debug!(collection = %T::COLLECTION, id = entity.id(), "entity created");

        let remote = match facade.reconciler.remote() {
            None => RemoteOutcome::LocalOnly,
            Some(remote) => {
                let _queue = facade.reconciler.lock_remote().await;
                let result = push_created(remote.as_ref(), &entity, &replaced).await;
                facade.settle(T::COLLECTION, "create", result)
            }
        };

        Ok(Committed {
            value: entity,
            remote,
        })
    }

    /// Replace an existing entity in place.
    ///
    /// Fails with `NotFound` if the id is not in the local mirror, or
    /// `ValidationFailed` if the entity is invalid; nothing changes then.
    pub async fn update(&self, entity: T) -> Result<Committed<T>, SyncError> {
        let facade = self.facade;
        entity
            .validate()
            .map_err(|e| facade.report_failure(Some(T::COLLECTION), "update", e.into()))?;
        let _pending = facade.reconciler.begin_write(T::COLLECTION);

        facade
            .local
            .modify::<T, _>(|items| {
                let slot = items
                    .iter_mut()
                    .find(|e| e.id() == entity.id())
                    .ok_or_else(|| SyncError::not_found(T::COLLECTION, entity.id()))?;
                *slot = entity.clone();
                Ok(())
            })
            .map_err(|e| facade.report_failure(Some(T::COLLECTION), "update", e))?;
        facade.notifier.notify(T::COLLECTION, ChangeSource::Local);
        tracing::debug!(collection = %T::COLLECTION, id = entity.id(), "entity updated");

        let remote = match facade.reconciler.remote() {
            None => RemoteOutcome::LocalOnly,
            Some(remote) => {
                let _queue = facade.reconciler.lock_remote().await;
                let result = push_updated(remote.as_ref(), &entity).await;
                facade.settle(T::COLLECTION, "update", result)
            }
        };

        Ok(Committed {
            value: entity,
            remote,
        })
    }

    /// Remove an entity by id.
    ///
    /// Deleting an id that is not in the local mirror fails with `NotFound`
    /// and leaves the collection untouched.
    pub async fn delete(&self, id: &str) -> Result<Committed<T>, SyncError> {
        let facade = self.facade;
        let _pending = facade.reconciler.begin_write(T::COLLECTION);

        let removed = facade
            .local
            .modify::<T, _>(|items| {
                let index = items
                    .iter()
                    .position(|e| e.id() == id)
                    .ok_or_else(|| SyncError::not_found(T::COLLECTION, id))?;
                Ok(items.remove(index))
            })
            .map_err(|e| facade.report_failure(Some(T::COLLECTION), "delete", e))?;
        facade.notifier.notify(T::COLLECTION, ChangeSource::Local);
        tracing::debug!(collection = %T::COLLECTION, id, "entity deleted");

        let remote = match facade.reconciler.remote() {
            None => RemoteOutcome::LocalOnly,
            Some(remote) => {
                let _queue = facade.reconciler.lock_remote().await;
                let result = match remote.delete(T::COLLECTION.remote_name(), id).await {
                    Ok(()) | Err(RemoteError::NotFound { .. }) => Ok(()),
                    Err(e) => Err(SyncError::from(e)),
                };
                facade.settle(T::COLLECTION, "delete", result)
            }
        };

        Ok(Committed {
            value: removed,
            remote,
        })
    }
}

async fn push_created<T: CatalogEntity>(
    remote: &dyn RemoteCatalogStore,
    entity: &T,
    replaced: &[T],
) -> Result<(), SyncError> {
    let name = T::COLLECTION.remote_name();
    remote.put(name, remote_record(entity)?).await?;
    for old in replaced {
        match remote.delete(name, old.id()).await {
            Ok(()) | Err(RemoteError::NotFound { .. }) => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

async fn push_updated<T: CatalogEntity>(remote: &dyn RemoteCatalogStore, entity: &T) -> Result<(), SyncError> {
    let name = T::COLLECTION.remote_name();
    let record = remote_record(entity)?;
    match remote.update(name, record.clone()).await {
        Ok(()) => Ok(()),
        // Never reached the remote, e.g. created while offline.
        Err(RemoteError::NotFound { .. }) => Ok(remote.put(name, record).await?),
        Err(e) => Err(e.into()),
    }
}
