//! Subscribed views of one collection.

use std::time::Duration;

use dealfront_catalog::CatalogEntity;
use tokio::sync::{broadcast, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::local::LocalCatalog;
use crate::notifier::ChangeNotifier;

/// A live view of one collection, kept current by two independent paths.
///
/// Change events for the collection trigger an immediate refresh, and a
/// polling timer re-reads the local mirror every interval regardless. Both
/// feed the same [`refresh`](CatalogView::refresh): re-read, compare by
/// value, publish on change. A write whose event was missed is therefore
/// picked up within one interval.
///
/// The background task stops on [`shutdown`](CatalogView::shutdown) or when
/// the view is dropped.
pub struct CatalogView<T: CatalogEntity> {
    local: LocalCatalog,
    state: watch::Sender<Vec<T>>,
    stop: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl<T: CatalogEntity> CatalogView<T> {
    /// Open a view and start its refresh task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn open(local: LocalCatalog, notifier: &ChangeNotifier, poll_interval: Duration) -> Self {
        let initial = read_or_fallback::<T>(&local);
        let (state, _) = watch::channel(initial);
        let (stop_tx, stop_rx) = oneshot::channel();

        let task = tokio::spawn(run_refresh_loop(
            local.clone(),
            state.clone(),
            notifier.subscribe(),
            poll_interval,
            stop_rx,
        ));

        Self {
            local,
            state,
            stop: Some(stop_tx),
            task: Some(task),
        }
    }

    /// The snapshot currently rendered.
    pub fn snapshot(&self) -> Vec<T> {
        self.state.borrow().clone()
    }

    /// Watch the rendered snapshot.
    pub fn watch(&self) -> watch::Receiver<Vec<T>> {
        self.state.subscribe()
    }

    /// Re-read the local mirror now. Returns whether the snapshot changed.
    pub fn refresh(&self) -> bool {
        refresh_snapshot(&self.local, &self.state)
    }

    /// Stop the refresh task.
    pub async fn shutdown(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl<T: CatalogEntity> Drop for CatalogView<T> {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl<T: CatalogEntity> std::fmt::Debug for CatalogView<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogView")
            .field("collection", &T::COLLECTION)
            .field("len", &self.state.borrow().len())
            .finish()
    }
}

async fn run_refresh_loop<T: CatalogEntity>(
    local: LocalCatalog,
    state: watch::Sender<Vec<T>>,
    mut events: broadcast::Receiver<crate::ChangeEvent>,
    poll_interval: Duration,
    mut stop: oneshot::Receiver<()>,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + poll_interval, poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut events_open = true;

    loop {
        tokio::select! {
            _ = &mut stop => break,
            event = events.recv(), if events_open => match event {
                Ok(event) if event.collection == T::COLLECTION => {
                    if refresh_snapshot(&local, &state) {
                        tracing::debug!(collection = %T::COLLECTION, source = ?event.source, "view refreshed by event");
                    }
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!(collection = %T::COLLECTION, skipped, "view lagged behind events");
                    refresh_snapshot(&local, &state);
                }
                // Notifier gone: keep polling.
                Err(broadcast::error::RecvError::Closed) => events_open = false,
            },
            _ = ticker.tick() => {
                if refresh_snapshot(&local, &state) {
                    tracing::debug!(collection = %T::COLLECTION, "view refreshed by polling");
                }
            }
        }
    }
}

fn refresh_snapshot<T: CatalogEntity>(local: &LocalCatalog, state: &watch::Sender<Vec<T>>) -> bool {
    let fresh = match local.read::<T>() {
        Ok(fresh) => fresh,
        Err(e) => {
            // Keep showing what we have.
            tracing::warn!(collection = %T::COLLECTION, error = %e, "view refresh failed");
            return false;
        }
    };
    state.send_if_modified(|current| {
        if *current == fresh {
            return false;
        }
        *current = fresh;
        true
    })
}

fn read_or_fallback<T: CatalogEntity>(local: &LocalCatalog) -> Vec<T> {
    match local.read::<T>() {
        Ok(entities) => entities,
        Err(e) => {
            tracing::warn!(collection = %T::COLLECTION, error = %e, "view opened on defaults");
            T::defaults()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ChangeSource;
    use dealfront_catalog::{Banner, BannerPosition, NewBanner, NewProduct, Price, Product};
    use dealfront_mirror::LocalMirror;

    fn banner(id: &str) -> Banner {
        Banner::from_draft(id.to_string(), NewBanner::new("Sale", BannerPosition::Top))
    }

    #[tokio::test(start_paused = true)]
    async fn test_event_triggers_refresh() {
        let local = LocalCatalog::new(LocalMirror::in_memory());
        let notifier = ChangeNotifier::new();
        let view = CatalogView::<Banner>::open(local.clone(), &notifier, Duration::from_secs(60));
        let mut watch = view.watch();
        assert!(view.snapshot().is_empty());

        local.write(&[banner("b1")]).unwrap();
        notifier.notify(Banner::COLLECTION, ChangeSource::Local);

        tokio::time::timeout(Duration::from_secs(1), watch.changed())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(view.snapshot(), vec![banner("b1")]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_polling_catches_silent_write() {
        let local = LocalCatalog::new(LocalMirror::in_memory());
        let notifier = ChangeNotifier::new();
        let view = CatalogView::<Banner>::open(local.clone(), &notifier, Duration::from_secs(5));
        let mut watch = view.watch();

        // No notification at all.
        local.write(&[banner("b1")]).unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(view.snapshot().is_empty());

        tokio::time::timeout(Duration::from_secs(10), watch.changed())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(view.snapshot().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_events_for_other_collections_are_ignored() {
        let local = LocalCatalog::new(LocalMirror::in_memory());
        let notifier = ChangeNotifier::new();
        let view = CatalogView::<Banner>::open(local.clone(), &notifier, Duration::from_secs(60));

        local.write(&[banner("b1")]).unwrap();
        notifier.notify(Product::COLLECTION, ChangeSource::Local);
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(view.snapshot().is_empty());

        assert!(view.refresh());
        assert!(!view.refresh());
    }

    #[tokio::test]
    async fn test_unchanged_snapshot_is_not_republished() {
        let local = LocalCatalog::new(LocalMirror::in_memory());
        local.write(&[banner("b1")]).unwrap();
        let notifier = ChangeNotifier::new();
        let view = CatalogView::<Banner>::open(local.clone(), &notifier, Duration::from_secs(60));
        let watch = view.watch();

        assert!(!view.refresh());
        assert!(!watch.has_changed().unwrap());
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_opens_on_defaults() {
        let local = LocalCatalog::new(LocalMirror::in_memory());
        local
            .mirror()
            .set("products", &serde_json::json!([{ "id": "p", "name": "" }]))
            .unwrap();
        let notifier = ChangeNotifier::new();
        let view = CatalogView::<Product>::open(local.clone(), &notifier, Duration::from_secs(60));
        assert_eq!(view.snapshot(), Product::defaults());

        // A failing refresh keeps the current snapshot.
        assert!(!view.refresh());
        assert_eq!(view.snapshot(), Product::defaults());

        local
            .write(&[Product::from_draft(
                "p1".to_string(),
                NewProduct::new("Lamp", Price::from_decimal(2.0), Price::from_decimal(1.0)),
            )])
            .unwrap();
        assert!(view.refresh());
        view.shutdown().await;
    }
}
