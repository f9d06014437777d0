//! In-tab and cross-tab change broadcast.

use dealfront_catalog::Collection;
use dealfront_mirror::StorageListener;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::local::LocalCatalog;

const EVENT_CAPACITY: usize = 64;

/// Where a change came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeSource {
    /// A write made by this tab.
    Local,
    /// A write made by another tab of the same profile.
    CrossTab,
    /// A snapshot pushed by the remote store.
    Remote,
}

/// "This collection changed; re-read it."
///
/// Events carry no payload. Consumers always re-read the full collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeEvent {
    pub collection: Collection,
    pub source: ChangeSource,
}

/// Broadcast hub every view of one tab subscribes to.
#[derive(Debug, Clone)]
pub struct ChangeNotifier {
    tx: broadcast::Sender<ChangeEvent>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::with_capacity(EVENT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn notify(&self, collection: Collection, source: ChangeSource) {
        let receivers = self.tx.send(ChangeEvent { collection, source }).unwrap_or(0);
        tracing::trace!(%collection, ?source, receivers, "change notified");
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.tx.subscribe()
    }

    /// Re-broadcast other tabs' storage writes as [`ChangeSource::CrossTab`] events.
    ///
    /// Keys outside the catalog are ignored; a key-less event (storage
    /// cleared, or the listener lagged) fans out to every collection. The
    /// task ends when the storage bus goes away.
    pub fn bridge_storage(&self, mut listener: StorageListener, local: LocalCatalog) -> JoinHandle<()> {
        let notifier = self.clone();
        tokio::spawn(async move {
            while let Some(event) = listener.recv().await {
                match event.key.as_deref() {
                    Some(key) => match local.collection_for_key(key) {
                        Some(collection) => notifier.notify(collection, ChangeSource::CrossTab),
                        None => tracing::trace!(key, "ignoring storage event"),
                    },
                    None => {
                        for collection in Collection::ALL {
                            notifier.notify(collection, ChangeSource::CrossTab);
                        }
                    }
                }
            }
            tracing::debug!(tab = %listener.tab(), "storage bridge stopped");
        })
    }
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dealfront_mirror::LocalMirror;
    use std::time::Duration;

    #[test]
    fn test_notify_reaches_subscribers() {
        let notifier = ChangeNotifier::new();
        let mut rx = notifier.subscribe();
        notifier.notify(Collection::Banners, ChangeSource::Local);
        assert_eq!(
            rx.try_recv().unwrap(),
            ChangeEvent {
                collection: Collection::Banners,
                source: ChangeSource::Local
            }
        );
    }

    #[tokio::test]
    async fn test_bridge_maps_other_tab_writes() {
        let first = LocalMirror::in_memory().with_prefix("shop");
        let second = first.open_tab();
        let notifier = ChangeNotifier::new();
        let mut rx = notifier.subscribe();
        let task = notifier.bridge_storage(second.listen(), LocalCatalog::new(second.clone()));

        first.set("cart", &1).unwrap();
        first.set("banners", &Vec::<u8>::new()).unwrap();
        // Writes by the bridged tab itself never come back as cross-tab events.
        second.set("products", &Vec::<u8>::new()).unwrap();

        let event = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.collection, Collection::Banners);
        assert_eq!(event.source, ChangeSource::CrossTab);
        assert!(rx.try_recv().is_err());
        task.abort();
    }

    #[tokio::test]
    async fn test_bridge_fans_out_keyless_events() {
        let first = LocalMirror::in_memory();
        let second = first.open_tab();
        first.set("products", &1).unwrap();
        let notifier = ChangeNotifier::new();
        let mut rx = notifier.subscribe();
        let task = notifier.bridge_storage(second.listen(), LocalCatalog::new(second.clone()));

        first.clear().unwrap();

        let mut seen = Vec::new();
        for _ in 0..3 {
            let event = tokio::time::timeout(Duration::from_secs(1), rx.recv())
                .await
                .unwrap()
                .unwrap();
            seen.push(event.collection);
        }
        assert_eq!(seen, Collection::ALL.to_vec());
        task.abort();
    }
}
