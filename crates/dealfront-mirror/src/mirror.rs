//! Typed local mirror over a [`Storage`] backend.

use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::signal::{StorageBus, StorageEvent, StorageListener, TabId};
use crate::storage::{MemoryStorage, Storage};
use crate::MirrorError;

/// Type-safe local mirror for one tab.
///
/// Values are stored as JSON text. Every write or removal that changes the
/// stored text is announced on the shared [`StorageBus`] so other tabs can
/// refresh.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use dealfront_mirror::{LocalMirror, MemoryStorage, StorageBus};
///
/// let mirror = LocalMirror::new(Arc::new(MemoryStorage::new()), StorageBus::new());
/// mirror.set("banners", &vec!["spring"]).unwrap();
/// let banners: Option<Vec<String>> = mirror.get("banners").unwrap();
/// assert_eq!(banners, Some(vec!["spring".to_string()]));
/// ```
#[derive(Debug, Clone)]
pub struct LocalMirror {
    storage: Arc<dyn Storage>,
    bus: StorageBus,
    tab: TabId,
    prefix: Option<String>,
}

impl LocalMirror {
    /// Create a mirror for a fresh tab.
    pub fn new(storage: Arc<dyn Storage>, bus: StorageBus) -> Self {
        Self {
            storage,
            bus,
            tab: TabId::generate(),
            prefix: None,
        }
    }

    /// A mirror over private in-memory storage, for tests and one-off tools.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()), StorageBus::new())
    }

    /// Another tab of the same profile: same storage and bus, new tab ID.
    pub fn open_tab(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
            bus: self.bus.clone(),
            tab: TabId::generate(),
            prefix: self.prefix.clone(),
        }
    }

    /// Use an explicit tab ID.
    pub fn with_tab(mut self, tab: TabId) -> Self {
        self.tab = tab;
        self
    }

    /// Namespace every key as `prefix:name`.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        self.prefix = if prefix.is_empty() { None } else { Some(prefix) };
        self
    }

    pub fn tab(&self) -> &TabId {
        &self.tab
    }

    pub fn bus(&self) -> &StorageBus {
        &self.bus
    }

    /// Full storage key for a logical name.
    pub fn key(&self, name: &str) -> String {
        match &self.prefix {
            Some(prefix) => crate::mirror_key!(prefix, name),
            None => name.to_string(),
        }
    }

    /// Logical name for a full storage key, if it belongs to this mirror's namespace.
    pub fn logical_name<'a>(&self, key: &'a str) -> Option<&'a str> {
        match &self.prefix {
            Some(prefix) => key
                .strip_prefix(prefix.as_str())
                .and_then(|rest| rest.strip_prefix(':')),
            None => Some(key),
        }
    }

    /// Get a value, returning `None` if the name isn't stored.
    pub fn get<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, MirrorError> {
        match self.storage.get_item(&self.key(name))? {
            Some(text) => Ok(Some(serde_json::from_str(&text)?)),
            None => Ok(None),
        }
    }

    /// Get a value as untyped JSON.
    pub fn get_value(&self, name: &str) -> Result<Option<Value>, MirrorError> {
        self.get::<Value>(name)
    }

    /// Store a value, announcing the change to other tabs.
    ///
    /// Writing the exact text already stored is a no-op and publishes nothing.
    pub fn set<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> Result<(), MirrorError> {
        let key = self.key(name);
        let text = serde_json::to_string(value)?;
        if self.storage.get_item(&key)?.as_deref() == Some(text.as_str()) {
            return Ok(());
        }
        self.storage.set_item(&key, &text)?;
        tracing::debug!(key = %key, bytes = text.len(), "mirror write");
        self.announce(Some(key));
        Ok(())
    }

    /// Remove a value, announcing the change if it existed.
    pub fn delete(&self, name: &str) -> Result<(), MirrorError> {
        let key = self.key(name);
        if self.storage.get_item(&key)?.is_none() {
            return Ok(());
        }
        self.storage.remove_item(&key)?;
        tracing::debug!(key = %key, "mirror remove");
        self.announce(Some(key));
        Ok(())
    }

    pub fn exists(&self, name: &str) -> Result<bool, MirrorError> {
        Ok(self.storage.get_item(&self.key(name))?.is_some())
    }

    /// Logical names stored in this mirror's namespace.
    pub fn keys(&self) -> Result<Vec<String>, MirrorError> {
        Ok(self
            .storage
            .keys()?
            .iter()
            .filter_map(|key| self.logical_name(key).map(str::to_string))
            .collect())
    }

    /// Remove every name in this mirror's namespace.
    pub fn clear(&self) -> Result<(), MirrorError> {
        let keys = self.keys()?;
        if keys.is_empty() {
            return Ok(());
        }
        for name in &keys {
            self.storage.remove_item(&self.key(name))?;
        }
        tracing::debug!(removed = keys.len(), "mirror cleared");
        self.announce(None);
        Ok(())
    }

    /// Listen for changes made by other tabs.
    pub fn listen(&self) -> StorageListener {
        self.bus.listener(self.tab.clone())
    }

    fn announce(&self, key: Option<String>) {
        self.bus.publish(StorageEvent {
            key,
            origin: self.tab.clone(),
        });
    }
}

/// Helper to build namespaced storage keys.
///
/// # Example
///
/// ```rust
/// use dealfront_mirror::mirror_key;
///
/// let key = mirror_key!("shop", "products");
/// assert_eq!(key, "shop:products");
/// ```
#[macro_export]
macro_rules! mirror_key {
    ($prefix:expr, $($part:expr),+) => {{
        let mut key = $prefix.to_string();
        $(
            key.push(':');
            key.push_str(&$part.to_string());
        )+
        key
    }};
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Item {
        id: String,
        qty: u32,
    }

    #[test]
    fn test_typed_round_trip() {
        let mirror = LocalMirror::in_memory();
        let items = vec![Item { id: "a".into(), qty: 2 }];
        mirror.set("items", &items).unwrap();
        let loaded: Vec<Item> = mirror.get("items").unwrap().unwrap();
        assert_eq!(loaded, items);
        assert!(mirror.exists("items").unwrap());
    }

    #[test]
    fn test_missing_and_corrupt() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set_item("items", "{not json").unwrap();
        let mirror = LocalMirror::new(storage, StorageBus::new());
        assert!(mirror.get::<Vec<Item>>("absent").unwrap().is_none());
        assert!(matches!(
            mirror.get::<Vec<Item>>("items"),
            Err(MirrorError::SerializeError(_))
        ));
    }

    #[test]
    fn test_prefix_namespacing() {
        let storage = Arc::new(MemoryStorage::new());
        let bus = StorageBus::new();
        let shop = LocalMirror::new(storage.clone(), bus.clone()).with_prefix("shop");
        let other = LocalMirror::new(storage.clone(), bus).with_prefix("other");

        shop.set("products", &Vec::<u32>::new()).unwrap();
        other.set("products", &vec![1]).unwrap();

        assert_eq!(shop.key("products"), "shop:products");
        assert_eq!(shop.keys().unwrap(), vec!["products".to_string()]);
        assert_eq!(shop.logical_name("other:products"), None);
        assert_eq!(storage.keys().unwrap().len(), 2);
    }

    #[test]
    fn test_writes_notify_other_tabs_only() {
        let first = LocalMirror::in_memory();
        let second = first.open_tab();
        let mut first_listener = first.listen();
        let mut second_listener = second.listen();

        first.set("banners", &vec![1, 2]).unwrap();

        assert_eq!(first_listener.try_recv(), None);
        let event = second_listener.try_recv().unwrap();
        assert_eq!(event.key.as_deref(), Some("banners"));
        assert_eq!(&event.origin, first.tab());
        // Both tabs read the same storage.
        assert_eq!(second.get::<Vec<u32>>("banners").unwrap(), Some(vec![1, 2]));
    }

    #[test]
    fn test_unchanged_write_is_silent() {
        let first = LocalMirror::in_memory();
        let second = first.open_tab();
        let mut listener = second.listen();

        first.set("products", &vec![1]).unwrap();
        first.set("products", &vec![1]).unwrap();
        first.delete("missing").unwrap();

        assert!(listener.try_recv().is_some());
        assert!(listener.try_recv().is_none());
    }

    #[test]
    fn test_clear_announces_keyless_event() {
        let first = LocalMirror::in_memory();
        let second = first.open_tab();
        first.set("a", &1).unwrap();
        first.set("b", &2).unwrap();
        let mut listener = second.listen();

        first.clear().unwrap();

        assert!(first.keys().unwrap().is_empty());
        assert_eq!(listener.try_recv().unwrap().key, None);
    }

    #[test]
    fn test_quota_error_surfaces() {
        let mirror = LocalMirror::new(Arc::new(MemoryStorage::with_quota(16)), StorageBus::new());
        let err = mirror.set("products", &"a long enough value").unwrap_err();
        assert!(matches!(err, MirrorError::QuotaExceeded { .. }));
        assert!(!mirror.exists("products").unwrap());
    }

    #[test]
    fn test_mirror_key_macro() {
        assert_eq!(mirror_key!("shop", "deal", 1), "shop:deal:1");
        let prefix = String::from("p");
        assert_eq!(mirror_key!(prefix, "x"), "p:x");
    }
}
