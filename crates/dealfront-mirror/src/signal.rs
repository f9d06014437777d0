//! Cross-tab change signals.
//!
//! Every tab of a profile shares one [`StorageBus`]. A write through a
//! [`LocalMirror`](crate::LocalMirror) publishes a [`StorageEvent`]; each
//! tab's [`StorageListener`] sees the events of the *other* tabs only, the
//! same way a browser never delivers a `storage` event to the tab that made
//! the change.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Default buffer of undelivered events per listener.
const DEFAULT_CAPACITY: usize = 64;

/// Identifies one tab (one running instance) of a profile.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TabId(String);

impl TabId {
    /// Create a tab ID from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a new random tab ID.
    pub fn generate() -> Self {
        use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
        use rand::Rng;

        let bytes: [u8; 18] = rand::thread_rng().gen();
        Self(format!("tab_{}", URL_SAFE_NO_PAD.encode(bytes)))
    }

    /// Get the tab ID as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TabId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for TabId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for TabId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A change made to shared storage by some tab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
    /// Full storage key that changed, or `None` when every key may have
    /// changed (storage cleared, or events were dropped).
    pub key: Option<String>,
    /// Tab that made the change.
    pub origin: TabId,
}

impl StorageEvent {
    /// Whether this event may concern `key`.
    pub fn touches(&self, key: &str) -> bool {
        self.key.as_deref().map_or(true, |k| k == key)
    }
}

/// Broadcast channel shared by all tabs of one profile.
#[derive(Debug, Clone)]
pub struct StorageBus {
    tx: broadcast::Sender<StorageEvent>,
}

impl StorageBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish an event. Having no listeners is not an error.
    pub fn publish(&self, event: StorageEvent) {
        let delivered = self.tx.send(event).unwrap_or(0);
        tracing::trace!(delivered, "storage event published");
    }

    /// Subscribe on behalf of `tab`; the tab's own events are filtered out.
    pub fn listener(&self, tab: TabId) -> StorageListener {
        StorageListener {
            rx: self.tx.subscribe(),
            tab,
        }
    }
}

impl Default for StorageBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Receives storage events made by other tabs.
#[derive(Debug)]
pub struct StorageListener {
    rx: broadcast::Receiver<StorageEvent>,
    tab: TabId,
}

impl StorageListener {
    /// Wait for the next foreign event.
    ///
    /// Returns `None` once every bus handle is gone. If the listener fell
    /// behind, a key-less event is returned so the caller re-reads
    /// everything.
    pub async fn recv(&mut self) -> Option<StorageEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) if event.origin == self.tab => continue,
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!(tab = %self.tab, skipped, "storage listener lagged");
                    return Some(self.lagged_event());
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Non-blocking variant of [`recv`](Self::recv).
    pub fn try_recv(&mut self) -> Option<StorageEvent> {
        loop {
            match self.rx.try_recv() {
                Ok(event) if event.origin == self.tab => continue,
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(_)) => {
                    return Some(self.lagged_event())
                }
                Err(_) => return None,
            }
        }
    }

    /// The tab this listener belongs to.
    pub fn tab(&self) -> &TabId {
        &self.tab
    }

    fn lagged_event(&self) -> StorageEvent {
        StorageEvent {
            key: None,
            origin: TabId::new("unknown"),
        }
    }
}
