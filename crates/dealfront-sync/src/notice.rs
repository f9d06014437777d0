//! Transient user-facing notices.

use dealfront_catalog::Collection;
use tokio::sync::broadcast;

const NOTICE_CAPACITY: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// A short message the UI shows briefly, e.g. "saved locally, remote sync pending".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
    pub collection: Option<Collection>,
}

/// Broadcast channel of notices. Publishing with no listener is fine.
#[derive(Debug, Clone)]
pub struct Notices {
    tx: broadcast::Sender<Notice>,
}

impl Notices {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(NOTICE_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.tx.subscribe()
    }

    pub fn publish(&self, level: NoticeLevel, collection: Option<Collection>, message: impl Into<String>) {
        let notice = Notice {
            level,
            message: message.into(),
            collection,
        };
        let _ = self.tx.send(notice);
    }

    pub fn info(&self, collection: Option<Collection>, message: impl Into<String>) {
        self.publish(NoticeLevel::Info, collection, message);
    }

    pub fn warn(&self, collection: Option<Collection>, message: impl Into<String>) {
        self.publish(NoticeLevel::Warning, collection, message);
    }

    pub fn error(&self, collection: Option<Collection>, message: impl Into<String>) {
        self.publish(NoticeLevel::Error, collection, message);
    }
}

impl Default for Notices {
    fn default() -> Self {
        Self::new()
    }
}
