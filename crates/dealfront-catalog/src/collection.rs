//! Top-level catalog collections and their storage keys.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the independent catalog collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Collection {
    /// Affiliate-linked products.
    Products,
    /// Promotional banners.
    Banners,
    /// The single current deal of the day.
    DailyDeal,
}

impl Collection {
    /// Every collection, in load order.
    pub const ALL: [Collection; 3] = [
        Collection::Products,
        Collection::Banners,
        Collection::DailyDeal,
    ];

    /// Key of this collection in the local mirror.
    pub fn storage_key(&self) -> &'static str {
        match self {
            Collection::Products => "products",
            Collection::Banners => "banners",
            Collection::DailyDeal => "dailyDeal",
        }
    }

    /// Name of this collection in the remote catalog store.
    pub fn remote_name(&self) -> &'static str {
        match self {
            Collection::Products => "products",
            Collection::Banners => "banners",
            Collection::DailyDeal => "dailyDeals",
        }
    }

    /// Whether the collection holds at most one record.
    ///
    /// Singleton collections are persisted locally as a bare object rather
    /// than a sequence.
    pub fn is_singleton(&self) -> bool {
        matches!(self, Collection::DailyDeal)
    }

    /// Resolve a local mirror key back to its collection.
    pub fn from_storage_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.storage_key() == key)
    }

    /// Parse a user-facing collection name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "products" | "product" => Some(Collection::Products),
            "banners" | "banner" => Some(Collection::Banners),
            "dailydeal" | "daily-deal" | "deal" | "dailydeals" => Some(Collection::DailyDeal),
            _ => None,
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.storage_key())
    }
}
