//! Deal of the day.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::product::NewProduct;
use crate::ids::DealId;
use crate::{defaults, CatalogEntity, Collection, Product, ValidationError};

fn default_active() -> bool {
    true
}

/// A deal as submitted by the admin panel, before an id is assigned.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewDailyDeal {
    /// The featured listing.
    #[serde(flatten)]
    pub item: NewProduct,
    /// Headline discount percentage (0-100).
    #[serde(default)]
    pub discount: u32,
    /// Whether the deal is switched on.
    #[serde(default = "default_active")]
    pub active: bool,
    /// When the deal stops being shown.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl NewDailyDeal {
    /// Create an active, non-expiring deal around a listing.
    pub fn new(item: NewProduct, discount: u32) -> Self {
        Self {
            item,
            discount,
            active: true,
            expires_at: None,
        }
    }

    /// Feature an existing product, taking the headline discount from its prices.
    pub fn from_product(product: &Product) -> Self {
        let discount = product.discount_percent().round().clamp(0.0, 100.0) as u32;
        Self::new(product.to_draft(), discount)
    }

    /// Set the expiry.
    pub fn expires_at(mut self, at: DateTime<Utc>) -> Self {
        self.expires_at = Some(at);
        self
    }
}

/// The single current deal of the day.
///
/// Product-shaped, plus a headline discount and an expiry. Replacing the
/// deal overwrites it entirely; no history is kept.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DailyDeal {
    pub id: DealId,
    #[serde(flatten)]
    pub item: NewProduct,
    #[serde(default)]
    pub discount: u32,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl DailyDeal {
    pub fn new(id: DealId, draft: NewDailyDeal) -> Self {
        Self {
            id,
            item: draft.item,
            discount: draft.discount,
            active: draft.active,
            expires_at: draft.expires_at,
        }
    }

    /// Check if the deal has passed its expiry at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|at| at <= now).unwrap_or(false)
    }

    /// Check if the deal should be shown at `now`.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.active && !self.is_expired(now)
    }

    /// Time left until expiry, if the deal expires in the future.
    pub fn time_remaining(&self, now: DateTime<Utc>) -> Option<chrono::Duration> {
        self.expires_at.filter(|at| *at > now).map(|at| at - now)
    }
}

impl CatalogEntity for DailyDeal {
    type Draft = NewDailyDeal;
    const COLLECTION: Collection = Collection::DailyDeal;

    fn id(&self) -> &str {
        self.id.as_str()
    }

    fn from_draft(id: String, draft: NewDailyDeal) -> Self {
        DailyDeal::new(DealId::new(id), draft)
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.id.is_blank() {
            return Err(ValidationError::EmptyField("id"));
        }
        if self.discount > 100 {
            return Err(ValidationError::DiscountOutOfRange(self.discount));
        }
        self.item.validate_fields()
    }

    fn defaults() -> Vec<Self> {
        vec![defaults::default_daily_deal()]
    }
}
