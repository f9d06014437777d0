//! Promotional banner types.

use crate::ids::BannerId;
use crate::{defaults, CatalogEntity, Collection, ValidationError};
use serde::{Deserialize, Serialize};

/// Where on the storefront a banner is placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BannerPosition {
    #[default]
    Top,
    Middle,
    Bottom,
}

impl BannerPosition {
    pub fn as_str(&self) -> &'static str {
        match self {
            BannerPosition::Top => "top",
            BannerPosition::Middle => "middle",
            BannerPosition::Bottom => "bottom",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "top" => Some(BannerPosition::Top),
            "middle" => Some(BannerPosition::Middle),
            "bottom" => Some(BannerPosition::Bottom),
            _ => None,
        }
    }
}

fn default_active() -> bool {
    true
}

/// A banner as submitted by the admin panel, before an id is assigned.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewBanner {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub link_url: String,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub position: BannerPosition,
}

impl NewBanner {
    /// Create an active banner draft.
    pub fn new(title: impl Into<String>, position: BannerPosition) -> Self {
        Self {
            title: title.into(),
            description: None,
            image_url: String::new(),
            link_url: String::new(),
            active: true,
            position,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_image_url(mut self, url: impl Into<String>) -> Self {
        self.image_url = url.into();
        self
    }

    pub fn with_link_url(mut self, url: impl Into<String>) -> Self {
        self.link_url = url.into();
        self
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }
}

/// A promotional banner.
///
/// Several banners may share a position; the storefront rotates through the
/// active ones in insertion order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Banner {
    pub id: BannerId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub link_url: String,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub position: BannerPosition,
}

impl Banner {
    pub fn new(id: BannerId, draft: NewBanner) -> Self {
        Self {
            id,
            title: draft.title,
            description: draft.description,
            image_url: draft.image_url,
            link_url: draft.link_url,
            active: draft.active,
            position: draft.position,
        }
    }

    /// Whether the banner should be shown at `position`.
    pub fn shows_at(&self, position: BannerPosition) -> bool {
        self.active && self.position == position
    }

    /// Active banners for a position, in insertion order.
    pub fn active_at(banners: &[Banner], position: BannerPosition) -> Vec<&Banner> {
        banners.iter().filter(|b| b.shows_at(position)).collect()
    }
}

impl CatalogEntity for Banner {
    type Draft = NewBanner;
    const COLLECTION: Collection = Collection::Banners;

    fn id(&self) -> &str {
        self.id.as_str()
    }

    fn from_draft(id: String, draft: NewBanner) -> Self {
        Banner::new(BannerId::new(id), draft)
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.id.is_blank() {
            return Err(ValidationError::EmptyField("id"));
        }
        if self.title.trim().is_empty() {
            return Err(ValidationError::EmptyField("title"));
        }
        Ok(())
    }

    fn defaults() -> Vec<Self> {
        defaults::default_banners()
    }
}
