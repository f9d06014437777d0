//! Catalog domain types for the Dealfront storefront.
//!
//! This crate provides the typed records the sync layer moves around:
//!
//! - **Products**: affiliate listings with original and discounted prices
//! - **Banners**: promotional banners placed at top/middle/bottom
//! - **Daily deal**: the single featured deal with a discount and expiry
//! - **Record codecs**: fallible decoding at persistence boundaries
//!
//! # Example
//!
//! ```rust
//! use dealfront_catalog::prelude::*;
//!
//! let draft = NewProduct::new("Widget", Price::from_decimal(100.0), Price::from_decimal(80.0))
//!     .with_affiliate_link("https://x");
//! let product = Product::from_draft("r1".to_string(), draft);
//!
//! assert_eq!(product.rounded_discount_percent(), 20);
//! assert!(product.validate().is_ok());
//! ```

pub mod catalog;
pub mod collection;
pub mod defaults;
pub mod entity;
pub mod error;
pub mod ids;
pub mod price;
pub mod record;

pub use catalog::{Banner, BannerPosition, DailyDeal, NewBanner, NewDailyDeal, NewProduct, Product};
pub use collection::Collection;
pub use entity::CatalogEntity;
pub use error::ValidationError;
pub use ids::{BannerId, DealId, IdGenerator, ProductId};
pub use price::Price;
pub use record::FieldMap;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::catalog::{
        Banner, BannerPosition, DailyDeal, NewBanner, NewDailyDeal, NewProduct, Product,
    };
    pub use crate::collection::Collection;
    pub use crate::entity::CatalogEntity;
    pub use crate::error::ValidationError;
    pub use crate::ids::{BannerId, DealId, IdGenerator, ProductId};
    pub use crate::price::Price;
}
