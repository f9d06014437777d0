//! Catalog entity module.
//!
//! Contains the three independent collections: products, banners, and the
//! deal of the day.

mod banner;
mod deal;
pub(crate) mod product;

pub use banner::{Banner, BannerPosition, NewBanner};
pub use deal::{DailyDeal, NewDailyDeal};
pub use product::{NewProduct, Product};
