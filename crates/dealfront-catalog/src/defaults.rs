//! Bundled default dataset.
//!
//! Shown when neither the remote store nor the local mirror has anything,
//! so the storefront never renders an empty catalog.

use crate::ids::{BannerId, DealId, ProductId};
use crate::{Banner, BannerPosition, DailyDeal, NewBanner, NewDailyDeal, NewProduct, Price, Product};

/// Default products.
pub fn default_products() -> Vec<Product> {
    vec![
        Product::new(
            ProductId::new("default-1"),
            NewProduct::new(
                "Wireless Earbuds",
                Price::from_decimal(2999.0),
                Price::from_decimal(1499.0),
            )
            .with_image("https://images.example.com/earbuds.jpg")
            .with_category("Electronics")
            .with_affiliate_link("https://www.example.com/dp/earbuds?tag=dealfront-21")
            .with_description("Bluetooth 5.3 earbuds with 30 hour battery life."),
        ),
        Product::new(
            ProductId::new("default-2"),
            NewProduct::new(
                "Stainless Steel Water Bottle",
                Price::from_decimal(899.0),
                Price::from_decimal(549.0),
            )
            .with_image("https://images.example.com/bottle.jpg")
            .with_category("Home & Kitchen")
            .with_affiliate_link("https://www.example.com/dp/bottle?tag=dealfront-21")
            .with_description("Insulated 1L bottle, keeps drinks cold for 24 hours."),
        ),
        Product::new(
            ProductId::new("default-3"),
            NewProduct::new(
                "Running Shoes",
                Price::from_decimal(3499.0),
                Price::from_decimal(2099.0),
            )
            .with_image("https://images.example.com/shoes.jpg")
            .with_category("Fashion")
            .with_affiliate_link("https://www.example.com/dp/shoes?tag=dealfront-21")
            .with_description("Lightweight mesh running shoes."),
        ),
    ]
}

/// Default banners.
pub fn default_banners() -> Vec<Banner> {
    vec![
        Banner::new(
            BannerId::new("default-banner-1"),
            NewBanner::new("Mega Electronics Sale", BannerPosition::Top)
                .with_description("Up to 60% off on audio and wearables")
                .with_image_url("https://images.example.com/banner-electronics.jpg")
                .with_link_url("/category/electronics"),
        ),
        Banner::new(
            BannerId::new("default-banner-2"),
            NewBanner::new("Kitchen Essentials", BannerPosition::Middle)
                .with_image_url("https://images.example.com/banner-kitchen.jpg")
                .with_link_url("/category/home-kitchen"),
        ),
    ]
}

/// Default deal of the day.
pub fn default_daily_deal() -> DailyDeal {
    DailyDeal::new(
        DealId::new("default-deal"),
        NewDailyDeal::new(
            NewProduct::new(
                "Smart Fitness Band",
                Price::from_decimal(3999.0),
                Price::from_decimal(1799.0),
            )
            .with_image("https://images.example.com/fitness-band.jpg")
            .with_category("Electronics")
            .with_affiliate_link("https://www.example.com/dp/band?tag=dealfront-21")
            .with_description("Heart rate, SpO2 and sleep tracking."),
            55,
        ),
    )
}
