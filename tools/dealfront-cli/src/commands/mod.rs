//! CLI command implementations.

pub mod banners;
pub mod config;
pub mod deal;
pub mod products;
pub mod sync;
pub mod transfer;
pub mod watch;

use clap::{Args, Subcommand};
use dealfront_catalog::{BannerPosition, Collection, Price};
use thiserror::Error;

/// A command-line value that could not be parsed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("'{0}' is not a price (expected e.g. 79.99)")]
    InvalidPrice(String),

    #[error("'{0}' is not a banner position (top, middle or bottom)")]
    InvalidPosition(String),

    #[error("'{0}' is not a collection (products, banners or deal)")]
    InvalidCollection(String),
}

fn parse_price(value: &str) -> Result<Price, InputError> {
    value
        .trim()
        .trim_start_matches('$')
        .parse::<f64>()
        .ok()
        .filter(|amount| amount.is_finite())
        .map(Price::from_decimal)
        .ok_or_else(|| InputError::InvalidPrice(value.to_string()))
}

fn parse_position(value: &str) -> Result<BannerPosition, InputError> {
    BannerPosition::from_str(value).ok_or_else(|| InputError::InvalidPosition(value.to_string()))
}

fn parse_collection(value: &str) -> Result<Collection, InputError> {
    Collection::from_name(value).ok_or_else(|| InputError::InvalidCollection(value.to_string()))
}

/// Arguments for the products command.
#[derive(Args)]
pub struct ProductsArgs {
    #[command(subcommand)]
    pub command: ProductsCommand,
}

#[derive(Subcommand)]
pub enum ProductsCommand {
    /// List products.
    List {
        /// Only products in this category.
        #[arg(short, long)]
        category: Option<String>,
    },
    /// Add a product.
    Add {
        /// Product name.
        name: String,
        /// List price.
        #[arg(long, value_parser = parse_price)]
        original: Price,
        /// Selling price.
        #[arg(long, value_parser = parse_price)]
        discount: Price,
        /// Image URL.
        #[arg(long)]
        image: Option<String>,
        /// Category label.
        #[arg(short, long)]
        category: Option<String>,
        /// Affiliate URL.
        #[arg(short, long)]
        link: Option<String>,
        /// Description.
        #[arg(short, long)]
        description: Option<String>,
    },
    /// Change fields of a product.
    Update {
        /// Product ID.
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long, value_parser = parse_price)]
        original: Option<Price>,
        #[arg(long, value_parser = parse_price)]
        discount: Option<Price>,
        #[arg(long)]
        image: Option<String>,
        #[arg(short, long)]
        category: Option<String>,
        #[arg(short, long)]
        link: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
    },
    /// Delete a product.
    Delete {
        /// Product ID.
        id: String,
        /// Skip confirmation.
        #[arg(short, long)]
        yes: bool,
    },
}

/// Arguments for the banners command.
#[derive(Args)]
pub struct BannersArgs {
    #[command(subcommand)]
    pub command: BannersCommand,
}

#[derive(Subcommand)]
pub enum BannersCommand {
    /// List banners.
    List {
        /// Only banners at this position.
        #[arg(short, long, value_parser = parse_position)]
        position: Option<BannerPosition>,
    },
    /// Add a banner.
    Add {
        /// Banner title.
        title: String,
        /// Placement on the storefront.
        #[arg(short, long, value_parser = parse_position, default_value = "top")]
        position: BannerPosition,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(long)]
        image_url: Option<String>,
        #[arg(long)]
        link_url: Option<String>,
        /// Create switched off.
        #[arg(long)]
        inactive: bool,
    },
    /// Switch a banner on or off.
    Toggle {
        /// Banner ID.
        id: String,
    },
    /// Delete a banner.
    Delete {
        /// Banner ID.
        id: String,
        /// Skip confirmation.
        #[arg(short, long)]
        yes: bool,
    },
}

/// Arguments for the deal command.
#[derive(Args)]
pub struct DealArgs {
    #[command(subcommand)]
    pub command: DealCommand,
}

#[derive(Subcommand)]
pub enum DealCommand {
    /// Show the deal of the day.
    Show,
    /// Feature a product as the deal of the day, replacing the current one.
    Set {
        /// ID of the product to feature.
        product: String,
        /// Headline discount percentage (defaults to the product's).
        #[arg(long)]
        discount: Option<u32>,
        /// Hours until the deal expires.
        #[arg(long)]
        hours: Option<i64>,
    },
    /// Remove the deal of the day.
    Clear {
        /// Skip confirmation.
        #[arg(short, long)]
        yes: bool,
    },
}

/// Arguments for the sync command.
#[derive(Args)]
pub struct SyncArgs {
    /// Show every failed entry.
    #[arg(long)]
    pub details: bool,
}

/// Arguments for the export command.
#[derive(Args)]
pub struct ExportArgs {
    /// Collection to export.
    #[arg(value_parser = parse_collection, default_value = "products")]
    pub collection: Collection,

    /// Output file path (default: stdout).
    #[arg(short, long)]
    pub output: Option<String>,
}

/// Arguments for the import command.
#[derive(Args)]
pub struct ImportArgs {
    /// Collection to replace.
    #[arg(value_parser = parse_collection)]
    pub collection: Collection,

    /// File produced by `dealfront export`.
    pub file: String,

    /// Skip confirmation prompt.
    #[arg(short, long)]
    pub yes: bool,
}

/// Arguments for the watch command.
#[derive(Args)]
pub struct WatchArgs {
    /// Collection to watch.
    #[arg(value_parser = parse_collection, default_value = "products")]
    pub collection: Collection,
}

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration.
    Show,
    /// Initialize a new config file.
    Init {
        /// Force overwrite existing config.
        #[arg(short, long)]
        force: bool,
    },
}
