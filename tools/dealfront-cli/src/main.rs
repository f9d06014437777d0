//! Dealfront CLI - Command line admin for the storefront catalog.
//!
//! Commands:
//! - `dealfront products` - List, add, update and delete products
//! - `dealfront banners` - List, add, toggle and delete banners
//! - `dealfront deal` - Show, set or clear the deal of the day
//! - `dealfront sync` - Push the local mirror to the remote store
//! - `dealfront export` / `import` - Move whole collections through files
//! - `dealfront watch` - Follow a collection live
//! - `dealfront config` - Manage configuration

mod commands;
mod config;
mod context;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    BannersArgs, ConfigArgs, DealArgs, ExportArgs, ImportArgs, ProductsArgs, SyncArgs, WatchArgs,
};

/// Dealfront CLI - Manage the storefront catalog and its sync
#[derive(Parser)]
#[command(name = "dealfront")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use JSON output format
    #[arg(long, global = true)]
    json: bool,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage products
    Products(ProductsArgs),

    /// Manage promotional banners
    Banners(BannersArgs),

    /// Manage the deal of the day
    Deal(DealArgs),

    /// Push every local entry to the remote store
    Sync(SyncArgs),

    /// Write a collection to a JSON file
    Export(ExportArgs),

    /// Replace a collection from an exported JSON file
    Import(ImportArgs),

    /// Follow a collection as it changes
    Watch(WatchArgs),

    /// Manage configuration
    Config(ConfigArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_tracing(cli.verbose);

    // Setup output formatting
    let output = output::Output::new(cli.verbose, cli.json);

    // Load config
    let config_path = cli.config.as_deref();
    let ctx = context::Context::load(config_path, output)?;

    // Execute command
    let result = match cli.command {
        Commands::Products(args) => commands::products::run(args, &ctx).await,
        Commands::Banners(args) => commands::banners::run(args, &ctx).await,
        Commands::Deal(args) => commands::deal::run(args, &ctx).await,
        Commands::Sync(args) => commands::sync::run(args, &ctx).await,
        Commands::Export(args) => commands::transfer::export(args, &ctx).await,
        Commands::Import(args) => commands::transfer::import(args, &ctx).await,
        Commands::Watch(args) => commands::watch::run(args, &ctx).await,
        Commands::Config(args) => commands::config::run(args, &ctx).await,
    };

    if let Err(e) = result {
        ctx.output.error(&format!("{:#}", e));
        std::process::exit(1);
    }

    Ok(())
}

/// Log to stderr. `RUST_LOG` wins; otherwise only warnings, or debug for
/// the catalog crates with `--verbose`.
fn setup_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("warn,dealfront_sync=debug,dealfront_remote=debug,dealfront_mirror=debug")
        } else {
            EnvFilter::new("warn")
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .init();
}
