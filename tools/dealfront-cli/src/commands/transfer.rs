//! Export and import of whole collections.

use std::fs;

use anyhow::{Context as _, Result};
use dealfront_catalog::{Banner, Collection, DailyDeal, Product};
use dealfront_sync::{parse_import, CatalogFacade};
use dialoguer::Confirm;

use super::{ExportArgs, ImportArgs};
use crate::context::Context;

/// Run the export command.
pub async fn export(args: ExportArgs, ctx: &Context) -> Result<()> {
    let catalog = ctx.open_catalog().await?;
    let exported = catalog.export(args.collection);
    catalog.shutdown().await;
    let exported = exported?;

    match args.output {
        Some(path) => {
            let path = ctx.cwd.join(path);
            fs::write(&path, &exported)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            ctx.output
                .success(&format!("Exported {} to {}", args.collection, path.display()));
        }
        None => println!("{}", exported),
    }
    Ok(())
}

/// Run the import command.
pub async fn import(args: ImportArgs, ctx: &Context) -> Result<()> {
    let path = ctx.cwd.join(&args.file);
    let payload = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    // Check the file before touching anything.
    let incoming = count_valid(args.collection, &payload)
        .with_context(|| format!("{} is not a valid {} export", path.display(), args.collection))?;

    let catalog = ctx.open_catalog().await?;
    let result = apply_import(&args, &payload, incoming, &catalog, ctx).await;
    catalog.shutdown().await;
    result
}

async fn apply_import(
    args: &ImportArgs,
    payload: &str,
    incoming: usize,
    catalog: &CatalogFacade,
    ctx: &Context,
) -> Result<()> {
    if !args.yes && !ctx.output.is_json() {
        let current = match args.collection {
            Collection::Products => catalog.products().list().len(),
            Collection::Banners => catalog.banners().list().len(),
            Collection::DailyDeal => catalog.daily_deal().list().len(),
        };
        ctx.output.warn(&format!(
            "This replaces {} {} entries with {} from {}",
            current, args.collection, incoming, args.file
        ));
        let confirmed = Confirm::new()
            .with_prompt("Proceed with import?")
            .default(false)
            .interact()?;
        if !confirmed {
            ctx.output.warn("Import cancelled");
            return Ok(());
        }
    }

    let report = catalog.import_collection(args.collection, payload).await?;
    if ctx.output.is_json() {
        ctx.output.json(&serde_json::json!({
            "collection": report.collection,
            "imported": report.imported,
            "replaced": report.replaced,
            "pushed": report.sync.pushed,
            "failed": report.sync.failures.len(),
        }));
        return Ok(());
    }

    ctx.output.success(&format!(
        "Imported {} {} entries (replaced {})",
        report.imported, report.collection, report.replaced
    ));
    if !report.sync.is_complete() {
        ctx.output.warn(&format!(
            "{} entries are not on the remote store yet; run `dealfront sync` later",
            report.sync.failures.len()
        ));
    }
    Ok(())
}

fn count_valid(collection: Collection, payload: &str) -> Result<usize> {
    let count = match collection {
        Collection::Products => parse_import::<Product>(payload)?.len(),
        Collection::Banners => parse_import::<Banner>(payload)?.len(),
        Collection::DailyDeal => parse_import::<DailyDeal>(payload)?.len(),
    };
    Ok(count)
}
