//! Banner management.

use anyhow::{bail, Result};
use dealfront_catalog::{Banner, NewBanner};
use dealfront_sync::CatalogFacade;
use dialoguer::Confirm;

use super::{BannersArgs, BannersCommand};
use crate::commands::products::truncate;
use crate::context::Context;
use crate::output::active_badge;

/// Run the banners command.
pub async fn run(args: BannersArgs, ctx: &Context) -> Result<()> {
    let catalog = ctx.open_catalog().await?;
    let result = execute(args.command, &catalog, ctx).await;
    catalog.shutdown().await;
    result
}

async fn execute(command: BannersCommand, catalog: &CatalogFacade, ctx: &Context) -> Result<()> {
    match command {
        BannersCommand::List { position } => {
            let banners: Vec<Banner> = catalog
                .banners()
                .list()
                .into_iter()
                .filter(|b| position.map_or(true, |p| b.position == p))
                .collect();
            list_banners(&banners, ctx);
        }
        BannersCommand::Add {
            title,
            position,
            description,
            image_url,
            link_url,
            inactive,
        } => {
            let mut draft = NewBanner::new(title, position);
            if let Some(description) = description {
                draft = draft.with_description(description);
            }
            if let Some(url) = image_url {
                draft = draft.with_image_url(url);
            }
            if let Some(url) = link_url {
                draft = draft.with_link_url(url);
            }
            if inactive {
                draft = draft.inactive();
            }

            let created = catalog.banners().create(draft).await?;
            ctx.output.remote_outcome(&created.remote);
            if ctx.output.is_json() {
                ctx.output.json(&created.value);
            } else {
                ctx.output.success(&format!(
                    "Added banner '{}' at {} ({})",
                    created.value.title,
                    created.value.position.as_str(),
                    created.value.id
                ));
            }
        }
        BannersCommand::Toggle { id } => {
            let Some(mut banner) = catalog.banners().get(&id) else {
                bail!("Banner '{}' not found", id);
            };
            banner.active = !banner.active;

            let updated = catalog.banners().update(banner).await?;
            ctx.output.remote_outcome(&updated.remote);
            if ctx.output.is_json() {
                ctx.output.json(&updated.value);
            } else {
                ctx.output.success(&format!(
                    "Banner '{}' is now {}",
                    updated.value.title,
                    active_badge(updated.value.active)
                ));
            }
        }
        BannersCommand::Delete { id, yes } => {
            let Some(banner) = catalog.banners().get(&id) else {
                bail!("Banner '{}' not found", id);
            };
            if !yes && !ctx.output.is_json() {
                let confirmed = Confirm::new()
                    .with_prompt(format!("Delete banner '{}'?", banner.title))
                    .default(false)
                    .interact()?;
                if !confirmed {
                    ctx.output.warn("Delete cancelled");
                    return Ok(());
                }
            }

            let deleted = catalog.banners().delete(&id).await?;
            ctx.output.remote_outcome(&deleted.remote);
            ctx.output
                .success(&format!("Deleted banner '{}'", deleted.value.title));
        }
    }
    Ok(())
}

fn list_banners(banners: &[Banner], ctx: &Context) {
    if ctx.output.is_json() {
        ctx.output.json(&banners);
        return;
    }

    ctx.output.header(&format!("Banners ({})", banners.len()));
    if banners.is_empty() {
        ctx.output.info("No banners");
        return;
    }

    let widths = [20, 30, 8, 8];
    ctx.output
        .table_row(&["ID", "TITLE", "POSITION", "STATUS"], &widths);
    for banner in banners {
        ctx.output.table_row(
            &[
                banner.id.as_str(),
                &truncate(&banner.title, widths[1]),
                banner.position.as_str(),
                &active_badge(banner.active),
            ],
            &widths,
        );
    }
}
