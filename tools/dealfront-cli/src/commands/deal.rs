//! Deal of the day.

use anyhow::{bail, Result};
use chrono::{Duration, Utc};
use dealfront_catalog::{DailyDeal, NewDailyDeal};
use dealfront_sync::CatalogFacade;
use dialoguer::Confirm;

use super::{DealArgs, DealCommand};
use crate::context::Context;
use crate::output::{active_badge, format_price};

/// Run the deal command.
pub async fn run(args: DealArgs, ctx: &Context) -> Result<()> {
    let catalog = ctx.open_catalog().await?;
    let result = execute(args.command, &catalog, ctx).await;
    catalog.shutdown().await;
    result
}

async fn execute(command: DealCommand, catalog: &CatalogFacade, ctx: &Context) -> Result<()> {
    match command {
        DealCommand::Show => match catalog.current_deal() {
            Some(deal) => show_deal(&deal, ctx),
            None if ctx.output.is_json() => ctx.output.json(&serde_json::Value::Null),
            None => ctx.output.info("No deal of the day"),
        },
        DealCommand::Set {
            product,
            discount,
            hours,
        } => {
            let Some(product) = catalog.products().get(&product) else {
                bail!("Product '{}' not found", product);
            };
            let mut draft = NewDailyDeal::from_product(&product);
            if let Some(discount) = discount {
                draft.discount = discount;
            }
            if let Some(hours) = hours {
                if hours <= 0 {
                    bail!("--hours must be positive");
                }
                draft = draft.expires_at(Utc::now() + Duration::hours(hours));
            }

            let created = catalog.daily_deal().create(draft).await?;
            ctx.output.remote_outcome(&created.remote);
            if ctx.output.is_json() {
                ctx.output.json(&created.value);
            } else {
                ctx.output
                    .success(&format!("'{}' is now the deal of the day", created.value.item.name));
            }
        }
        DealCommand::Clear { yes } => {
            let Some(deal) = catalog.current_deal() else {
                ctx.output.info("No deal of the day");
                return Ok(());
            };
            if !yes && !ctx.output.is_json() {
                let confirmed = Confirm::new()
                    .with_prompt(format!("Remove '{}' as the deal of the day?", deal.item.name))
                    .default(false)
                    .interact()?;
                if !confirmed {
                    ctx.output.warn("Clear cancelled");
                    return Ok(());
                }
            }

            if let Some(cleared) = catalog.clear_deal().await? {
                ctx.output.remote_outcome(&cleared.remote);
                ctx.output.success("Deal of the day removed");
            }
        }
    }
    Ok(())
}

fn show_deal(deal: &DailyDeal, ctx: &Context) {
    if ctx.output.is_json() {
        ctx.output.json(deal);
        return;
    }

    let now = Utc::now();
    ctx.output.header(&format!("Deal of the day: {}", deal.item.name));
    ctx.output.kv("id", deal.id.as_str());
    ctx.output.kv("price", &format!(
        "{} (was {})",
        format_price(deal.item.discount_price),
        format_price(deal.item.original_price)
    ));
    ctx.output.kv("discount", &format!("{}%", deal.discount));
    ctx.output.kv("status", &active_badge(deal.is_live(now)));
    match deal.time_remaining(now) {
        Some(left) => ctx.output.kv(
            "ends in",
            &format!("{}h {}m", left.num_hours(), left.num_minutes() % 60),
        ),
        None if deal.expires_at.is_some() => ctx.output.kv("ends in", "expired"),
        None => ctx.output.kv("ends in", "no expiry"),
    }
    if !deal.item.affiliate_link.is_empty() {
        ctx.output.kv("link", &deal.item.affiliate_link);
    }
}
