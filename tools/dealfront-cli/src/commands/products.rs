//! Product management.

use anyhow::{bail, Result};
use dealfront_catalog::{NewProduct, Product};
use dealfront_sync::CatalogFacade;
use dialoguer::Confirm;

use super::{ProductsArgs, ProductsCommand};
use crate::context::Context;
use crate::output::{format_discount, format_price};

/// Run the products command.
pub async fn run(args: ProductsArgs, ctx: &Context) -> Result<()> {
    let catalog = ctx.open_catalog().await?;
    let result = execute(args.command, &catalog, ctx).await;
    catalog.shutdown().await;
    result
}

async fn execute(command: ProductsCommand, catalog: &CatalogFacade, ctx: &Context) -> Result<()> {
    match command {
        ProductsCommand::List { category } => {
            list_products(&catalog.products().list(), category.as_deref(), ctx);
            Ok(())
        }
        ProductsCommand::Add {
            name,
            original,
            discount,
            image,
            category,
            link,
            description,
        } => {
            let mut draft = NewProduct::new(name, original, discount);
            if let Some(image) = image {
                draft = draft.with_image(image);
            }
            if let Some(category) = category {
                draft = draft.with_category(category);
            }
            if let Some(link) = link {
                draft = draft.with_affiliate_link(link);
            }
            if let Some(description) = description {
                draft = draft.with_description(description);
            }

            let created = catalog.products().create(draft).await?;
            if created.value.has_price_anomaly() {
                ctx.output
                    .warn("Selling price is above the list price; the badge will show a markup");
            }
            ctx.output.remote_outcome(&created.remote);
            if ctx.output.is_json() {
                ctx.output.json(&created.value);
            } else {
                ctx.output
                    .success(&format!("Added {} ({})", created.value.name, created.value.id));
            }
            Ok(())
        }
        ProductsCommand::Update {
            id,
            name,
            original,
            discount,
            image,
            category,
            link,
            description,
        } => {
            let Some(mut product) = catalog.products().get(&id) else {
                bail!("Product '{}' not found", id);
            };
            if let Some(name) = name {
                product.name = name;
            }
            if let Some(original) = original {
                product.original_price = original;
            }
            if let Some(discount) = discount {
                product.discount_price = discount;
            }
            if let Some(image) = image {
                product.image = image;
            }
            if category.is_some() {
                product.category = category;
            }
            if let Some(link) = link {
                product.affiliate_link = link;
            }
            if let Some(description) = description {
                product.description = description;
            }

            let updated = catalog.products().update(product).await?;
            ctx.output.remote_outcome(&updated.remote);
            if ctx.output.is_json() {
                ctx.output.json(&updated.value);
            } else {
                ctx.output.success(&format!("Updated {}", updated.value.id));
            }
            Ok(())
        }
        ProductsCommand::Delete { id, yes } => {
            let Some(product) = catalog.products().get(&id) else {
                bail!("Product '{}' not found", id);
            };
            if !yes && !ctx.output.is_json() {
                let confirmed = Confirm::new()
                    .with_prompt(format!("Delete '{}'?", product.name))
                    .default(false)
                    .interact()?;
                if !confirmed {
                    ctx.output.warn("Delete cancelled");
                    return Ok(());
                }
            }

            let deleted = catalog.products().delete(&id).await?;
            ctx.output.remote_outcome(&deleted.remote);
            ctx.output.success(&format!("Deleted {}", deleted.value.name));
            Ok(())
        }
    }
}

fn list_products(products: &[Product], category: Option<&str>, ctx: &Context) {
    let products: Vec<&Product> = products
        .iter()
        .filter(|p| category.map_or(true, |c| p.in_category(c)))
        .collect();

    if ctx.output.is_json() {
        ctx.output.json(&products);
        return;
    }

    ctx.output.header(&format!("Products ({})", products.len()));
    if products.is_empty() {
        ctx.output.info("No products");
        return;
    }

    let widths = [16, 28, 10, 10, 6];
    ctx.output
        .table_row(&["ID", "NAME", "ORIGINAL", "PRICE", "OFF"], &widths);
    for product in products {
        ctx.output.table_row(
            &[
                product.id.as_str(),
                &truncate(&product.name, widths[1]),
                &format_price(product.original_price),
                &format_price(product.discount_price),
                &format_discount(product.discount_percent()),
            ],
            &widths,
        );
    }
}

/// Shorten text to fit a table column.
pub(crate) fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let kept: String = text.chars().take(width.saturating_sub(1)).collect();
    format!("{}…", kept)
}
