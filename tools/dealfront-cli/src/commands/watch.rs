//! Follow a collection live.

use anyhow::Result;
use chrono::Local;
use dealfront_catalog::{Banner, CatalogEntity, Collection, DailyDeal, Product};
use dealfront_sync::CatalogFacade;
use tokio::sync::broadcast::error::RecvError;

use super::WatchArgs;
use crate::context::Context;

/// Run the watch command.
pub async fn run(args: WatchArgs, ctx: &Context) -> Result<()> {
    let catalog = ctx.open_catalog().await?;
    ctx.output.info(&format!(
        "Watching {} (polling every {}ms). Press Ctrl-C to stop.",
        args.collection, catalog.config().poll_interval_ms
    ));

    let result = match args.collection {
        Collection::Products => follow::<Product>(&catalog, ctx).await,
        Collection::Banners => follow::<Banner>(&catalog, ctx).await,
        Collection::DailyDeal => follow::<DailyDeal>(&catalog, ctx).await,
    };
    catalog.shutdown().await;
    result
}

async fn follow<T: CatalogEntity>(catalog: &CatalogFacade, ctx: &Context) -> Result<()> {
    let view = catalog.view::<T>();
    let mut snapshots = view.watch();
    let mut notices = catalog.notices();
    print_snapshot(&view.snapshot(), ctx);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = snapshots.borrow_and_update().clone();
                print_snapshot(&snapshot, ctx);
            }
            notice = notices.recv() => match notice {
                Ok(notice) => ctx.output.notice(&notice),
                Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => break,
            },
        }
    }

    view.shutdown().await;
    Ok(())
}

fn print_snapshot<T: CatalogEntity>(entities: &[T], ctx: &Context) {
    if ctx.output.is_json() {
        ctx.output.json(&entities);
        return;
    }
    ctx.output.header(&format!(
        "{} {} ({})",
        Local::now().format("%H:%M:%S"),
        T::COLLECTION,
        entities.len()
    ));
    for entity in entities {
        ctx.output.list_item(&summary(entity));
    }
}

/// One-line description: the id plus the entity's display name.
fn summary<T: CatalogEntity>(entity: &T) -> String {
    let value = serde_json::to_value(entity).unwrap_or_default();
    let label = ["name", "title"]
        .iter()
        .find_map(|field| value.get(field).and_then(|v| v.as_str()))
        .unwrap_or("");
    format!("{}  {}", entity.id(), label)
}
