//! Push the local mirror to the remote store.

use anyhow::{bail, Result};

use super::SyncArgs;
use crate::config::RemoteKind;
use crate::context::Context;

/// Run the sync command.
pub async fn run(args: SyncArgs, ctx: &Context) -> Result<()> {
    if ctx.config.remote.kind == RemoteKind::None {
        bail!("No remote store configured. Set [remote] kind = \"file\" in dealfront.toml.");
    }

    let catalog = ctx.open_catalog().await?;
    let spinner = ctx.output.spinner("Pushing catalog to the remote store...");
    let result = catalog.sync_all().await;
    spinner.finish_and_clear();
    catalog.shutdown().await;
    let report = result?;

    if ctx.output.is_json() {
        let failures: Vec<_> = report
            .failures
            .iter()
            .map(|f| {
                serde_json::json!({
                    "collection": f.collection,
                    "id": f.id,
                    "error": f.error.to_string(),
                })
            })
            .collect();
        ctx.output.json(&serde_json::json!({
            "pushed": report.pushed,
            "failures": failures,
        }));
        return Ok(());
    }

    if report.is_complete() {
        ctx.output
            .success(&format!("Synced {} entries", report.pushed));
        return Ok(());
    }

    ctx.output.warn(&format!(
        "Synced {} entries, {} failed",
        report.pushed,
        report.failures.len()
    ));
    if args.details {
        for failure in &report.failures {
            ctx.output.list_item(&format!(
                "{}/{}: {}",
                failure.collection, failure.id, failure.error
            ));
        }
    } else {
        ctx.output.info("Run with --details to list them; local data is unchanged");
    }
    bail!("{} entries could not be pushed", report.failures.len())
}
