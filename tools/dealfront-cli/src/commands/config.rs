//! Configuration management commands.

use anyhow::{bail, Result};

use super::{ConfigArgs, ConfigCommand};
use crate::config::{generate_default_config, RemoteKind, CONFIG_NAMES};
use crate::context::Context;

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show => show_config(ctx),
        ConfigCommand::Init { force } => init_config(force, ctx),
    }
}

fn show_config(ctx: &Context) -> Result<()> {
    if ctx.output.is_json() {
        ctx.output.json(&ctx.config);
        return Ok(());
    }

    ctx.output.header("Current Configuration");
    match &ctx.config_path {
        Some(path) => ctx.output.kv("file", &path.display().to_string()),
        None => ctx.output.kv("file", "(none, using defaults)"),
    }

    ctx.output.info("[storage]");
    ctx.output.kv(
        "dir",
        &ctx.resolve_path(&ctx.config.storage.dir).display().to_string(),
    );

    ctx.output.info("[remote]");
    match ctx.config.remote.kind {
        RemoteKind::None => ctx.output.kv("kind", "none"),
        RemoteKind::File => {
            ctx.output.kv("kind", "file");
            ctx.output.kv(
                "dir",
                &ctx.resolve_path(&ctx.config.remote.dir).display().to_string(),
            );
        }
    }

    let sync = &ctx.config.sync;
    ctx.output.info("[sync]");
    ctx.output.kv("poll_interval_ms", &sync.poll_interval_ms.to_string());
    ctx.output.kv("remote_timeout_ms", &sync.remote_timeout_ms.to_string());
    ctx.output.kv("remote_retries", &sync.remote_retries.to_string());
    ctx.output.kv("retry_backoff_ms", &sync.retry_backoff_ms.to_string());
    ctx.output.kv("seed_defaults", &sync.seed_defaults.to_string());
    if let Some(prefix) = &sync.key_prefix {
        ctx.output.kv("key_prefix", prefix);
    }

    if let Err(e) = sync.validate() {
        ctx.output.warn(&format!("Invalid [sync] value: {}", e));
    }
    Ok(())
}

fn init_config(force: bool, ctx: &Context) -> Result<()> {
    let config_path = ctx.cwd.join(CONFIG_NAMES[0]);

    if config_path.exists() && !force {
        bail!(
            "Config file already exists: {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    std::fs::write(&config_path, generate_default_config())?;
    ctx.output
        .success(&format!("Created: {}", config_path.display()));

    Ok(())
}
