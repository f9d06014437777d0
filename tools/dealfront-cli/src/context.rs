//! CLI execution context.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context as _, Result};
use dealfront_mirror::{FileStorage, LocalMirror, StorageBus};
use dealfront_remote::FileRemoteStore;
use dealfront_sync::{CatalogFacade, LoadSource};

use crate::config::{CliConfig, RemoteKind, CONFIG_NAMES};
use crate::output::Output;

/// Execution context for CLI commands.
pub struct Context {
    /// CLI configuration.
    pub config: CliConfig,
    /// Where the configuration was read from, if anywhere.
    pub config_path: Option<PathBuf>,
    /// Output handler.
    pub output: Output,
    /// Working directory.
    pub cwd: PathBuf,
}

impl Context {
    /// Load context from config file.
    pub fn load(config_path: Option<&str>, output: Output) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current directory")?;

        let (config, config_path) = if let Some(path) = config_path {
            (CliConfig::load(path)?, Some(PathBuf::from(path)))
        } else {
            // Try to find config in current directory or parent directories
            match Self::find_config(&cwd) {
                Some((config, path)) => (config, Some(path)),
                None => (CliConfig::default(), None),
            }
        };

        Ok(Self {
            config,
            config_path,
            output,
            cwd,
        })
    }

    /// Find config file in directory tree.
    fn find_config(start: &Path) -> Option<(CliConfig, PathBuf)> {
        let mut current = start.to_path_buf();
        loop {
            for name in &CONFIG_NAMES {
                let config_path = current.join(name);
                if config_path.exists() {
                    if let Ok(config) = CliConfig::load(config_path.to_str()?) {
                        return Some((config, config_path));
                    }
                }
            }

            if !current.pop() {
                break;
            }
        }

        None
    }

    /// Directory relative paths in the config are resolved against: the
    /// config file's directory, or the working directory without one.
    fn base_dir(&self) -> PathBuf {
        self.config_path
            .as_deref()
            .and_then(Path::parent)
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.cwd.clone())
    }

    /// Resolve a configured path.
    pub fn resolve_path(&self, path: &str) -> PathBuf {
        if PathBuf::from(path).is_absolute() {
            PathBuf::from(path)
        } else {
            self.base_dir().join(path)
        }
    }

    /// Build and start the catalog facade this CLI invocation works on.
    pub async fn open_catalog(&self) -> Result<CatalogFacade> {
        let storage_dir = self.resolve_path(&self.config.storage.dir);
        let storage = FileStorage::open(&storage_dir)
            .with_context(|| format!("Failed to open local mirror at {}", storage_dir.display()))?;
        self.output
            .debug(&format!("Local mirror: {}", storage_dir.display()));

        let mut builder = CatalogFacade::builder()
            .mirror(LocalMirror::new(Arc::new(storage), StorageBus::new()))
            .config(self.config.sync.clone());

        if self.config.remote.kind == RemoteKind::File {
            let remote_dir = self.resolve_path(&self.config.remote.dir);
            let remote = FileRemoteStore::open(&remote_dir).with_context(|| {
                format!("Failed to open remote store at {}", remote_dir.display())
            })?;
            self.output
                .debug(&format!("Remote store: {}", remote_dir.display()));
            builder = builder.remote(Arc::new(remote));
        }

        let catalog = builder.build().context("Invalid [sync] configuration")?;
        let report = catalog.start().await;

        for load in &report.collections {
            self.output.debug(&format!(
                "{}: {} entries from {:?}",
                load.collection, load.count, load.source
            ));
            if load.rejected > 0 {
                self.output.warn(&format!(
                    "{}: skipped {} invalid remote record(s)",
                    load.collection, load.rejected
                ));
            }
            if let Some(e) = &load.remote_error {
                self.output
                    .warn(&format!("{}: remote unavailable ({}), using local data", load.collection, e));
            }
            if let Some(e) = &load.storage_error {
                self.output
                    .warn(&format!("{}: local mirror unusable ({})", load.collection, e));
            }
            if load.source == LoadSource::Defaults {
                self.output
                    .info(&format!("{}: seeded with the bundled catalog", load.collection));
            }
        }

        Ok(catalog)
    }
}
