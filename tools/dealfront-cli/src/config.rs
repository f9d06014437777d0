//! CLI configuration.

use anyhow::{Context, Result};
use dealfront_sync::SyncConfig;
use serde::{Deserialize, Serialize};

/// File names searched for, in order, from the working directory upwards.
pub const CONFIG_NAMES: [&str; 3] = ["dealfront.toml", ".dealfront.toml", "dealfront.json"];

/// CLI configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliConfig {
    /// Local mirror location.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Shared remote store.
    #[serde(default)]
    pub remote: RemoteConfig,

    /// Sync tuning, passed to the catalog facade as is.
    #[serde(default)]
    pub sync: SyncConfig,
}

impl CliConfig {
    /// Load config from a file.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;

        if path.ends_with(".json") {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON config: {}", path))
        } else {
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse TOML config: {}", path))
        }
    }
}

/// Where this machine keeps its local mirror.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding one JSON file per mirror key.
    #[serde(default = "default_storage_dir")]
    pub dir: String,
}

fn default_storage_dir() -> String {
    ".dealfront/mirror".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: default_storage_dir(),
        }
    }
}

/// Which remote store backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemoteKind {
    /// Work against the local mirror only.
    None,
    /// A directory of collection files shared by every client.
    #[default]
    File,
}

/// Remote store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    #[serde(default)]
    pub kind: RemoteKind,

    /// Directory of the file remote.
    #[serde(default = "default_remote_dir")]
    pub dir: String,
}

fn default_remote_dir() -> String {
    ".dealfront/remote".to_string()
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            kind: RemoteKind::default(),
            dir: default_remote_dir(),
        }
    }
}

/// Generate a default dealfront.toml config file.
pub fn generate_default_config() -> String {
    r#"# Dealfront catalog configuration

[storage]
# Local mirror, one JSON file per collection
dir = ".dealfront/mirror"

[remote]
# "file" shares a directory between clients, "none" works offline only
kind = "file"
dir = ".dealfront/remote"

[sync]
poll_interval_ms = 5000
remote_timeout_ms = 3000
remote_retries = 1
retry_backoff_ms = 100
seed_defaults = true
# key_prefix = "shop"
"#
    .to_string()
}
