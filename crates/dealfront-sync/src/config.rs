//! Sync layer configuration.

use std::time::Duration;

use dealfront_remote::{BackoffStrategy, RemotePolicy, RetryPolicy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Shortest allowed polling interval.
///
/// Storefront tabs poll every 5 to 10 seconds, and the default sits at the
/// low end of that band. The accepted range is wider: a `watch` session or
/// a test may poll faster, an idle admin tool slower.
pub const MIN_POLL_INTERVAL_MS: u64 = 1_000;
/// Longest allowed polling interval.
pub const MAX_POLL_INTERVAL_MS: u64 = 60_000;

/// A configuration value outside its allowed range.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{field}: {reason}")]
pub struct ConfigError {
    pub field: &'static str,
    pub reason: String,
}

/// Tuning knobs for the catalog facade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// How often subscribed views re-read the local mirror.
    pub poll_interval_ms: u64,

    /// Limit for one remote call attempt.
    pub remote_timeout_ms: u64,

    /// Extra attempts after a transient remote failure.
    pub remote_retries: u32,

    /// Initial delay between remote attempts (doubles per retry).
    pub retry_backoff_ms: u64,

    /// Namespace for local mirror keys (`prefix:products`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_prefix: Option<String>,

    /// Seed the bundled dataset when both sources are empty.
    pub seed_defaults: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 5_000,
            remote_timeout_ms: 3_000,
            remote_retries: 1,
            retry_backoff_ms: 100,
            key_prefix: None,
            seed_defaults: true,
        }
    }
}

impl SyncConfig {
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = interval.as_millis() as u64;
        self
    }

    pub fn with_remote_timeout(mut self, timeout: Duration) -> Self {
        self.remote_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_remote_retries(mut self, retries: u32) -> Self {
        self.remote_retries = retries;
        self
    }

    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff_ms = backoff.as_millis() as u64;
        self
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    pub fn with_seed_defaults(mut self, seed: bool) -> Self {
        self.seed_defaults = seed;
        self
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn remote_timeout(&self) -> Duration {
        Duration::from_millis(self.remote_timeout_ms)
    }

    /// The timeout and retry policy wrapped around every remote call.
    pub fn remote_policy(&self) -> RemotePolicy {
        let base = Duration::from_millis(self.retry_backoff_ms);
        let backoff = if base.is_zero() {
            BackoffStrategy::None
        } else {
            BackoffStrategy::Exponential {
                base,
                max: base * 8,
            }
        };
        RemotePolicy::new(
            self.remote_timeout(),
            RetryPolicy::new(self.remote_retries).with_backoff(backoff),
        )
    }

    /// Check every value is within its allowed range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_POLL_INTERVAL_MS..=MAX_POLL_INTERVAL_MS).contains(&self.poll_interval_ms) {
            return Err(ConfigError {
                field: "poll_interval_ms",
                reason: format!(
                    "{} is outside {}..={}",
                    self.poll_interval_ms, MIN_POLL_INTERVAL_MS, MAX_POLL_INTERVAL_MS
                ),
            });
        }
        if self.remote_timeout_ms == 0 {
            return Err(ConfigError {
                field: "remote_timeout_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        if let Some(prefix) = &self.key_prefix {
            let valid = !prefix.is_empty()
                && prefix
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
            if !valid {
                return Err(ConfigError {
                    field: "key_prefix",
                    reason: format!("'{}' may only contain letters, digits, '-' and '_'", prefix),
                });
            }
        }
        Ok(())
    }
}
