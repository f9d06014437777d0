//! Timeout and retry policy for remote calls.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::{FieldMap, RemoteCatalogStore, RemoteError, RemoteRecord, RemoteSubscription};

/// Backoff strategy between retry attempts.
#[derive(Debug, Clone, PartialEq)]
pub enum BackoffStrategy {
    /// No delay between retries.
    None,
    /// Fixed delay between retries.
    Fixed(Duration),
    /// Exponential backoff with base and max.
    Exponential {
        /// Initial delay.
        base: Duration,
        /// Maximum delay.
        max: Duration,
    },
}

impl BackoffStrategy {
    /// Calculate delay for a given attempt number (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        match self {
            Self::None => Duration::ZERO,
            Self::Fixed(d) => *d,
            Self::Exponential { base, max } => {
                let multiplier = 2u64.saturating_pow(attempt);
                let delay =
                    Duration::from_millis((base.as_millis() as u64).saturating_mul(multiplier));
                std::cmp::min(delay, *max)
            }
        }
    }
}

impl Default for BackoffStrategy {
    fn default() -> Self {
        Self::Exponential {
            base: Duration::from_millis(100),
            max: Duration::from_millis(1_000),
        }
    }
}

/// Conditions that trigger a retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryCondition {
    /// Retry when the store is unreachable.
    Unavailable,
    /// Retry when an attempt times out.
    Timeout,
}

impl RetryCondition {
    /// Check if an error matches this condition.
    pub fn matches(&self, error: &RemoteError) -> bool {
        matches!(
            (self, error),
            (Self::Unavailable, RemoteError::Unavailable(_)) | (Self::Timeout, RemoteError::Timeout(_))
        )
    }
}

/// Retry policy configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts after the first call.
    pub max_attempts: u32,
    /// Backoff strategy.
    pub backoff: BackoffStrategy,
    /// Conditions that trigger retry.
    pub retry_on: Vec<RetryCondition>,
}

impl RetryPolicy {
    /// Create a new retry policy.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            backoff: BackoffStrategy::default(),
            retry_on: vec![RetryCondition::Unavailable, RetryCondition::Timeout],
        }
    }

    /// Create a policy with no retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 0,
            backoff: BackoffStrategy::None,
            retry_on: Vec::new(),
        }
    }

    /// Set backoff strategy.
    pub fn with_backoff(mut self, strategy: BackoffStrategy) -> Self {
        self.backoff = strategy;
        self
    }

    /// Set retry conditions.
    pub fn with_conditions(mut self, conditions: Vec<RetryCondition>) -> Self {
        self.retry_on = conditions;
        self
    }

    /// Check if a failed attempt should be retried.
    pub fn should_retry(&self, error: &RemoteError, attempt: u32) -> bool {
        if attempt >= self.max_attempts {
            return false;
        }
        self.retry_on.iter().any(|c| c.matches(error))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(1)
    }
}

/// Timeout and retry configuration applied to every remote call.
#[derive(Debug, Clone, PartialEq)]
pub struct RemotePolicy {
    /// Limit for a single attempt.
    pub timeout: Duration,
    /// What to do when an attempt fails.
    pub retry: RetryPolicy,
}

impl RemotePolicy {
    pub fn new(timeout: Duration, retry: RetryPolicy) -> Self {
        Self { timeout, retry }
    }

    /// Run `call`, bounding each attempt by the timeout and retrying
    /// retryable failures.
    pub async fn run<T, F, Fut>(&self, op: &'static str, mut call: F) -> Result<T, RemoteError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, RemoteError>>,
    {
        let mut attempt = 0;
        loop {
            let result = match tokio::time::timeout(self.timeout, call()).await {
                Ok(result) => result,
                Err(_) => Err(RemoteError::Timeout(self.timeout)),
            };

            match result {
                Ok(value) => return Ok(value),
                Err(e) if self.retry.should_retry(&e, attempt) => {
                    let delay = self.retry.backoff.delay_for_attempt(attempt);
                    tracing::debug!(op, attempt, error = %e, ?delay, "retrying remote call");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl RemotePolicy {
    /// The same timeout without retries, for calls that are not idempotent.
    pub fn single_attempt(&self) -> Self {
        Self {
            timeout: self.timeout,
            retry: RetryPolicy::none(),
        }
    }
}

impl Default for RemotePolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(3_000),
            retry: RetryPolicy::default(),
        }
    }
}

/// A remote store whose every call goes through a [`RemotePolicy`].
#[derive(Clone)]
pub struct GuardedRemote {
    inner: Arc<dyn RemoteCatalogStore>,
    policy: RemotePolicy,
}

impl GuardedRemote {
    pub fn new(inner: Arc<dyn RemoteCatalogStore>, policy: RemotePolicy) -> Self {
        Self { inner, policy }
    }

    pub fn policy(&self) -> &RemotePolicy {
        &self.policy
    }
}

impl std::fmt::Debug for GuardedRemote {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuardedRemote")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl RemoteCatalogStore for GuardedRemote {
    /// Never retried: an attempt that timed out may still have created a
    /// record, and the store assigns a fresh id on every call.
    async fn create(&self, collection: &str, fields: FieldMap) -> Result<RemoteRecord, RemoteError> {
        self.policy
            .single_attempt()
            .run("create", || self.inner.create(collection, fields.clone()))
            .await
    }

    async fn put(&self, collection: &str, record: RemoteRecord) -> Result<(), RemoteError> {
        self.policy
            .run("put", || self.inner.put(collection, record.clone()))
            .await
    }

    async fn update(&self, collection: &str, record: RemoteRecord) -> Result<(), RemoteError> {
        self.policy
            .run("update", || self.inner.update(collection, record.clone()))
            .await
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), RemoteError> {
        self.policy
            .run("delete", || self.inner.delete(collection, id))
            .await
    }

    async fn list(&self, collection: &str) -> Result<Vec<RemoteRecord>, RemoteError> {
        self.policy.run("list", || self.inner.list(collection)).await
    }

    async fn subscribe(&self, collection: &str) -> Result<RemoteSubscription, RemoteError> {
        self.policy
            .run("subscribe", || self.inner.subscribe(collection))
            .await
    }
}
