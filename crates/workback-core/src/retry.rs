//! Bounded retry with exponential backoff around any [`TrackerGateway`].
//!
//! Only errors whose [`RetryPolicy`] is retryable are retried. The last error
//! is returned unchanged once attempts run out, so stage failure semantics
//! are the same with or without the decorator.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use crate::error::{RetryPolicy, TrackerError, TrackerResult};
use crate::tracker::{CreatedItem, TrackerGateway, TrackerItem, TrackerProject};

/// Retry schedule for tracker calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Total attempts including the first. `1` disables retries.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
        }
    }
}

impl RetryConfig {
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Delay before retry number `retry` (1-based), honouring a server hint.
    pub fn delay_for(&self, retry: u32, hint: Option<Duration>) -> Duration {
        let backoff = self
            .base_delay
            .saturating_mul(2u32.saturating_pow(retry.saturating_sub(1)));
        hint.unwrap_or(backoff).min(self.max_delay)
    }
}

/// Decorates a gateway with [`RetryConfig`]-driven retries.
pub struct RetryingGateway<G> {
    inner: G,
    config: RetryConfig,
}

impl<G: TrackerGateway> RetryingGateway<G> {
    pub fn new(inner: G, config: RetryConfig) -> Self {
        Self { inner, config }
    }

    pub fn inner(&self) -> &G {
        &self.inner
    }

    /// Run `call` until it succeeds, fails non-retryably or runs out of
    /// attempts. A non-idempotent call is not repeated after a transport
    /// error, since the request may already have been applied.
    async fn with_retry<T, F, Fut>(
        &self,
        op: &'static str,
        idempotent: bool,
        mut call: F,
    ) -> TrackerResult<T>
    where
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = TrackerResult<T>> + Send,
        T: Send,
    {
        let mut attempt = 1;
        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    let replayable = idempotent || !matches!(e, TrackerError::Transport(_));
                    let hint = match e.retry_policy() {
                        RetryPolicy::Retryable { after }
                            if replayable && attempt < self.config.max_attempts =>
                        {
                            after
                        }
                        _ => return Err(e),
                    };
                    let delay = self.config.delay_for(attempt, hint);
                    warn!(
                        op = op,
                        attempt = attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Retrying tracker call"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[async_trait]
impl<G: TrackerGateway> TrackerGateway for RetryingGateway<G> {
    async fn resolve_project(
        &self,
        owner: &str,
        number: u64,
    ) -> TrackerResult<Option<TrackerProject>> {
        self.with_retry("resolve_project", true, || self.inner.resolve_project(owner, number))
            .await
    }

    async fn create_item(&self, item: &TrackerItem) -> TrackerResult<CreatedItem> {
        self.with_retry("create_item", false, || self.inner.create_item(item))
            .await
    }

    async fn resolve_node_identifier(&self, issue_number: u64) -> TrackerResult<Option<String>> {
        self.with_retry("resolve_node_identifier", true, || {
            self.inner.resolve_node_identifier(issue_number)
        })
        .await
    }

    async fn add_to_project(
        &self,
        project_id: &str,
        content_id: &str,
    ) -> TrackerResult<Option<String>> {
        self.with_retry("add_to_project", true, || {
            self.inner.add_to_project(project_id, content_id)
        })
        .await
    }

    async fn set_single_select_field(
        &self,
        project_id: &str,
        item_id: &str,
        field_id: &str,
        option_id: &str,
    ) -> TrackerResult<()> {
        self.with_retry("set_single_select_field", true, || {
            self.inner
                .set_single_select_field(project_id, item_id, field_id, option_id)
        })
        .await
    }

    async fn find_item_by_fingerprint(&self, fingerprint: &str) -> TrackerResult<Option<u64>> {
        self.with_retry("find_item_by_fingerprint", true, || {
            self.inner.find_item_by_fingerprint(fingerprint)
        })
        .await
    }
}
