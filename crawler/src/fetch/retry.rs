use super::{FetchError, Fetcher};
use async_trait::async_trait;
use std::time::Duration;
use tokio::time::sleep;
use url::Url;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3, base_delay: Duration::from_secs(1), max_delay: Duration::from_secs(30) }
    }
}

impl RetryPolicy {
    /// Pause before retry number `attempt` (1-based): base * 2^(attempt-1), capped.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Retries transient failures of the inner fetcher with exponential backoff.
pub struct RetryingFetcher<F> {
    inner: F,
    policy: RetryPolicy,
}

impl<F: Fetcher> RetryingFetcher<F> {
    pub fn new(inner: F, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn into_inner(self) -> F { self.inner }
}

#[async_trait]
impl<F: Fetcher> Fetcher for RetryingFetcher<F> {
    async fn fetch(&self, url: &Url) -> Result<String, FetchError> {
        let max = self.policy.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.inner.fetch(url).await {
                Ok(body) => return Ok(body),
                Err(e) if !e.is_transient() => return Err(e),
                Err(e) if attempt >= max => {
                    return Err(FetchError::RetriesExhausted { url: url.to_string(), attempts: attempt, last: Box::new(e) })
                }
                Err(e) => {
                    let pause = self.policy.backoff(attempt);
                    tracing::warn!(%url, attempt, ?pause, error = %e, "fetch failed, retrying");
                    sleep(pause).await;
                    attempt += 1;
                }
            }
        }
    }
}
