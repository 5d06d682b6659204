//! Bounded retry with exponential backoff for rate-limited providers.

use std::time::Duration;

use async_trait::async_trait;

use super::{GenerationLimits, GenerationProvider, ProviderError, ProviderInfo};

/// Retry bounds for one generation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt. Only rate-limit errors are retried.
    pub max_retries: u32,
    /// Delay before the first retry; doubles on each further retry.
    pub initial_backoff: Duration,
    /// Bound on the whole call, backoff sleeps included.
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_retries: 2,
            initial_backoff: Duration::from_secs(20),
            timeout: Duration::from_secs(300),
        }
    }
}

/// Delay before retry number `retry` (0-based): `initial * 2^retry`.
pub fn backoff_delay(initial: Duration, retry: u32) -> Duration {
    initial.saturating_mul(2u32.saturating_pow(retry))
}

/// Wraps a provider with [`RetryPolicy`].
pub struct RetryingProvider<P> {
    inner: P,
    policy: RetryPolicy,
}

impl<P: GenerationProvider> RetryingProvider<P> {
    pub fn new(inner: P, policy: RetryPolicy) -> Self {
        RetryingProvider { inner, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    async fn attempts(
        &self,
        prompt: &str,
        limits: &GenerationLimits,
    ) -> Result<String, ProviderError> {
        let mut retry = 0;
        loop {
            match self.inner.generate(prompt, limits).await {
                Ok(text) => return Ok(text),
                Err(err) if err.is_retryable() && retry < self.policy.max_retries => {
                    let delay = backoff_delay(self.policy.initial_backoff, retry);
                    tracing::warn!(
                        provider = %self.inner.describe().provider,
                        attempt = retry + 1,
                        delay_ms = delay.as_millis() as u64,
                        "rate limited, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    retry += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[async_trait]
impl<P: GenerationProvider> GenerationProvider for RetryingProvider<P> {
    async fn generate(
        &self,
        prompt: &str,
        limits: &GenerationLimits,
    ) -> Result<String, ProviderError> {
        match tokio::time::timeout(self.policy.timeout, self.attempts(prompt, limits)).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout(self.policy.timeout)),
        }
    }

    async fn check_health(&self) -> bool {
        self.inner.check_health().await
    }

    fn describe(&self) -> ProviderInfo {
        self.inner.describe()
    }
}
