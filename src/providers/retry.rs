//! Bounded retry with jittered exponential backoff around any provider.
//!
//! Only transient failures retry (transport errors, 429, 5xx). Parse and
//! auth failures return immediately; repeating an identical bad request
//! cannot succeed. When the attempt budget runs out, the wrapper surfaces
//! [`OracleError::RetriesExhausted`] so callers can distinguish a dead
//! oracle from a single transient failure.

use std::time::Duration;

use rand::Rng;
use tracing::warn;

use super::{CompletionRequest, LlmProvider, OracleError, OracleResponse};

/// Retry policy for transient oracle failures.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first (minimum 1).
    pub max_attempts: u32,
    /// Backoff before the second attempt; doubles each retry.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// Backoff for the given zero-indexed retry, with uniform jitter in
    /// `[0.5x, 1.5x]` of the exponential delay.
    fn delay_for(&self, retry: u32) -> Duration {
        let exp = self.base_delay.saturating_mul(1u32 << retry.min(8));
        let jitter = rand::thread_rng().gen_range(0.5..1.5);
        exp.mul_f64(jitter)
    }
}

/// Provider wrapper applying a [`RetryPolicy`] to every completion call.
pub struct RetryingOracle<P> {
    inner: P,
    policy: RetryPolicy,
}

impl<P: LlmProvider> RetryingOracle<P> {
    /// Wrap a provider with the given policy.
    pub fn new(inner: P, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait::async_trait]
impl<P: LlmProvider> LlmProvider for RetryingOracle<P> {
    async fn complete(&self, request: CompletionRequest) -> Result<OracleResponse, OracleError> {
        let attempts = self.policy.max_attempts.max(1);
        let mut last_message = String::new();

        for attempt in 0..attempts {
            match self.inner.complete(request.clone()).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_transient() => {
                    last_message = e.to_string();
                    let remaining = attempts.saturating_sub(attempt).saturating_sub(1);
                    warn!(
                        attempt = attempt.saturating_add(1),
                        remaining, error = %e, "transient oracle failure"
                    );
                    if remaining > 0 {
                        tokio::time::sleep(self.policy.delay_for(attempt)).await;
                    }
                }
                Err(e) => return Err(e),
            }
        }

        Err(OracleError::RetriesExhausted {
            attempts,
            last: last_message,
        })
    }

    fn model_id(&self) -> &str {
        self.inner.model_id()
    }
}
