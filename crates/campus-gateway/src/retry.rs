//! Caller-side retry policy.
//!
//! The gateway never retries on its own. Data-fetching code that wants
//! retries wraps its calls in [`RetryPolicy::run`], which applies the
//! house rule: client errors (4xx) and local encode/decode failures are
//! final, everything else gets up to `max_attempts` tries with exponential
//! backoff.

use std::future::Future;
use std::time::Duration;

use crate::ApiError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubled for each later one.
    pub base_delay: Duration,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Whether a failure on `attempt` (1-based) should be retried.
    pub fn should_retry(&self, attempt: u32, error: &ApiError) -> bool {
        error.is_retryable() && attempt < self.max_attempts
    }

    /// Delay to wait after the given failed attempt (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay
            .saturating_mul(factor)
            .min(self.max_delay)
    }

    /// Runs `op` until it succeeds, fails with a client error, or the
    /// attempts are exhausted. Returns the last error.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T, ApiError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if self.should_retry(attempt, &err) => {
                    let delay = self.delay_after(attempt);
                    tracing::debug!(
                        attempt,
                        status = err.status,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
