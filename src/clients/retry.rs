//! Bounded retry with exponential backoff.
//!
//! Both agents default to zero retries: a failed upload or settlement call
//! is logged and skipped. Operators can opt into a bounded number of
//! retries per call via `capture.upload_retries` / `settlement.finish_retries`.

use std::future::Future;
use std::time::Duration;

use crate::config::defaults::{RETRY_INITIAL_DELAY_MS, RETRY_MAX_DELAY_MS};

/// How many times, and how far apart, to retry a failed external call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Additional attempts after the first failure
    pub retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Single attempt, no retry.
    pub const fn none() -> Self {
        Self {
            retries: 0,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// `retries` extra attempts with the default backoff curve.
    pub const fn with_retries(retries: u32) -> Self {
        Self {
            retries,
            initial_delay: Duration::from_millis(RETRY_INITIAL_DELAY_MS),
            max_delay: Duration::from_millis(RETRY_MAX_DELAY_MS),
        }
    }

    /// Backoff before retry number `attempt` (1-based), without jitter.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_delay
            .saturating_mul(factor)
            .min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

fn jitter(delay: Duration) -> Duration {
    let max_ms = u64::try_from(delay.as_millis() / 4).unwrap_or(u64::MAX);
    if max_ms == 0 {
        return Duration::ZERO;
    }
    use rand::Rng;
    Duration::from_millis(rand::thread_rng().gen_range(0..=max_ms))
}

/// Run `op` until it succeeds or the policy is exhausted.
///
/// Returns the last error when every attempt fails.
pub async fn with_retry<T, E, F, Fut>(policy: RetryPolicy, what: &str, mut op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt = 0u32;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < policy.retries => {
                attempt += 1;
                let delay = policy.delay_for(attempt);
                let delay = delay + jitter(delay);
                tracing::warn!(
                    operation = what,
                    attempt,
                    max_retries = policy.retries,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = %e,
                    "External call failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}
