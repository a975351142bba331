use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::InferenceError;

/// Bounded retry with exponential backoff around the inference call.
///
/// The default makes a single attempt: a failed classification is
/// terminal and the user resubmits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Delay before retrying after failed attempt number `attempt` (1-based).
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.initial_backoff
            .saturating_mul(1u32 << exponent)
            .min(self.max_backoff)
    }

    /// Run `op` until it succeeds, fails permanently, or attempts run out.
    /// Only transient failures are retried.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T, InferenceError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, InferenceError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt < max_attempts => {
                    let backoff = self.backoff_for(attempt);
                    warn!(
                        attempt,
                        max_attempts,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %err,
                        "inference attempt failed, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
