//! Retry policy: bounded attempts with exponential backoff.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::PublishError;

/// Default ceiling on attempts for a single remote call.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// Retry policy applied below every stage.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Never below 1.
    pub max_attempts: u32,

    /// Delay before the first retry.
    pub base_delay: Duration,

    /// Backoff multiplier for exponential backoff.
    pub multiplier: f64,

    /// Upper bound for any single delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: Duration::from_millis(100),
            multiplier: 2.0,
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Delay to wait after `attempts` failed attempts (1-indexed).
    ///
    /// delay = base_delay * multiplier^(attempts - 1), capped at `max_delay`.
    pub fn next_delay(&self, attempts: u32) -> Duration {
        let exponent = attempts.saturating_sub(1).min(i32::MAX as u32) as i32;
        let secs = self.base_delay.as_secs_f64() * self.multiplier.powi(exponent);
        if !secs.is_finite() || secs >= self.max_delay.as_secs_f64() {
            return self.max_delay;
        }
        Duration::from_secs_f64(secs)
    }

    /// Drives `attempt` until it succeeds, fails with a non-transient error, or the
    /// ceiling is reached. The closure receives the 1-indexed attempt number.
    ///
    /// `idempotent` decides whether server-side statuses are worth replaying; see
    /// [`PublishError::is_transient`].
    pub async fn run<T, F, Fut>(
        &self,
        operation: &str,
        idempotent: bool,
        mut attempt: F,
    ) -> Result<T, PublishError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, PublishError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut n = 1;
        loop {
            match attempt(n).await {
                Ok(value) => return Ok(value),
                Err(e) if n < max_attempts && e.is_transient(idempotent) => {
                    let delay = self.next_delay(n);
                    warn!(
                        operation,
                        attempt = n,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Transient failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    n += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
