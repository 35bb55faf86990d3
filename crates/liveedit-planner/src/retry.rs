//! Reusable exponential-backoff retry policy.
//!
//! Wraps any outbound call to the external AI service. Errors are
//! classified through [`RetryClass`]: transient failures sleep and
//! retry with exponential backoff, fatal failures return immediately,
//! and exhausting the attempt budget surfaces the last observed error
//! marked as exhausted so the caller can tag it.

use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Transient-versus-fatal classification for a failed call.
pub trait RetryClass {
    /// True when a delayed retry could plausibly succeed
    /// (capacity-exceeded, rate-limited, request-timeout).
    fn is_retryable(&self) -> bool;
}

/// Exponential-backoff configuration.
///
/// With the defaults (3 attempts, 2s initial delay, factor 2) the
/// sleep schedule is 2s then 4s.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Multiplier applied per subsequent retry.
    pub backoff_factor: u32,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
    /// Operation name for logging.
    pub operation_name: String,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(2),
            backoff_factor: 2,
            max_delay: Duration::from_secs(60),
            operation_name: "operation".to_string(),
        }
    }
}

impl RetryPolicy {
    /// Create a policy with the given operation name.
    pub fn new(operation_name: impl Into<String>) -> Self {
        Self {
            operation_name: operation_name.into(),
            ..Default::default()
        }
    }

    /// Set the total attempt count.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Set the delay before the first retry.
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Set the backoff multiplier.
    pub fn with_backoff_factor(mut self, factor: u32) -> Self {
        self.backoff_factor = factor.max(1);
        self
    }

    /// Delay after the given failed attempt (1-based):
    /// `initial_delay * backoff_factor^(attempt-1)`, capped.
    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = self
            .initial_delay
            .saturating_mul(self.backoff_factor.saturating_pow(attempt.saturating_sub(1)));
        delay.min(self.max_delay)
    }

    /// Execute `operation` under this policy.
    ///
    /// Fatal errors return without sleeping. Retryable errors sleep
    /// the backoff delay and try again, up to `max_attempts` total
    /// attempts; the failure then reports `exhausted = true` with the
    /// last observed error.
    pub async fn run<F, Fut, T, E>(&self, operation: F) -> Result<T, RetryFailure<E>>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: RetryClass + std::fmt::Display,
    {
        let mut attempt = 1u32;

        loop {
            match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(
                            "{} succeeded on attempt {}/{}",
                            self.operation_name, attempt, self.max_attempts
                        );
                    }
                    return Ok(value);
                }
                Err(e) if !e.is_retryable() => {
                    debug!("{} failed with fatal error: {}", self.operation_name, e);
                    return Err(RetryFailure {
                        error: e,
                        attempts: attempt,
                        exhausted: false,
                    });
                }
                Err(e) if attempt >= self.max_attempts => {
                    warn!(
                        "{} exhausted {} attempts, giving up: {}",
                        self.operation_name, attempt, e
                    );
                    return Err(RetryFailure {
                        error: e,
                        attempts: attempt,
                        exhausted: true,
                    });
                }
                Err(e) => {
                    let delay = self.delay_for_attempt(attempt);
                    warn!(
                        "{} attempt {}/{} failed, retrying in {:?}: {}",
                        self.operation_name, attempt, self.max_attempts, delay, e
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

/// A call that did not succeed under the policy.
#[derive(Debug)]
pub struct RetryFailure<E> {
    /// Last observed error.
    pub error: E,
    /// Attempts actually made.
    pub attempts: u32,
    /// True when the attempt budget ran out; false for a fatal error.
    pub exhausted: bool,
}
