//! Retry with exponential backoff under a total time budget.

use std::future::Future;
use std::time::Duration;

use tokio::time::{Instant, sleep};
use tracing::{debug, warn};

/// Backoff schedule and time budget.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Multiplier applied to the delay after every retry.
    pub multiplier: f64,
    /// Upper bound for a single delay.
    pub max_delay: Duration,
    /// Total time after which no further attempt is started.
    pub max_elapsed: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            multiplier: 2.0,
            max_delay: Duration::from_secs(5),
            max_elapsed: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// A policy that gives up after the first failure.
    pub fn no_retry() -> Self {
        Self {
            max_elapsed: Duration::ZERO,
            ..Default::default()
        }
    }

    /// Calculates the delay before retry number `attempt` (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base = self.initial_delay.as_secs_f64() * self.multiplier.powi(attempt as i32);
        let capped = base.min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(capped.max(0.0))
    }
}

/// Errors that know whether a retry might help.
pub trait Transient {
    /// Returns whether the operation should be retried.
    fn is_transient(&self) -> bool;
}

impl Transient for crate::error::MetricsError {
    fn is_transient(&self) -> bool {
        crate::error::MetricsError::is_transient(self)
    }
}

/// Runs `operation` until it succeeds, fails permanently, or the policy's
/// time budget runs out. The last error is returned.
///
/// A wait never extends past the budget.
pub async fn with_backoff<T, E, F, Fut>(
    policy: &RetryPolicy,
    operation_name: &str,
    mut operation: F,
) -> Result<T, E>
where
    E: Transient + std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let started = Instant::now();
    let mut attempt = 0;

    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        if !err.is_transient() {
            debug!(operation = operation_name, error = %err, "Non-retryable error");
            return Err(err);
        }

        let elapsed = started.elapsed();
        if elapsed >= policy.max_elapsed {
            warn!(
                operation = operation_name,
                attempts = attempt + 1,
                error = %err,
                "Retry budget exhausted"
            );
            return Err(err);
        }

        let delay = policy
            .delay_for_attempt(attempt)
            .min(policy.max_elapsed - elapsed);
        debug!(
            operation = operation_name,
            attempt = attempt + 1,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "Attempt failed, retrying"
        );

        sleep(delay).await;
        attempt += 1;
    }
}
