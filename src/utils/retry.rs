use std::time::Duration;
use tokio::time::sleep;

// ============================================================================
// Bounded exponential backoff
// ============================================================================
//
// Used by the redelivery reconciler only. The publish path itself never
// loops; it gets a single reconnect-and-retry inside the publisher.
//
// ============================================================================

#[derive(Clone, Debug)]
pub struct RetryConfig {
    /// Attempts including the first one
    pub max_attempts: u32,
    /// Delay after the first failure
    pub initial_delay: Duration,
    /// Upper bound for any single delay
    pub max_delay: Duration,
    /// Growth factor between delays
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
            multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Delay to wait after the given (1-based) failed attempt.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        let millis = self.initial_delay.as_millis() as f64 * self.multiplier.powi(exponent);
        Duration::from_millis(millis as u64).min(self.max_delay)
    }
}

#[derive(Debug)]
pub enum RetryResult<T, E> {
    Success { value: T, attempts: u32 },
    /// Every attempt failed with a transient error
    Exhausted { error: E, attempts: u32 },
    /// A non-transient error stopped the loop early
    PermanentFailure { error: E, attempts: u32 },
}

/// Errors that may go away on their own.
pub trait IsTransient {
    fn is_transient(&self) -> bool;
}

/// Runs `operation` until it succeeds, fails permanently, or runs out of attempts.
pub async fn retry_on_transient<F, Fut, T, E>(config: &RetryConfig, mut operation: F) -> RetryResult<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: std::fmt::Display + IsTransient,
{
    let mut attempt = 0;

    loop {
        attempt += 1;

        let error = match operation(attempt).await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::info!(attempt = attempt, "Operation succeeded after retry");
                }
                return RetryResult::Success { value, attempts: attempt };
            }
            Err(error) => error,
        };

        if !error.is_transient() {
            tracing::error!(error = %error, "Permanent failure detected, not retrying");
            return RetryResult::PermanentFailure { error, attempts: attempt };
        }

        if attempt >= config.max_attempts {
            tracing::error!(attempt = attempt, error = %error, "Operation failed after all retries");
            return RetryResult::Exhausted { error, attempts: attempt };
        }

        let delay = config.delay_after(attempt);
        tracing::warn!(
            attempt = attempt,
            error = %error,
            delay_ms = delay.as_millis() as u64,
            "Transient failure, retrying after delay"
        );
        sleep(delay).await;
    }
}
