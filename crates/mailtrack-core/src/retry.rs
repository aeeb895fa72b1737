//! Retry policy with exponential backoff.
//!
//! The policy is plain data: it knows how many attempts to make and how long
//! to wait between them. [`RetryPolicy::run`] drives any async operation with
//! it, so the schedule can be tested without touching the network.

use std::fmt;
use std::future::Future;
use std::time::Duration;

/// Default number of attempts for a reconciliation.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default delay before the second attempt.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

/// Attempt budget and backoff schedule.
///
/// The delay after failed attempt `n` (1-based) is `base_delay * 2^(n-1)`,
/// giving 1s, 2s, 4s, ... with the defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Delay after the first failure.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
        }
    }
}

/// The operation failed on its final attempt (or with a non-retryable error).
#[derive(Debug)]
pub struct RetryError<E> {
    /// Attempts made before giving up.
    pub attempts: u32,
    /// The error from the last attempt.
    pub error: E,
}

impl<E: fmt::Display> fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gave up after {} attempt(s): {}", self.attempts, self.error)
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for RetryError<E> {}

impl RetryPolicy {
    /// Create a policy. A zero attempt budget is treated as one attempt.
    pub const fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
        }
    }

    /// A policy that never retries.
    pub const fn no_retry() -> Self {
        Self::new(1, Duration::ZERO)
    }

    fn budget(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Backoff to wait after failed attempt `attempt` (1-based), regardless of
    /// whether another attempt is allowed.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.base_delay.saturating_mul(1_u32 << exponent)
    }

    /// Delay before the next attempt, or `None` when `attempt` was the last.
    pub fn delay_after(&self, attempt: u32) -> Option<Duration> {
        (attempt < self.budget()).then(|| self.backoff(attempt))
    }

    /// The full sleep schedule between attempts.
    #[cfg(test)]
    pub fn schedule(&self) -> Vec<Duration> {
        (1..self.budget()).map(|n| self.backoff(n)).collect()
    }

    /// Run `op` until it succeeds, the budget is spent, or it fails with an
    /// error `retryable` rejects.
    ///
    /// `op` receives the 1-based attempt number.
    ///
    /// # Errors
    ///
    /// Returns the last error along with the number of attempts made.
    pub async fn run<T, E, F, Fut, R>(&self, mut op: F, retryable: R) -> Result<T, RetryError<E>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        R: Fn(&E) -> bool,
    {
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(error) => {
                    let delay = if retryable(&error) {
                        self.delay_after(attempt)
                    } else {
                        None
                    };
                    let Some(delay) = delay else {
                        return Err(RetryError {
                            attempts: attempt,
                            error,
                        });
                    };
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
