//! Retry policy with exponential backoff and jitter.
//!
//! Backoff doubles with each failed attempt up to a cap, plus a random
//! jitter so concurrent callers do not retry in lockstep:
//! `min(initial * 2^attempt, max) + rand(0..=max_jitter)`.
//!
//! Only errors whose [`Retryable::is_transient`] returns true are retried.

use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::domain::models::RetryConfig;
use crate::domain::ports::{CompletionError, EmbeddingError};

/// Classification hook for errors the policy may retry.
pub trait Retryable {
    fn is_transient(&self) -> bool;
}

impl Retryable for EmbeddingError {
    fn is_transient(&self) -> bool {
        EmbeddingError::is_transient(self)
    }
}

impl Retryable for CompletionError {
    fn is_transient(&self) -> bool {
        CompletionError::is_transient(self)
    }
}

/// Retry policy configuration for handling transient errors
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first call
    max_attempts: u32,
    /// Initial backoff duration in milliseconds
    initial_backoff_ms: u64,
    /// Maximum backoff duration in milliseconds
    max_backoff_ms: u64,
    /// Upper bound of the random jitter in milliseconds
    max_jitter_ms: u64,
}

impl RetryPolicy {
    /// Create a new retry policy
    ///
    /// # Arguments
    /// * `max_attempts` - Total attempts (recommended: 5)
    /// * `initial_backoff_ms` - Starting backoff delay (recommended: 1000ms)
    /// * `max_backoff_ms` - Maximum backoff delay before jitter
    /// * `max_jitter_ms` - Random jitter upper bound (recommended: 1000ms)
    pub fn new(max_attempts: u32, initial_backoff_ms: u64, max_backoff_ms: u64, max_jitter_ms: u64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_backoff_ms,
            max_backoff_ms: max_backoff_ms.max(initial_backoff_ms),
            max_jitter_ms,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(
            config.max_attempts,
            config.initial_backoff_ms,
            config.max_backoff_ms,
            config.max_jitter_ms,
        )
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Execute an operation, retrying transient failures
    ///
    /// Returns the first success, the first permanent error, or the last
    /// transient error once `max_attempts` calls have been made.
    pub async fn execute<F, Fut, T, E>(&self, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + std::fmt::Display,
    {
        let mut attempt: u32 = 0;

        loop {
            match operation().await {
                Ok(result) => {
                    if attempt > 0 {
                        debug!(retries = attempt, "Operation succeeded after retries");
                    }
                    return Ok(result);
                }
                Err(err) => {
                    if !err.is_transient() {
                        debug!(error = %err, "Permanent error, not retrying");
                        return Err(err);
                    }
                    if attempt + 1 >= self.max_attempts {
                        warn!(attempts = attempt + 1, error = %err, "Retry budget exhausted");
                        return Err(err);
                    }

                    let delay = self.calculate_backoff(attempt) + self.jitter();
                    warn!(
                        attempt = attempt + 1,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Transient error, backing off"
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    /// Deterministic part of the delay: `min(initial * 2^attempt, max)`.
    pub fn calculate_backoff(&self, attempt: u32) -> Duration {
        let backoff_ms = self
            .initial_backoff_ms
            .saturating_mul(2_u64.saturating_pow(attempt))
            .min(self.max_backoff_ms);

        Duration::from_millis(backoff_ms)
    }

    fn jitter(&self) -> Duration {
        if self.max_jitter_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::rng().random_range(0..=self.max_jitter_ms))
    }
}

impl Default for RetryPolicy {
    /// 5 attempts, 1s initial backoff, 30s cap, up to 1s jitter.
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}
