//! Conflict retry with exponential backoff
//!
//! Two transactions racing on the same sibling group are serialized by the
//! store; the loser sees either a busy database or a unique-index violation on
//! the group's orders. Both are transient, so the whole transaction is run
//! again with fresh reads.
//!
//! # Example
//!
//! ```rust
//! use outliner_core::operations::{NodeOperationError, RetryPolicy};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), NodeOperationError> {
//! let policy = RetryPolicy::new(3, Duration::from_millis(10));
//!
//! // Retries up to 3 times (backoff: 10ms, 20ms, 40ms)
//! let value = policy.run("example", || async { Ok::<_, NodeOperationError>(42) }).await?;
//! assert_eq!(value, 42);
//! # Ok(())
//! # }
//! ```

use crate::config::OutlinerConfig;
use crate::operations::NodeOperationError;
use std::future::Future;
use tokio::time::Duration;

/// How often and how patiently a conflicting transaction is re-run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts (0 = single attempt, no retries)
    pub max_retries: usize,

    /// Delay before the first retry; doubled for every further attempt
    pub base_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&OutlinerConfig::default())
    }
}

impl RetryPolicy {
    pub fn new(max_retries: usize, base_backoff: Duration) -> Self {
        Self {
            max_retries,
            base_backoff,
        }
    }

    pub fn from_config(config: &OutlinerConfig) -> Self {
        Self::new(
            config.max_conflict_retries,
            Duration::from_millis(config.retry_backoff_ms),
        )
    }

    /// Single attempt, conflicts surface immediately
    pub fn no_retry() -> Self {
        Self::new(0, Duration::ZERO)
    }

    /// Backoff before retry number `attempt` (0-based): base, 2x base, 4x base, ...
    pub fn backoff_for(&self, attempt: usize) -> Duration {
        let factor = 1u32 << attempt.min(16);
        self.base_backoff.saturating_mul(factor)
    }

    /// Run `attempt_fn` until it succeeds, fails with a non-retryable error,
    /// or exhausts the retry budget
    ///
    /// # Retry Behavior
    ///
    /// - **Retry on**: errors where [`NodeOperationError::is_retryable`] is true
    /// - **Backoff**: Exponential (10ms, 20ms, 40ms, ... with the default base)
    /// - **Other errors**: Fail immediately without retry
    pub async fn run<T, F, Fut>(
        &self,
        operation: &str,
        mut attempt_fn: F,
    ) -> Result<T, NodeOperationError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, NodeOperationError>>,
    {
        let mut attempt = 0;

        loop {
            match attempt_fn().await {
                Ok(value) => {
                    if attempt > 0 {
                        tracing::debug!(
                            "{} succeeded after {} retry(ies)",
                            operation,
                            attempt
                        );
                    }
                    return Ok(value);
                }

                Err(err) if err.is_retryable() && attempt < self.max_retries => {
                    let backoff = self.backoff_for(attempt);
                    tracing::warn!(
                        "Conflict on attempt {}/{} of {}: {}. Retrying in {:?}",
                        attempt + 1,
                        self.max_retries + 1,
                        operation,
                        err,
                        backoff
                    );

                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }

                Err(err) => {
                    if err.is_retryable() {
                        tracing::warn!(
                            "{} failed after {} attempt(s): {}",
                            operation,
                            attempt + 1,
                            err
                        );
                    }
                    return Err(err);
                }
            }
        }
    }
}
