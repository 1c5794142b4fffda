//! Bounded retry for cache and durable-store operations
//!
//! The cache never retries on its own; the orchestration layer wraps calls
//! in a [`RetryPolicy`] so the number of attempts is always bounded.

use super::backoff::Backoff;
use crate::error::CacheResult;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Retry behavior for storage calls
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts including the first one
    pub max_attempts: u32,
    /// Initial delay before first retry
    #[serde(with = "humantime_serde")]
    pub initial_delay: Duration,
    /// Maximum delay between retries
    #[serde(with = "humantime_serde")]
    pub max_delay: Duration,
    /// Backoff multiplier for exponential backoff
    pub backoff_multiplier: f64,
    /// Add random jitter to prevent thundering herd
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(2),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryConfig {
    pub fn with_max_attempts(mut self, max: u32) -> Self {
        self.max_attempts = max;
        self
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }
}

/// Retry policy for storage operations
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
    backoff: Backoff,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self {
            backoff: Backoff::from_config(&config),
            config,
        }
    }

    /// Attempt is 0-indexed; `max_attempts = 3` allows attempts 0, 1 and 2.
    fn has_attempts_left(&self, attempt: u32) -> bool {
        attempt + 1 < self.config.max_attempts.max(1)
    }

    /// Run `operation` until it succeeds, fails with a non-retryable error,
    /// exhausts its attempts, or `cancel` fires. The last error is returned.
    pub async fn execute<T, F, Fut>(
        &self,
        label: &str,
        mut operation: F,
        cancel: Option<&CancellationToken>,
    ) -> CacheResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = CacheResult<T>>,
    {
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(value) => {
                    if attempt > 0 {
                        debug!(operation = label, attempt, "Operation succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(error) => {
                    if !error.is_retryable() || !self.has_attempts_left(attempt) {
                        return Err(error);
                    }

                    let delay = self.backoff.delay(attempt);
                    warn!(
                        operation = label,
                        attempt = attempt + 1,
                        max_attempts = self.config.max_attempts,
                        ?delay,
                        error = %error,
                        "Retryable storage error, backing off"
                    );

                    match cancel {
                        Some(token) => {
                            tokio::select! {
                                _ = token.cancelled() => return Err(error),
                                _ = sleep(delay) => {}
                            }
                        }
                        None => sleep(delay).await,
                    }
                    attempt += 1;
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(RetryConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CacheError;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(
            RetryConfig::default()
                .with_max_attempts(max_attempts)
                .with_initial_delay(Duration::from_millis(1))
                .with_jitter(false),
        )
    }

    #[tokio::test]
    async fn test_retries_transient_then_succeeds() {
        let calls = Arc::new(AtomicU32::new(0));
        let policy = fast_policy(3);

        let c = calls.clone();
        let result = policy
            .execute(
                "flaky",
                move || {
                    let c = c.clone();
                    async move {
                        if c.fetch_add(1, Ordering::SeqCst) < 2 {
                            Err(CacheError::storage_unavailable("timeout"))
                        } else {
                            Ok(42)
                        }
                    }
                },
                None,
            )
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_attempts_are_bounded() {
        let calls = Arc::new(AtomicU32::new(0));
        let policy = fast_policy(3);

        let c = calls.clone();
        let result: CacheResult<()> = policy
            .execute(
                "down",
                move || {
                    let c = c.clone();
                    async move {
                        c.fetch_add(1, Ordering::SeqCst);
                        Err(CacheError::storage_unavailable("down"))
                    }
                },
                None,
            )
            .await;

        assert!(matches!(result, Err(CacheError::StorageUnavailable { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_error_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let policy = fast_policy(5);

        let c = calls.clone();
        let result: CacheResult<()> = policy
            .execute(
                "uninit",
                move || {
                    let c = c.clone();
                    async move {
                        c.fetch_add(1, Ordering::SeqCst);
                        Err(CacheError::not_initialized("cache pool"))
                    }
                },
                None,
            )
            .await;

        assert!(matches!(result, Err(CacheError::NotInitialized { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancellation_stops_backoff() {
        let policy = RetryPolicy::new(
            RetryConfig::default()
                .with_max_attempts(10)
                .with_initial_delay(Duration::from_secs(60)),
        );
        let token = CancellationToken::new();
        token.cancel();

        let result: CacheResult<()> = policy
            .execute(
                "cancelled",
                || async { Err(CacheError::storage_unavailable("down")) },
                Some(&token),
            )
            .await;

        assert!(result.is_err());
    }
}
