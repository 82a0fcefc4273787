//! Bounded exponential backoff for chain calls.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::chain::ChainError;

const LOG_TARGET: &str = "rps::retry";

/// Errors that know whether another attempt could succeed.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

impl Retryable for ChainError {
    fn is_retryable(&self) -> bool {
        self.is_transient()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    #[serde(with = "crate::crypto_serde::duration_ms")]
    pub base_delay: Duration,
    #[serde(with = "crate::crypto_serde::duration_ms")]
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(500);
    pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(8);

    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay: Self::DEFAULT_MAX_DELAY.max(base_delay),
        }
    }

    /// Three attempts, for state reads.
    pub fn reads() -> Self {
        Self::new(3, Self::DEFAULT_BASE_DELAY)
    }

    /// Five attempts, for transaction submission.
    pub fn writes() -> Self {
        Self::new(5, Self::DEFAULT_BASE_DELAY)
    }

    /// Delay after failed attempt `attempt` (1-based): `base · 2^(attempt-1)`, capped.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::reads()
    }
}

/// Run `operation` until it succeeds, fails with a non-retryable error, or
/// the attempt budget runs out. The closure receives the 1-based attempt.
pub async fn retry_with_backoff<T, E, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    mut operation: F,
) -> Result<T, E>
where
    E: Retryable + std::fmt::Display,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 1;
    loop {
        match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt < policy.max_attempts => {
                let delay = policy.delay_for(attempt);
                tracing::warn!(
                    target: LOG_TARGET,
                    operation = label,
                    attempt,
                    max_attempts = policy.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "transient failure, backing off"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => {
                tracing::debug!(
                    target: LOG_TARGET,
                    operation = label,
                    attempt,
                    retryable = err.is_retryable(),
                    error = %err,
                    "giving up"
                );
                return Err(err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn delay_doubles_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 10,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(700),
        };
        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3), Duration::from_millis(400));
        assert_eq!(policy.delay_for(4), Duration::from_millis(700));
        assert_eq!(policy.delay_for(40), Duration::from_millis(700));
    }

    #[test]
    fn default_budgets() {
        assert_eq!(RetryPolicy::reads().max_attempts, 3);
        assert_eq!(RetryPolicy::writes().max_attempts, 5);
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_errors_retry_until_success() {
        let calls = AtomicU32::new(0);
        let result = retry_with_backoff(&RetryPolicy::writes(), "flaky", |attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt < 3 {
                    Err(ChainError::Network("connection reset".into()))
                } else {
                    Ok(attempt)
                }
            }
        })
        .await;
        assert_eq!(result, Ok(3));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn budget_is_respected() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = retry_with_backoff(&RetryPolicy::reads(), "down", |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(ChainError::Timeout("rpc timed out".into())) }
        })
        .await;
        assert!(matches!(result, Err(ChainError::Timeout(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn terminal_errors_are_not_retried() {
        for err in [
            ChainError::UserRejected("user denied".into()),
            ChainError::AlreadyDone("Moves already submitted".into()),
            ChainError::Reverted("execution reverted".into()),
        ] {
            let calls = AtomicU32::new(0);
            let result: Result<(), _> = retry_with_backoff(&RetryPolicy::writes(), "terminal", |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                let err = err.clone();
                async move { Err(err) }
            })
            .await;
            assert_eq!(result, Err(err));
            assert_eq!(calls.load(Ordering::SeqCst), 1);
        }
    }

    #[test]
    fn policy_serializes_delays_as_millis() {
        let json = serde_json::to_value(RetryPolicy::writes()).unwrap();
        assert_eq!(json["base_delay"], 500);
        assert_eq!(json["max_attempts"], 5);
    }
}
