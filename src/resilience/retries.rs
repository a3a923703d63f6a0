//! Retry logic.
//!
//! # Responsibilities
//! - Bound every exchange call with a per-attempt timeout
//! - Retry timed-out reads immediately, up to `attempts` tries
//! - Give submissions exactly one bounded attempt
//!
//! # Design Decisions
//! - Only timeouts are retried; any other error propagates on first sight
//! - No backoff between attempts
//! - Exhaustion is "no result" (`Ok(None)`), which callers treat as a null
//!   response

use std::future::Future;
use std::time::{Duration, Instant};

use crate::config::RetryConfig;
use crate::observability::metrics;
use crate::resilience::timeouts::{bounded, Attempt};

/// Bounded timeout + bounded retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    attempts: u32,
    timeout: Duration,
}

impl RetryPolicy {
    pub fn new(attempts: u32, timeout: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            timeout,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(config.attempts, Duration::from_millis(config.timeout_ms))
    }

    /// Same deadline, one attempt. Used for submissions, whose storage id
    /// must never be consumed twice.
    pub fn single_attempt(&self) -> Self {
        Self {
            attempts: 1,
            timeout: self.timeout,
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run `op` under the policy.
    ///
    /// `call` names the exchange call in logs and metrics.
    pub async fn run<T, E, F, Fut>(&self, call: &'static str, mut op: F) -> Result<Option<T>, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        for attempt in 1..=self.attempts {
            let start_time = Instant::now();
            match bounded(self.timeout, op()).await {
                Attempt::Completed(Ok(value)) => {
                    metrics::record_exchange_attempt(call, "ok", start_time);
                    return Ok(Some(value));
                }
                Attempt::Completed(Err(e)) => {
                    metrics::record_exchange_attempt(call, "error", start_time);
                    tracing::warn!(call, attempt, error = %e, "Exchange call failed");
                    return Err(e);
                }
                Attempt::TimedOut => {
                    metrics::record_exchange_attempt(call, "timeout", start_time);
                    tracing::warn!(
                        call,
                        attempt,
                        attempts = self.attempts,
                        timeout_ms = self.timeout.as_millis() as u64,
                        "Exchange call timed out"
                    );
                }
            }
        }

        tracing::warn!(call, attempts = self.attempts, "Retries exhausted, no result");
        Ok(None)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_always_timing_out_sees_exactly_attempts_calls() {
        let policy = RetryPolicy::new(3, Duration::from_millis(20));
        let calls = Arc::new(AtomicU32::new(0));

        let counter = calls.clone();
        let result: Result<Option<u32>, String> = policy
            .run("stub", || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    Ok(1)
                }
            })
            .await;

        assert_eq!(result, Ok(None));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_recovers_after_timeout() {
        let policy = RetryPolicy::new(3, Duration::from_millis(20));
        let calls = Arc::new(AtomicU32::new(0));

        let counter = calls.clone();
        let result: Result<Option<&str>, String> = policy
            .run("stub", || {
                let counter = counter.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                        tokio::time::sleep(Duration::from_secs(30)).await;
                    }
                    Ok("done")
                }
            })
            .await;

        assert_eq!(result, Ok(Some("done")));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_errors_propagate_without_retry() {
        let policy = RetryPolicy::new(5, Duration::from_millis(500));
        let calls = Arc::new(AtomicU32::new(0));

        let counter = calls.clone();
        let result: Result<Option<u32>, String> = policy
            .run("stub", || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err("connection refused".to_string())
                }
            })
            .await;

        assert_eq!(result, Err("connection refused".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_single_attempt_keeps_timeout() {
        let policy = RetryPolicy::new(3, Duration::from_millis(1234));
        let single = policy.single_attempt();
        assert_eq!(single.attempts(), 1);
        assert_eq!(single.timeout(), Duration::from_millis(1234));
    }

    #[test]
    fn test_zero_attempts_clamped() {
        assert_eq!(RetryPolicy::new(0, Duration::from_secs(1)).attempts(), 1);
    }
}
