//! Timeout enforcement.
//!
//! A timed-out attempt is a distinct outcome, never folded into the call's
//! own error type.

use std::future::Future;
use std::time::Duration;

/// Outcome of one bounded attempt.
#[derive(Debug, PartialEq, Eq)]
pub enum Attempt<T> {
    Completed(T),
    TimedOut,
}

/// Run `fut` with a deadline. The future is dropped on timeout.
pub async fn bounded<F: Future>(deadline: Duration, fut: F) -> Attempt<F::Output> {
    match tokio::time::timeout(deadline, fut).await {
        Ok(output) => Attempt::Completed(output),
        Err(_) => Attempt::TimedOut,
    }
}
