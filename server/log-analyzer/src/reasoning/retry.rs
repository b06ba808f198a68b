//! Retry/backoff state machine for reasoning calls.
//!
//! Attempt(n) ends in Success, RetryableFailure or FatalFailure. A retryable
//! failure with retries left waits `unit * n²` (n = 1 for the first retry) and
//! moves to Attempt(n + 1); everything else terminates with the last error.
//! The wait honours cancellation.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::AnalyzerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
  pub max_retries: u32,
  pub backoff_unit: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
  /// Wait `delay`, then make retry number `retry`.
  Retry { retry: u32, delay: Duration },
  Stop,
}

impl RetryPolicy {
  pub fn new(max_retries: u32, backoff_unit: Duration) -> Self {
    Self {
      max_retries,
      backoff_unit,
    }
  }

  /// Quadratic: 1, 4, 9, ... units.
  pub fn backoff(&self, retry: u32) -> Duration {
    self.backoff_unit.saturating_mul(retry.saturating_mul(retry))
  }

  /// Decide what follows a failed attempt, given how many retries were already made.
  pub fn decide(&self, retries_done: u32, err: &AnalyzerError) -> RetryDecision {
    if !err.is_retryable() || retries_done >= self.max_retries {
      return RetryDecision::Stop;
    }
    let retry = retries_done + 1;
    RetryDecision::Retry {
      retry,
      delay: self.backoff(retry),
    }
  }

  /// Run `attempt` until success, a fatal error, exhausted retries or cancellation.
  ///
  /// The closure receives the zero-based attempt number.
  pub async fn run<T, F, Fut>(&self, cancel: &CancellationToken, mut attempt: F) -> Result<T, AnalyzerError>
  where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, AnalyzerError>>,
  {
    let mut retries_done = 0;
    loop {
      if cancel.is_cancelled() {
        return Err(AnalyzerError::Cancelled);
      }
      let err = match attempt(retries_done).await {
        Ok(value) => return Ok(value),
        Err(err) => err,
      };

      match self.decide(retries_done, &err) {
        RetryDecision::Stop => {
          if err.is_retryable() {
            warn!(attempts = retries_done + 1, error = %err, "reasoning retries exhausted");
          }
          return Err(err);
        }
        RetryDecision::Retry { retry, delay } => {
          debug!(
            retry,
            backoff_ms = delay.as_millis() as u64,
            error = %err,
            "retrying reasoning request"
          );
          tokio::select! {
            _ = cancel.cancelled() => return Err(AnalyzerError::Cancelled),
            _ = tokio::time::sleep(delay) => {}
          }
          retries_done = retry;
        }
      }
    }
  }
}
