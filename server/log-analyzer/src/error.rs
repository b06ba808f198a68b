//! Structured error types for the log analyzer.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalyzerError {
  #[error("log content is empty")]
  EmptyLog,

  #[error("log content exceeds maximum size ({size} > {limit} bytes)")]
  LogTooLarge { size: usize, limit: usize },

  #[error("reasoning service timeout")]
  ReasoningTimeout,

  #[error("reasoning service unavailable: {0}")]
  ReasoningUnavailable(String),

  #[error("rate limit exceeded")]
  RateLimited,

  #[error("invalid reasoning response: {0}")]
  InvalidReasoningResponse(String),

  #[error("reasoning request rejected (status {status}): {message}")]
  RequestRejected { status: u16, message: String },

  #[error("analysis cancelled")]
  Cancelled,

  #[error("invalid configuration: {0}")]
  InvalidConfig(String),
}

impl AnalyzerError {
  pub fn invalid_response(reason: impl Into<String>) -> Self {
    Self::InvalidReasoningResponse(reason.into())
  }

  pub fn invalid_config(reason: impl Into<String>) -> Self {
    Self::InvalidConfig(reason.into())
  }

  pub fn unavailable(reason: impl Into<String>) -> Self {
    Self::ReasoningUnavailable(reason.into())
  }

  pub fn rejected(status: u16, message: impl Into<String>) -> Self {
    Self::RequestRejected {
      status,
      message: message.into(),
    }
  }

  /// Transient conditions worth another attempt. Everything else is final.
  pub fn is_retryable(&self) -> bool {
    matches!(
      self,
      Self::ReasoningTimeout | Self::ReasoningUnavailable(_) | Self::RateLimited
    )
  }
}
