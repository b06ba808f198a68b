//! Shared application state for the HTTP handlers.

use std::sync::Arc;
use std::time::Duration;

use crate::analyzer::Analyzer;

pub struct AppState {
  pub analyzer: Analyzer,
  /// Deadline for one analysis, retries and backoff included.
  pub request_timeout: Duration,
}

impl AppState {
  pub fn new(analyzer: Analyzer, request_timeout: Duration) -> Arc<Self> {
    Arc::new(Self {
      analyzer,
      request_timeout,
    })
  }
}
