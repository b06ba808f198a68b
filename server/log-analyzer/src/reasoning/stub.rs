use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::AnalyzerError;
use crate::reasoning::ReasoningClient;
use crate::types::{AnalysisResult, Severity};

/// Deterministic stand-in used in mock mode. Performs no I/O.
#[derive(Debug, Clone, Copy, Default)]
pub struct StubClient;

impl StubClient {
  pub fn advisory() -> AnalysisResult {
    AnalysisResult {
      error_type: "mock_error".into(),
      severity: Severity::Medium,
      root_cause: "This is a mock response. Enable real analysis by setting AI_MOCK_MODE=false".into(),
      suggested_actions: vec![
        "Configure AI_API_KEY environment variable".into(),
        "Set AI_MOCK_MODE=false to enable real analysis".into(),
      ],
      prevention_tips: vec!["Use a real reasoning provider for production analysis".into()],
    }
  }
}

#[async_trait]
impl ReasoningClient for StubClient {
  async fn analyze(&self, _cancel: &CancellationToken, log: &str) -> Result<AnalysisResult, AnalyzerError> {
    debug!(log_length = log.len(), "mock analysis");
    Ok(Self::advisory())
  }

  async fn health_check(&self, _cancel: &CancellationToken) -> Result<(), AnalyzerError> {
    Ok(())
  }

  fn name(&self) -> &'static str {
    "stub"
  }
}
