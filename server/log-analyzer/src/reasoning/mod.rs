//! External reasoning service: one capability trait, interchangeable strategies.
//!
//! The strategy is chosen once at startup by [`from_config`] and injected into
//! the analyzer as `Arc<dyn ReasoningClient>`.

pub mod extract;
pub mod gemini;
pub mod http;
pub mod openai;
pub mod prompt;
pub mod retry;
pub mod stub;

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::{Provider, ReasoningConfig};
use crate::error::AnalyzerError;
use crate::types::AnalysisResult;
use crate::validate::{ResponseValidator, SchemaValidator};

pub use gemini::GeminiClient;
pub use openai::OpenAiClient;
pub use prompt::PromptBuilder;
pub use retry::{RetryDecision, RetryPolicy};
pub use stub::StubClient;

#[async_trait]
pub trait ReasoningClient: Send + Sync {
  /// Analyze a sanitized log. Retryable failures are retried internally;
  /// an `Err` here is final.
  async fn analyze(&self, cancel: &CancellationToken, log: &str) -> Result<AnalysisResult, AnalyzerError>;

  async fn health_check(&self, cancel: &CancellationToken) -> Result<(), AnalyzerError>;

  /// Short strategy name for logs.
  fn name(&self) -> &'static str;
}

pub fn from_config(cfg: &ReasoningConfig) -> Result<Arc<dyn ReasoningClient>, AnalyzerError> {
  if cfg.mock_mode {
    warn!("running in mock mode - reasoning responses are simulated");
    return Ok(Arc::new(StubClient));
  }

  let prompt = PromptBuilder::default();
  let validator: Arc<dyn ResponseValidator> = Arc::new(SchemaValidator);
  let client: Arc<dyn ReasoningClient> = match cfg.provider {
    Provider::OpenAi => Arc::new(OpenAiClient::new(cfg, prompt, validator)?),
    Provider::Gemini => Arc::new(GeminiClient::new(cfg, prompt, validator)?),
  };
  info!(
    provider = client.name(),
    model = %cfg.model,
    max_retries = cfg.max_retries,
    "reasoning client configured"
  );
  Ok(client)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn mock_mode_selects_stub() {
    let cfg = ReasoningConfig {
      mock_mode: true,
      ..ReasoningConfig::default()
    };
    assert_eq!(from_config(&cfg).unwrap().name(), "stub");
  }

  #[test]
  fn provider_selects_network_client() {
    let cfg = ReasoningConfig {
      api_key: Some("test-key".into()),
      ..ReasoningConfig::default()
    };
    assert_eq!(from_config(&cfg).unwrap().name(), "openai");

    let cfg = ReasoningConfig {
      provider: Provider::Gemini,
      api_key: Some("test-key".into()),
      ..ReasoningConfig::default()
    };
    assert_eq!(from_config(&cfg).unwrap().name(), "gemini");
  }

  #[test]
  fn network_client_requires_api_key() {
    let err = from_config(&ReasoningConfig::default()).err().unwrap();
    assert!(matches!(err, AnalyzerError::InvalidConfig(_)));
  }
}
