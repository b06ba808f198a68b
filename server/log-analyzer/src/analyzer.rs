//! The orchestrator: sanitize, try rules, ask the reasoning service, degrade.
//!
//! `Received -> Validated -> RuleChecked -> {RuleResolved | ReasoningInvoked} -> {Resolved | Failed}`
//!
//! After a reasoning failure the best rule match of *any* confidence is taken,
//! so the caller gets an answer whenever some rule matched at all.

use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::engine::RuleEngine;
use crate::error::AnalyzerError;
use crate::reasoning::ReasoningClient;
use crate::rules::RuleTable;
use crate::sanitize::Sanitizer;
use crate::types::{AnalysisRequest, AnalysisResponse, AnalysisResult, Source};
use crate::validate::{ResponseValidator, SchemaValidator};

pub struct Analyzer {
  client: Arc<dyn ReasoningClient>,
  validator: Arc<dyn ResponseValidator>,
  engine: RuleEngine,
  sanitizer: Sanitizer,
  enable_rules: bool,
}

impl Analyzer {
  pub fn new(
    client: Arc<dyn ReasoningClient>,
    validator: Arc<dyn ResponseValidator>,
    engine: RuleEngine,
    sanitizer: Sanitizer,
    enable_rules: bool,
  ) -> Self {
    Self {
      client,
      validator,
      engine,
      sanitizer,
      enable_rules,
    }
  }

  /// Built-in rules, default sanitizer patterns and the schema validator.
  pub fn from_config(cfg: &Config, client: Arc<dyn ReasoningClient>) -> Result<Self, AnalyzerError> {
    let table = Arc::new(RuleTable::builtin()?);
    let p = &cfg.processing;
    info!(
      rules = table.len(),
      enabled = p.enable_rules,
      threshold = p.rule_confidence_threshold,
      max_log_size = p.max_log_size,
      reasoning = client.name(),
      "analyzer initialized"
    );
    Ok(Self::new(
      client,
      Arc::new(SchemaValidator),
      RuleEngine::new(table, p.rule_confidence_threshold),
      Sanitizer::new(p.max_log_size)?,
      p.enable_rules,
    ))
  }

  pub fn client(&self) -> &dyn ReasoningClient {
    self.client.as_ref()
  }

  pub fn engine(&self) -> &RuleEngine {
    &self.engine
  }

  /// Always returns an envelope; failures are reported inside it.
  pub async fn analyze(&self, cancel: &CancellationToken, request: &AnalysisRequest) -> AnalysisResponse {
    let started = Instant::now();
    let response = self.run(cancel, &request.log).await;
    let elapsed_ms = started.elapsed().as_millis() as u64;
    match (&response.source, &response.error) {
      (Some(source), _) => info!(%source, elapsed_ms, "analysis resolved"),
      (None, error) => warn!(error = error.as_deref().unwrap_or(""), elapsed_ms, "analysis failed"),
    }
    response
  }

  async fn run(&self, cancel: &CancellationToken, raw: &str) -> AnalysisResponse {
    if self.sanitizer.is_empty(raw) {
      return AnalysisResponse::failed(AnalyzerError::EmptyLog.to_string());
    }
    if self.sanitizer.is_too_large(raw) {
      let err = AnalyzerError::LogTooLarge {
        size: raw.len(),
        limit: self.sanitizer.max_size(),
      };
      warn!(error = %err, "log will be truncated");
    }

    let (log, stats) = self.sanitizer.sanitize(raw);
    debug!(
      original_size = stats.original_size,
      sanitized_size = stats.sanitized_size,
      truncated = stats.truncated,
      secrets_masked = stats.secrets_masked,
      "log sanitized"
    );

    let matches = if self.enable_rules {
      self.engine.evaluate(&log)
    } else {
      Vec::new()
    };
    if let Some(m) = self.engine.best_match(&matches) {
      debug!(rule_id = m.rule_id, confidence = m.confidence, "confident rule match");
      return AnalysisResponse::resolved(m.result.clone(), Source::Rules(m.rule_id.to_string()));
    }

    let err = match self.reason(cancel, &log).await {
      Ok(result) => return AnalysisResponse::resolved(result, Source::Ai),
      Err(err) => err,
    };
    warn!(error = %err, reasoning = self.client.name(), "reasoning path failed");

    // Empty unless rules are enabled.
    match self.engine.best_any(&matches) {
      Some(m) => {
        debug!(rule_id = m.rule_id, confidence = m.confidence, "falling back to rule match");
        AnalysisResponse::resolved(m.result.clone(), Source::RulesFallback(m.rule_id.to_string()))
      }
      None => AnalysisResponse::failed(err.to_string()),
    }
  }

  async fn reason(&self, cancel: &CancellationToken, log: &str) -> Result<AnalysisResult, AnalyzerError> {
    let result = self.client.analyze(cancel, log).await?;
    self.validator.validate(Some(&result))?;
    Ok(result)
  }
}
