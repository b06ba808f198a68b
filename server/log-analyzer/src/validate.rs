//! Strict schema checks for results produced by the reasoning service.

use crate::error::AnalyzerError;
use crate::types::{AnalysisResult, RawAnalysis, Severity};

pub trait ResponseValidator: Send + Sync {
  /// Check a typed result. Every violation is final, never retried.
  fn validate(&self, result: Option<&AnalysisResult>) -> Result<(), AnalyzerError>;

  /// Check a decoded reply, including the severity literal, and produce the typed result.
  fn accept(&self, raw: RawAnalysis) -> Result<AnalysisResult, AnalyzerError> {
    let severity: Severity = raw
      .severity
      .parse()
      .map_err(AnalyzerError::invalid_response)?;
    let result = AnalysisResult {
      error_type: raw.error_type,
      severity,
      root_cause: raw.root_cause,
      suggested_actions: raw.suggested_actions,
      prevention_tips: raw.prevention_tips,
    };
    self.validate(Some(&result))?;
    Ok(result)
  }
}

/// The fixed five-field schema.
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaValidator;

impl ResponseValidator for SchemaValidator {
  fn validate(&self, result: Option<&AnalysisResult>) -> Result<(), AnalyzerError> {
    let result = result.ok_or_else(|| AnalyzerError::invalid_response("result is missing"))?;

    if result.error_type.trim().is_empty() {
      return Err(AnalyzerError::invalid_response("error_type is required"));
    }
    if result.root_cause.trim().is_empty() {
      return Err(AnalyzerError::invalid_response("root_cause is required"));
    }
    if result.suggested_actions.is_empty() {
      return Err(AnalyzerError::invalid_response(
        "at least one suggested_action is required",
      ));
    }
    if let Some(i) = result.suggested_actions.iter().position(|a| a.trim().is_empty()) {
      return Err(AnalyzerError::invalid_response(format!(
        "suggested_action[{}] is empty",
        i
      )));
    }
    if let Some(i) = result.prevention_tips.iter().position(|t| t.trim().is_empty()) {
      return Err(AnalyzerError::invalid_response(format!(
        "prevention_tip[{}] is empty",
        i
      )));
    }
    Ok(())
  }
}
