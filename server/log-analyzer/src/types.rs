//! Core types for the log analyzer (JSON contracts + internal models).

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};

// ---------------------------------------------------------------------------
// Severity enum (strict)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
  Low,
  Medium,
  High,
}

impl Severity {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Low => "Low",
      Self::Medium => "Medium",
      Self::High => "High",
    }
  }
}

impl fmt::Display for Severity {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Exact literal match only. "high", "Critical", "" are all rejected.
impl FromStr for Severity {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "Low" => Ok(Self::Low),
      "Medium" => Ok(Self::Medium),
      "High" => Ok(Self::High),
      other => Err(format!("severity must be Low, Medium, or High, got: {}", other)),
    }
  }
}

// ---------------------------------------------------------------------------
// Analysis result (canonical output shape for every source)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
  pub error_type: String,
  pub severity: Severity,
  pub root_cause: String,
  pub suggested_actions: Vec<String>,
  #[serde(default)]
  pub prevention_tips: Vec<String>,
}

/// Unvalidated reply object as decoded from the reasoning service.
///
/// Every field is lenient so that schema problems surface as validation
/// failures with a reason instead of opaque parse errors.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawAnalysis {
  #[serde(default)]
  pub error_type: String,
  #[serde(default)]
  pub severity: String,
  #[serde(default)]
  pub root_cause: String,
  #[serde(default)]
  pub suggested_actions: Vec<String>,
  #[serde(default)]
  pub prevention_tips: Vec<String>,
}

// ---------------------------------------------------------------------------
// Rule matches (transient, borrowed from the rule table)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub struct RuleMatch<'a> {
  pub rule_id: &'a str,
  pub confidence: f64,
  pub result: &'a AnalysisResult,
}

// ---------------------------------------------------------------------------
// Provenance
// ---------------------------------------------------------------------------

/// Which component produced the final answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
  /// Confident rule match on the fast path.
  Rules(String),
  /// Best rule match of any confidence after the reasoning path failed.
  RulesFallback(String),
  Ai,
}

impl fmt::Display for Source {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Rules(id) => write!(f, "rules:{}", id),
      Self::RulesFallback(id) => write!(f, "rules_fallback:{}", id),
      Self::Ai => f.write_str("ai"),
    }
  }
}

impl Serialize for Source {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(self)
  }
}

// ---------------------------------------------------------------------------
// Request / response envelope (JSON contract)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisRequest {
  pub log: String,
}

impl AnalysisRequest {
  pub fn new(log: impl Into<String>) -> Self {
    Self { log: log.into() }
  }
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResponse {
  pub success: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub result: Option<AnalysisResult>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub source: Option<Source>,
  pub processed_at: DateTime<Utc>,
}

impl AnalysisResponse {
  pub fn resolved(result: AnalysisResult, source: Source) -> Self {
    Self {
      success: true,
      result: Some(result),
      error: None,
      source: Some(source),
      processed_at: Utc::now(),
    }
  }

  pub fn failed(message: impl Into<String>) -> Self {
    Self {
      success: false,
      result: None,
      error: Some(message.into()),
      source: None,
      processed_at: Utc::now(),
    }
  }
}
