//! PushLog Log Analyzer: hybrid rules + reasoning-service log diagnosis.
//!
//! Raw log -> sanitizer -> rule engine (fast path) -> reasoning client ->
//! response validator -> envelope tagged with its provenance. When the
//! reasoning path fails, the best rule match of any confidence is used.
//!
//! Stateless per request; the rule table is built once and shared.

pub mod analyzer;
pub mod config;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod reasoning;
pub mod routes;
pub mod rules;
pub mod sanitize;
pub mod state;
pub mod telemetry;
pub mod types;
pub mod validate;

pub use analyzer::Analyzer;
pub use config::Config;
pub use engine::RuleEngine;
pub use error::AnalyzerError;
pub use reasoning::ReasoningClient;
pub use rules::{Rule, RuleTable};
pub use sanitize::{SanitizationStats, Sanitizer};
pub use state::AppState;
pub use types::{AnalysisRequest, AnalysisResponse, AnalysisResult, RuleMatch, Severity, Source};
pub use validate::{ResponseValidator, SchemaValidator};
