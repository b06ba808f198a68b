//! Rule engine: evaluates the rule table and picks the winning match.

use std::sync::Arc;

use tracing::debug;

use crate::rules::RuleTable;
use crate::types::RuleMatch;

/// Shares the rule table by reference; cloning the engine never copies rules.
#[derive(Debug, Clone)]
pub struct RuleEngine {
  table: Arc<RuleTable>,
  confidence_threshold: f64,
}

impl RuleEngine {
  pub fn new(table: Arc<RuleTable>, confidence_threshold: f64) -> Self {
    Self {
      table,
      confidence_threshold,
    }
  }

  pub fn confidence_threshold(&self) -> f64 {
    self.confidence_threshold
  }

  pub fn table(&self) -> &RuleTable {
    &self.table
  }

  /// Every matching rule, in table order.
  pub fn evaluate<'a>(&'a self, log: &str) -> Vec<RuleMatch<'a>> {
    let log_lower = log.to_lowercase();
    self
      .table
      .rules()
      .iter()
      .filter(|rule| rule.matches_prepared(log, &log_lower))
      .map(|rule| {
        debug!(rule_id = %rule.id, confidence = rule.confidence, "rule matched");
        RuleMatch {
          rule_id: &rule.id,
          confidence: rule.confidence,
          result: &rule.result,
        }
      })
      .collect()
  }

  /// Highest confidence at or above the threshold. Ties keep table order.
  pub fn best_match<'a>(&self, matches: &[RuleMatch<'a>]) -> Option<RuleMatch<'a>> {
    highest(
      matches
        .iter()
        .filter(|m| m.confidence >= self.confidence_threshold),
    )
  }

  /// Highest confidence regardless of the threshold. Ties keep table order.
  pub fn best_any<'a>(&self, matches: &[RuleMatch<'a>]) -> Option<RuleMatch<'a>> {
    highest(matches.iter())
  }

  pub fn should_use_rule_result(&self, matches: &[RuleMatch<'_>]) -> bool {
    self.best_match(matches).is_some()
  }
}

fn highest<'m, 'a: 'm>(matches: impl Iterator<Item = &'m RuleMatch<'a>>) -> Option<RuleMatch<'a>> {
  let mut best: Option<RuleMatch<'a>> = None;
  for m in matches {
    // Strictly greater: the first of equal confidences wins.
    if best.map_or(true, |b| m.confidence > b.confidence) {
      best = Some(*m);
    }
  }
  best
}
