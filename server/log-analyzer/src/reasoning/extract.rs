//! Locate the JSON object inside a free-text model reply.
//!
//! Replies may be bare JSON, wrapped in prose, or fenced in a ```json block.
//! The first balanced top-level `{...}` wins; brace depth ignores braces that
//! appear inside JSON string literals.

use serde_json::Value;

use crate::error::AnalyzerError;
use crate::types::{AnalysisResult, RawAnalysis};
use crate::validate::ResponseValidator;

/// The first balanced `{...}` object that parses as JSON, if any.
pub fn extract_json(content: &str) -> Option<&str> {
  let trimmed = content.trim();
  if trimmed.starts_with('{') && serde_json::from_str::<Value>(trimmed).is_ok() {
    return Some(trimmed);
  }

  let start = content.find('{')?;
  let end = balanced_end(&content[start..])? + start;
  let candidate = &content[start..end];
  serde_json::from_str::<Value>(candidate)
    .ok()
    .filter(Value::is_object)
    .map(|_| candidate)
}

/// Byte offset just past the brace that closes the one at index 0.
fn balanced_end(s: &str) -> Option<usize> {
  let mut depth = 0usize;
  let mut in_string = false;
  let mut escaped = false;
  for (i, ch) in s.char_indices() {
    if in_string {
      match ch {
        _ if escaped => escaped = false,
        '\\' => escaped = true,
        '"' => in_string = false,
        _ => {}
      }
      continue;
    }
    match ch {
      '"' => in_string = true,
      '{' => depth += 1,
      '}' => {
        depth = depth.checked_sub(1)?;
        if depth == 0 {
          return Some(i + 1);
        }
      }
      _ => {}
    }
  }
  None
}

/// Extract, decode and validate a model reply. Every failure here is fatal.
pub fn decode_reply(
  content: &str,
  validator: &dyn ResponseValidator,
) -> Result<AnalysisResult, AnalyzerError> {
  let json = extract_json(content)
    .ok_or_else(|| AnalyzerError::invalid_response("no JSON object found in reply"))?;
  let raw: RawAnalysis = serde_json::from_str(json)
    .map_err(|e| AnalyzerError::invalid_response(format!("reply does not match schema: {}", e)))?;
  validator.accept(raw)
}

/// Cut to at most `max` chars, marking the cut. For log and error excerpts.
pub fn excerpt(s: &str, max: usize) -> String {
  match s.char_indices().nth(max) {
    Some((idx, _)) => format!("{}...", &s[..idx]),
    None => s.to_string(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::types::Severity;
  use crate::validate::SchemaValidator;

  const VALID: &str = r#"{"error_type":"test","severity":"Low","root_cause":"r","suggested_actions":["a"],"prevention_tips":[]}"#;

  #[test]
  fn bare_json_is_returned_whole() {
    assert_eq!(extract_json(VALID), Some(VALID));
  }

  #[test]
  fn fenced_block_inside_prose() {
    let reply = format!("Sure, here you go:\n```json\n{}\n```\nHope that helps!", VALID);
    assert_eq!(extract_json(&reply), Some(VALID));
  }

  #[test]
  fn nested_objects_use_brace_depth() {
    let reply = r#"Result: {"a": {"b": 1}, "c": 2} and then {"d": 3}"#;
    assert_eq!(extract_json(reply), Some(r#"{"a": {"b": 1}, "c": 2}"#));
  }

  #[test]
  fn braces_inside_strings_do_not_count() {
    let reply = r#"ok {"root_cause": "missing } in config {", "n": 1} trailing }"#;
    assert_eq!(extract_json(reply), Some(r#"{"root_cause": "missing } in config {", "n": 1}"#));
  }

  #[test]
  fn unbalanced_or_invalid_yields_none() {
    assert_eq!(extract_json("no json here"), None);
    assert_eq!(extract_json(r#"{"open": true"#), None);
    assert_eq!(extract_json("{not json}"), None);
  }

  #[test]
  fn decode_reply_accepts_wrapped_valid_object() {
    let reply = format!("Sure, here you go:\n```json\n{}\n```", VALID);
    let result = decode_reply(&reply, &SchemaValidator).unwrap();
    assert_eq!(result.error_type, "test");
    assert_eq!(result.severity, Severity::Low);
  }

  #[test]
  fn decode_reply_rejects_invalid_severity() {
    let reply = r#"{"error_type":"x","severity":"Critical","root_cause":"r","suggested_actions":["a"],"prevention_tips":[]}"#;
    let err = decode_reply(reply, &SchemaValidator).unwrap_err();
    assert!(matches!(err, AnalyzerError::InvalidReasoningResponse(_)));
    assert!(!err.is_retryable());
  }

  #[test]
  fn decode_reply_rejects_prose_only() {
    let err = decode_reply("I could not analyze this log.", &SchemaValidator).unwrap_err();
    assert!(err.to_string().contains("no JSON object"));
  }

  #[test]
  fn excerpt_marks_cut() {
    assert_eq!(excerpt("abcdef", 3), "abc...");
    assert_eq!(excerpt("abc", 3), "abc");
  }
}
