//! OpenAI-compatible chat-completions strategy.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::ReasoningConfig;
use crate::error::AnalyzerError;
use crate::reasoning::extract::decode_reply;
use crate::reasoning::{http, PromptBuilder, ReasoningClient, RetryPolicy};
use crate::types::AnalysisResult;
use crate::validate::ResponseValidator;

const TEMPERATURE: f64 = 0.1;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
  model: &'a str,
  messages: [ChatMessage<'a>; 2],
  max_tokens: u32,
  temperature: f64,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
  role: &'static str,
  content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
  #[serde(default)]
  choices: Vec<Choice>,
  error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct Choice {
  message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
  #[serde(default)]
  content: String,
}

#[derive(Debug, Deserialize)]
struct ApiError {
  #[serde(default)]
  message: String,
  #[serde(default, rename = "type")]
  kind: String,
}

pub struct OpenAiClient {
  http: reqwest::Client,
  base_url: String,
  api_key: String,
  model: String,
  max_tokens: u32,
  policy: RetryPolicy,
  prompt: PromptBuilder,
  validator: Arc<dyn ResponseValidator>,
}

impl OpenAiClient {
  pub fn new(
    cfg: &ReasoningConfig,
    prompt: PromptBuilder,
    validator: Arc<dyn ResponseValidator>,
  ) -> Result<Self, AnalyzerError> {
    let api_key = cfg
      .api_key
      .clone()
      .ok_or_else(|| AnalyzerError::invalid_config("AI_API_KEY is required for the openai provider"))?;
    Ok(Self {
      http: http::build_client(cfg.timeout)?,
      base_url: cfg.base_url.trim_end_matches('/').to_string(),
      api_key,
      model: cfg.model.clone(),
      max_tokens: cfg.max_tokens,
      policy: RetryPolicy::new(cfg.max_retries, cfg.backoff_unit),
      prompt,
      validator,
    })
  }

  async fn attempt(
    &self,
    cancel: &CancellationToken,
    attempt: u32,
    request: &ChatRequest<'_>,
  ) -> Result<AnalysisResult, AnalyzerError> {
    debug!(attempt, "sending chat completion request");
    let builder = self
      .http
      .post(format!("{}/chat/completions", self.base_url))
      .bearer_auth(&self.api_key)
      .json(request);
    let body = http::send(cancel, builder).await?;
    let content = reply_content(&body)?;
    decode_reply(&content, self.validator.as_ref())
  }
}

/// Reply text of the first choice.
fn reply_content(body: &str) -> Result<String, AnalyzerError> {
  let parsed: ChatResponse = serde_json::from_str(body)
    .map_err(|e| AnalyzerError::invalid_response(format!("malformed chat response: {}", e)))?;
  if let Some(err) = parsed.error {
    return Err(AnalyzerError::rejected(200, format!("{}: {}", err.kind, err.message)));
  }
  parsed
    .choices
    .into_iter()
    .next()
    .map(|c| c.message.content)
    .ok_or_else(|| AnalyzerError::invalid_response("reply has no choices"))
}

#[async_trait]
impl ReasoningClient for OpenAiClient {
  async fn analyze(&self, cancel: &CancellationToken, log: &str) -> Result<AnalysisResult, AnalyzerError> {
    let started = Instant::now();
    let user = self.prompt.user_prompt(log);
    let request = ChatRequest {
      model: &self.model,
      messages: [
        ChatMessage {
          role: "system",
          content: self.prompt.system_prompt(),
        },
        ChatMessage {
          role: "user",
          content: &user,
        },
      ],
      max_tokens: self.max_tokens,
      temperature: TEMPERATURE,
    };

    let request = &request;
    let result = self
      .policy
      .run(cancel, move |n| self.attempt(cancel, n, request))
      .await?;
    debug!(
      elapsed_ms = started.elapsed().as_millis() as u64,
      error_type = %result.error_type,
      "chat completion analysis finished"
    );
    Ok(result)
  }

  async fn health_check(&self, cancel: &CancellationToken) -> Result<(), AnalyzerError> {
    let builder = self
      .http
      .get(format!("{}/models", self.base_url))
      .bearer_auth(&self.api_key);
    http::probe(cancel, builder).await
  }

  fn name(&self) -> &'static str {
    "openai"
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn first_choice_content_is_returned() {
    let body = r#"{"id":"c1","choices":[{"message":{"role":"assistant","content":"{\"a\":1}"},"finish_reason":"stop"},{"message":{"content":"second"}}]}"#;
    assert_eq!(reply_content(body).unwrap(), r#"{"a":1}"#);
  }

  #[test]
  fn body_level_error_is_fatal() {
    let body = r#"{"error":{"message":"quota exceeded","type":"insufficient_quota"}}"#;
    let err = reply_content(body).unwrap_err();
    assert!(!err.is_retryable());
    assert!(err.to_string().contains("insufficient_quota: quota exceeded"));
  }

  #[test]
  fn empty_choices_is_fatal() {
    let err = reply_content(r#"{"choices":[]}"#).unwrap_err();
    assert!(matches!(err, AnalyzerError::InvalidReasoningResponse(_)));
  }

  #[test]
  fn request_serializes_in_chat_shape() {
    let request = ChatRequest {
      model: "gpt-4o-mini",
      messages: [
        ChatMessage {
          role: "system",
          content: "sys",
        },
        ChatMessage {
          role: "user",
          content: "usr",
        },
      ],
      max_tokens: 1024,
      temperature: TEMPERATURE,
    };
    let v = serde_json::to_value(&request).unwrap();
    assert_eq!(v["model"], "gpt-4o-mini");
    assert_eq!(v["messages"][0]["role"], "system");
    assert_eq!(v["messages"][1]["content"], "usr");
    assert_eq!(v["max_tokens"], 1024);
    assert_eq!(v["temperature"], 0.1);
  }
}
