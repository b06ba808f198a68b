//! Gemini `generateContent` strategy.

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

const PROMPT_SEPARATOR: &str = "\n\n---\n\n";
const THINKING_MIN_TOKENS: u32 = 4096;

const SAFETY_CATEGORIES: [&str; 4] = [
  "HARM_CATEGORY_HARASSMENT",
  "HARM_CATEGORY_HATE_SPEECH",
  "HARM_CATEGORY_SEXUALLY_EXPLICIT",
  "HARM_CATEGORY_DANGEROUS_CONTENT",
];

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
  contents: [RequestContent<'a>; 1],
  generation_config: GenerationConfig,
  safety_settings: Vec<SafetySetting>,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
  role: &'static str,
  parts: [RequestPart<'a>; 1],
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
  text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
  temperature: f64,
  max_output_tokens: u32,
  top_p: f64,
  top_k: u32,
}

#[derive(Debug, Serialize)]
struct SafetySetting {
  category: &'static str,
  threshold: &'static str,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
  #[serde(default)]
  candidates: Vec<Candidate>,
  prompt_feedback: Option<PromptFeedback>,
  error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
  #[serde(default)]
  content: Option<CandidateContent>,
  #[serde(default)]
  finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
  #[serde(default)]
  parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
  #[serde(default)]
  text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
  #[serde(default)]
  block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
  #[serde(default)]
  code: u16,
  #[serde(default)]
  message: String,
  #[serde(default)]
  status: String,
}

pub struct GeminiClient {
  http: reqwest::Client,
  base_url: String,
  api_key: String,
  model: String,
  max_output_tokens: u32,
  policy: RetryPolicy,
  prompt: PromptBuilder,
  validator: Arc<dyn ResponseValidator>,
}

impl GeminiClient {
  pub fn new(
    cfg: &ReasoningConfig,
    prompt: PromptBuilder,
    validator: Arc<dyn ResponseValidator>,
  ) -> Result<Self, AnalyzerError> {
    let api_key = cfg
      .api_key
      .clone()
      .ok_or_else(|| AnalyzerError::invalid_config("AI_API_KEY is required for the gemini provider"))?;
    let max_output_tokens = output_token_budget(&cfg.model, cfg.max_tokens);
    if max_output_tokens != cfg.max_tokens {
      debug!(model = %cfg.model, max_output_tokens, "raised token limit for thinking model");
    }
    Ok(Self {
      http: http::build_client(cfg.timeout)?,
      base_url: cfg.base_url.trim_end_matches('/').to_string(),
      api_key,
      model: cfg.model.clone(),
      max_output_tokens,
      policy: RetryPolicy::new(cfg.max_retries, cfg.backoff_unit),
      prompt,
      validator,
    })
  }

  fn generate_url(&self) -> String {
    generate_url(&self.base_url, &self.model, &self.api_key)
  }

  async fn attempt(
    &self,
    cancel: &CancellationToken,
    attempt: u32,
    url: &str,
    request: &GenerateRequest<'_>,
  ) -> Result<AnalysisResult, AnalyzerError> {
    debug!(attempt, url = %http::mask_api_key(url), "sending generateContent request");
    let body = http::send(cancel, self.http.post(url).json(request)).await?;
    let content = reply_text(&body)?;
    decode_reply(&content, self.validator.as_ref())
  }
}

/// Thinking tokens count against the output limit on these models.
pub fn is_thinking_model(model: &str) -> bool {
  let model = model.to_ascii_lowercase();
  model.contains("2.5") || model.contains("thinking") || model.contains("reasoning")
}

fn output_token_budget(model: &str, max_tokens: u32) -> u32 {
  if is_thinking_model(model) {
    max_tokens.saturating_mul(4).max(THINKING_MIN_TOKENS)
  } else {
    max_tokens
  }
}

/// `{base}/models`, adding `/v1beta` unless the base already names an API version.
fn models_url(base_url: &str) -> String {
  let base = base_url.trim_end_matches('/');
  if base.contains("/v1") {
    format!("{}/models", base)
  } else {
    format!("{}/v1beta/models", base)
  }
}

pub fn generate_url(base_url: &str, model: &str, api_key: &str) -> String {
  format!("{}/{}:generateContent?key={}", models_url(base_url), model, api_key)
}

pub fn list_models_url(base_url: &str, api_key: &str) -> String {
  format!("{}?key={}", models_url(base_url), api_key)
}

/// Concatenated text parts of the first candidate.
fn reply_text(body: &str) -> Result<String, AnalyzerError> {
  let parsed: GenerateResponse = serde_json::from_str(body)
    .map_err(|e| AnalyzerError::invalid_response(format!("malformed generateContent response: {}", e)))?;

  if let Some(err) = parsed.error {
    return Err(AnalyzerError::rejected(
      err.code,
      format!("{}: {}", err.status, err.message),
    ));
  }
  if let Some(reason) = parsed.prompt_feedback.and_then(|f| f.block_reason) {
    if !reason.is_empty() {
      return Err(AnalyzerError::rejected(200, format!("prompt blocked: {}", reason)));
    }
  }

  let candidate = parsed
    .candidates
    .into_iter()
    .next()
    .ok_or_else(|| AnalyzerError::invalid_response("reply has no candidates"))?;
  let finish_reason = candidate.finish_reason.unwrap_or_default();
  if finish_reason == "SAFETY" {
    return Err(AnalyzerError::rejected(200, "response blocked by safety filter"));
  }

  let parts = candidate.content.map(|c| c.parts).unwrap_or_default();
  if parts.is_empty() {
    return Err(AnalyzerError::invalid_response(format!(
      "candidate has no content parts (finish reason: {})",
      finish_reason
    )));
  }
  let text: String = parts.into_iter().filter_map(|p| p.text).collect();
  if text.is_empty() {
    return Err(AnalyzerError::invalid_response("candidate text is empty"));
  }
  Ok(text)
}

#[async_trait]
impl ReasoningClient for GeminiClient {
  async fn analyze(&self, cancel: &CancellationToken, log: &str) -> Result<AnalysisResult, AnalyzerError> {
    let started = Instant::now();
    let combined = format!(
      "{}{}{}",
      self.prompt.system_prompt(),
      PROMPT_SEPARATOR,
      self.prompt.user_prompt(log)
    );
    let request = GenerateRequest {
      contents: [RequestContent {
        role: "user",
        parts: [RequestPart { text: &combined }],
      }],
      generation_config: GenerationConfig {
        temperature: 0.1,
        max_output_tokens: self.max_output_tokens,
        top_p: 0.95,
        top_k: 40,
      },
      safety_settings: SAFETY_CATEGORIES
        .iter()
        .map(|&category| SafetySetting {
          category,
          threshold: "BLOCK_NONE",
        })
        .collect(),
    };
    let url = self.generate_url();

    let (url, request) = (url.as_str(), &request);
    let result = self
      .policy
      .run(cancel, move |n| self.attempt(cancel, n, url, request))
      .await?;
    debug!(
      elapsed_ms = started.elapsed().as_millis() as u64,
      error_type = %result.error_type,
      "generateContent analysis finished"
    );
    Ok(result)
  }

  async fn health_check(&self, cancel: &CancellationToken) -> Result<(), AnalyzerError> {
    let url = list_models_url(&self.base_url, &self.api_key);
    http::probe(cancel, self.http.get(url)).await
  }

  fn name(&self) -> &'static str {
    "gemini"
  }
}
