//! Service configuration with sane defaults, overridable from the environment.

use std::net::SocketAddr;
use std::time::Duration;

use crate::error::AnalyzerError;

#[derive(Debug, Clone, Default)]
pub struct Config {
  pub server: ServerConfig,
  pub reasoning: ReasoningConfig,
  pub processing: ProcessingConfig,
  pub logging: LoggingConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
  pub bind_address: String,
  pub port: u16,
  /// Overall deadline for one analysis request, retries included.
  pub request_timeout: Duration,
  pub max_body_bytes: usize,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      bind_address: "0.0.0.0".into(),
      port: 8080,
      request_timeout: Duration::from_secs(60),
      max_body_bytes: 1024 * 1024,
    }
  }
}

impl ServerConfig {
  pub fn socket_addr(&self) -> Result<SocketAddr, AnalyzerError> {
    format!("{}:{}", self.bind_address, self.port)
      .parse()
      .map_err(|e| AnalyzerError::invalid_config(format!("BIND_ADDRESS/PORT: {}", e)))
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
  OpenAi,
  Gemini,
}

impl Provider {
  /// Unknown names fall back to the OpenAI-compatible API.
  pub fn from_str_loose(s: &str) -> Self {
    match s.trim().to_ascii_lowercase().as_str() {
      "gemini" => Self::Gemini,
      _ => Self::OpenAi,
    }
  }

  pub fn default_base_url(self) -> &'static str {
    match self {
      Self::OpenAi => "https://api.openai.com/v1",
      Self::Gemini => "https://generativelanguage.googleapis.com",
    }
  }

  pub fn default_model(self) -> &'static str {
    match self {
      Self::OpenAi => "gpt-4o-mini",
      Self::Gemini => "gemini-2.0-flash",
    }
  }
}

/// External reasoning service settings.
#[derive(Debug, Clone)]
pub struct ReasoningConfig {
  pub provider: Provider,
  pub api_key: Option<String>,
  pub base_url: String,
  pub model: String,
  /// Per HTTP call.
  pub timeout: Duration,
  pub max_tokens: u32,
  pub max_retries: u32,
  /// Retry n waits n² of these.
  pub backoff_unit: Duration,
  /// Use the deterministic stand-in client instead of the network.
  pub mock_mode: bool,
}

impl Default for ReasoningConfig {
  fn default() -> Self {
    let provider = Provider::OpenAi;
    Self {
      provider,
      api_key: None,
      base_url: provider.default_base_url().into(),
      model: provider.default_model().into(),
      timeout: Duration::from_secs(30),
      max_tokens: 1024,
      max_retries: 2,
      backoff_unit: Duration::from_secs(1),
      mock_mode: false,
    }
  }
}

#[derive(Debug, Clone)]
pub struct ProcessingConfig {
  /// Sanitizer ceiling in bytes.
  pub max_log_size: usize,
  pub enable_rules: bool,
  /// Minimum rule confidence (0..1) to skip the reasoning service.
  pub rule_confidence_threshold: f64,
}

impl Default for ProcessingConfig {
  fn default() -> Self {
    Self {
      max_log_size: 50_000,
      enable_rules: true,
      rule_confidence_threshold: 0.8,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
  Json,
  Pretty,
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
  pub level: String,
  pub format: LogFormat,
}

impl Default for LoggingConfig {
  fn default() -> Self {
    Self {
      level: "info".into(),
      format: LogFormat::Pretty,
    }
  }
}

impl Config {
  /// Load from `.env` (if present) and the process environment, then validate.
  pub fn from_env() -> Result<Self, AnalyzerError> {
    dotenvy::dotenv().ok();
    Self::from_lookup(|key| std::env::var(key).ok())
  }

  /// Build from an arbitrary key lookup. Empty values count as unset.
  pub fn from_lookup<F>(lookup: F) -> Result<Self, AnalyzerError>
  where
    F: Fn(&str) -> Option<String>,
  {
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
    let defaults = Config::default();

    let provider = get("AI_PROVIDER")
      .map(|p| Provider::from_str_loose(&p))
      .unwrap_or(defaults.reasoning.provider);

    let config = Config {
      server: ServerConfig {
        bind_address: get("BIND_ADDRESS").unwrap_or(defaults.server.bind_address),
        port: parse_or(get("PORT"), defaults.server.port),
        request_timeout: duration_or(get("REQUEST_TIMEOUT"), defaults.server.request_timeout),
        max_body_bytes: parse_or(get("MAX_BODY_BYTES"), defaults.server.max_body_bytes),
      },
      reasoning: ReasoningConfig {
        provider,
        api_key: get("AI_API_KEY"),
        base_url: get("AI_BASE_URL").unwrap_or_else(|| provider.default_base_url().into()),
        model: get("AI_MODEL").unwrap_or_else(|| provider.default_model().into()),
        timeout: duration_or(get("AI_TIMEOUT"), defaults.reasoning.timeout),
        max_tokens: parse_or(get("AI_MAX_TOKENS"), defaults.reasoning.max_tokens),
        max_retries: parse_or(get("AI_MAX_RETRIES"), defaults.reasoning.max_retries),
        backoff_unit: duration_or(get("AI_BACKOFF_UNIT"), defaults.reasoning.backoff_unit),
        mock_mode: bool_or(get("AI_MOCK_MODE"), defaults.reasoning.mock_mode),
      },
      processing: ProcessingConfig {
        max_log_size: parse_or(get("MAX_LOG_SIZE"), defaults.processing.max_log_size),
        enable_rules: bool_or(get("ENABLE_RULES"), defaults.processing.enable_rules),
        rule_confidence_threshold: parse_or(
          get("RULE_CONFIDENCE_THRESHOLD"),
          defaults.processing.rule_confidence_threshold,
        ),
      },
      logging: LoggingConfig {
        level: get("LOG_LEVEL").unwrap_or(defaults.logging.level),
        format: match get("LOG_FORMAT").map(|f| f.to_ascii_lowercase()).as_deref() {
          Some("json") => LogFormat::Json,
          _ => LogFormat::Pretty,
        },
      },
    };

    config.validate()?;
    Ok(config)
  }

  pub fn validate(&self) -> Result<(), AnalyzerError> {
    let r = &self.reasoning;
    if !r.mock_mode && r.api_key.is_none() {
      return Err(AnalyzerError::invalid_config(
        "AI_API_KEY is required when not in mock mode",
      ));
    }
    if r.timeout < Duration::from_secs(1) {
      return Err(AnalyzerError::invalid_config("AI_TIMEOUT must be at least 1 second"));
    }
    if r.max_tokens < 100 {
      return Err(AnalyzerError::invalid_config("AI_MAX_TOKENS must be at least 100"));
    }
    let p = &self.processing;
    if p.max_log_size < 1000 {
      return Err(AnalyzerError::invalid_config(
        "MAX_LOG_SIZE must be at least 1000 bytes",
      ));
    }
    if !(0.0..=1.0).contains(&p.rule_confidence_threshold) {
      return Err(AnalyzerError::invalid_config(
        "RULE_CONFIDENCE_THRESHOLD must be between 0 and 1",
      ));
    }
    self.server.socket_addr()?;
    Ok(())
  }
}

fn parse_or<T: std::str::FromStr>(raw: Option<String>, default: T) -> T {
  raw.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

fn bool_or(raw: Option<String>, default: bool) -> bool {
  match raw.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
    Some("1" | "t" | "true" | "yes" | "on") => true,
    Some("0" | "f" | "false" | "no" | "off") => false,
    _ => default,
  }
}

fn duration_or(raw: Option<String>, default: Duration) -> Duration {
  raw.and_then(|v| parse_duration(&v)).unwrap_or(default)
}

/// "15" (seconds), "500ms", "15s", "2m", "1h".
pub fn parse_duration(s: &str) -> Option<Duration> {
  let s = s.trim();
  if let Ok(secs) = s.parse::<u64>() {
    return Some(Duration::from_secs(secs));
  }
  let split = s.find(|c: char| !c.is_ascii_digit())?;
  let (num, unit) = s.split_at(split);
  let n: u64 = num.parse().ok()?;
  match unit {
    "ms" => Some(Duration::from_millis(n)),
    "s" => Some(Duration::from_secs(n)),
    "m" => n.checked_mul(60).map(Duration::from_secs),
    "h" => n.checked_mul(3600).map(Duration::from_secs),
    _ => None,
  }
}
