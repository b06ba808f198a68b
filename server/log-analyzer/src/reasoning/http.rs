//! Shared HTTP plumbing for the network-backed strategies: one exchange,
//! cancellation, and status classification into the error taxonomy.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::AnalyzerError;
use crate::reasoning::extract::excerpt;

const EXCERPT_CHARS: usize = 200;

pub(crate) fn build_client(timeout: Duration) -> Result<reqwest::Client, AnalyzerError> {
  reqwest::Client::builder()
    .timeout(timeout)
    .build()
    .map_err(|e| AnalyzerError::invalid_config(format!("http client: {}", e)))
}

/// Send one request and return the body of a 2xx reply.
pub(crate) async fn send(
  cancel: &CancellationToken,
  request: reqwest::RequestBuilder,
) -> Result<String, AnalyzerError> {
  let exchange = async {
    let response = request.send().await.map_err(transport_error)?;
    let status = response.status().as_u16();
    let body = response.text().await.map_err(transport_error)?;
    if !(200..300).contains(&status) {
      return Err(classify_status(status, &body));
    }
    Ok(body)
  };

  tokio::select! {
    _ = cancel.cancelled() => Err(AnalyzerError::Cancelled),
    result = exchange => result,
  }
}

/// Status probe for health checks: any failure means unavailable.
pub(crate) async fn probe(
  cancel: &CancellationToken,
  request: reqwest::RequestBuilder,
) -> Result<(), AnalyzerError> {
  match send(cancel, request).await {
    Ok(_) => Ok(()),
    Err(AnalyzerError::Cancelled) => Err(AnalyzerError::Cancelled),
    Err(e) => Err(AnalyzerError::unavailable(format!("health check failed: {}", e))),
  }
}

/// 429 and 5xx are retryable; every other non-2xx status is final.
pub fn classify_status(status: u16, body: &str) -> AnalyzerError {
  match status {
    429 => AnalyzerError::RateLimited,
    401 | 403 => AnalyzerError::rejected(status, "authentication failed: check your API key"),
    400 => AnalyzerError::rejected(status, format!("bad request: {}", excerpt(body, EXCERPT_CHARS))),
    404 => AnalyzerError::rejected(status, "model not found: check model name in configuration"),
    s if s >= 500 => AnalyzerError::unavailable(format!("status {}", s)),
    s => AnalyzerError::rejected(s, excerpt(body, EXCERPT_CHARS)),
  }
}

fn transport_error(err: reqwest::Error) -> AnalyzerError {
  if err.is_timeout() {
    return AnalyzerError::ReasoningTimeout;
  }
  // URLs may carry the API key as a query parameter.
  AnalyzerError::unavailable(err.without_url().to_string())
}

/// Mask a `key=` query parameter for logging.
pub fn mask_api_key(url: &str) -> String {
  let Some(idx) = url.find("key=") else {
    return url.to_string();
  };
  let value_start = idx + "key=".len();
  match url[value_start..].find('&') {
    Some(end) => format!("{}***{}", &url[..value_start], &url[value_start + end..]),
    None => format!("{}***", &url[..value_start]),
  }
}
