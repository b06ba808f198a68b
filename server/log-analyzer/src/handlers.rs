//! HTTP handlers.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::Utc;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tracing::{info_span, Instrument};

use crate::routes::REQUEST_ID_HEADER;
use crate::state::AppState;
use crate::types::{AnalysisRequest, AnalysisResponse};

pub async fn health() -> Json<Value> {
  Json(json!({ "status": "healthy", "time": Utc::now().to_rfc3339() }))
}

pub async fn ready(State(state): State<Arc<AppState>>) -> (StatusCode, Json<Value>) {
  let client = state.analyzer.client();
  let (cancel, timer) = deadline(state.request_timeout);
  let outcome = client.health_check(&cancel).await;
  timer.abort();

  match outcome {
    Ok(()) => (
      StatusCode::OK,
      Json(json!({ "status": "ready", "reasoning": client.name(), "time": Utc::now().to_rfc3339() })),
    ),
    Err(e) => (
      StatusCode::SERVICE_UNAVAILABLE,
      Json(json!({ "status": "not_ready", "error": e.to_string(), "time": Utc::now().to_rfc3339() })),
    ),
  }
}

/// 200 when the envelope reports success, 422 otherwise.
pub async fn analyze(
  State(state): State<Arc<AppState>>,
  headers: HeaderMap,
  payload: Result<Json<AnalysisRequest>, JsonRejection>,
) -> (StatusCode, Json<AnalysisResponse>) {
  let request = match payload {
    Ok(Json(request)) => request,
    Err(rejection) => {
      let msg = format!("Invalid request body: {}", rejection.body_text());
      return (StatusCode::BAD_REQUEST, Json(AnalysisResponse::failed(msg)));
    }
  };

  let request_id = headers
    .get(REQUEST_ID_HEADER)
    .and_then(|v| v.to_str().ok())
    .unwrap_or("-")
    .to_string();
  let span = info_span!("analyze", request_id = %request_id, log_size = request.log.len());

  let (cancel, timer) = deadline(state.request_timeout);
  let response = state.analyzer.analyze(&cancel, &request).instrument(span).await;
  timer.abort();

  let status = if response.success {
    StatusCode::OK
  } else {
    StatusCode::UNPROCESSABLE_ENTITY
  };
  (status, Json(response))
}

/// A token that cancels itself after `timeout`. Abort the handle when done.
fn deadline(timeout: Duration) -> (CancellationToken, tokio::task::JoinHandle<()>) {
  let cancel = CancellationToken::new();
  let trigger = cancel.clone();
  let timer = tokio::spawn(async move {
    tokio::time::sleep(timeout).await;
    trigger.cancel();
  });
  (cancel, timer)
}
