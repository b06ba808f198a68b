//! Router and middleware stack.

use std::any::Any;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderName, HeaderValue, Method, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any as AnyOrigin, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info_span};
use uuid::Uuid;

use crate::handlers;
use crate::state::AppState;
use crate::types::AnalysisResponse;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Fresh v4 id unless the caller already sent one.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidRequestId;

impl MakeRequestId for UuidRequestId {
  fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
    HeaderValue::from_str(&Uuid::new_v4().to_string())
      .ok()
      .map(RequestId::new)
  }
}

pub fn router(state: Arc<AppState>, max_body_bytes: usize) -> Router {
  let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

  Router::new()
    .route("/health", get(handlers::health))
    .route("/ready", get(handlers::ready))
    .route("/api/v1/analyze", post(handlers::analyze))
    .route("/api/v1/ai/analyze-log", post(handlers::analyze))
    .with_state(state)
    // Layers added later wrap earlier ones: request-id is outermost.
    .layer(DefaultBodyLimit::disable())
    .layer(RequestBodyLimitLayer::new(max_body_bytes))
    .layer(cors(request_id.clone()))
    .layer(CatchPanicLayer::custom(panic_response))
    .layer(PropagateRequestIdLayer::new(request_id.clone()))
    .layer(TraceLayer::new_for_http().make_span_with(|req: &Request<axum::body::Body>| {
      let id = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-");
      info_span!("http", method = %req.method(), uri = %req.uri(), request_id = %id)
    }))
    .layer(SetRequestIdLayer::new(request_id, UuidRequestId))
}

fn cors(request_id: HeaderName) -> CorsLayer {
  CorsLayer::new()
    .allow_origin(AnyOrigin)
    .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
    .allow_headers([CONTENT_TYPE, AUTHORIZATION, request_id])
}

fn panic_response(payload: Box<dyn Any + Send + 'static>) -> Response {
  let detail = payload
    .downcast_ref::<&str>()
    .map(|s| s.to_string())
    .or_else(|| payload.downcast_ref::<String>().cloned())
    .unwrap_or_else(|| "unknown panic".into());
  error!(panic = %detail, "handler panicked");
  (
    StatusCode::INTERNAL_SERVER_ERROR,
    Json(AnalysisResponse::failed("Internal server error")),
  )
    .into_response()
}
