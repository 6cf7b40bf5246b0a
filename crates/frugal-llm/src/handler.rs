//! Axum route handlers for the routing API

use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router, routing};
use frugal_config::BackendKind;
use frugal_core::HttpError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::LlmError;
use crate::state::{ChatRequest, ResponseEnvelope, RouterState};

/// Audit entries returned when no limit is given
const DEFAULT_DECISIONS_LIMIT: usize = 50;

/// Build the router with all API endpoints
pub fn router_routes(state: RouterState) -> Router {
    Router::new()
        .route("/api/v1/chat", routing::post(chat))
        .route("/api/v1/complexity", routing::post(complexity))
        .route("/api/v1/stats", routing::get(stats))
        .route("/api/v1/decisions", routing::get(decisions))
        .with_state(state)
}

/// Wire shape of a served chat request
#[derive(Debug, Serialize)]
struct ChatResponse {
    response: String,
    model_used: String,
    backend: String,
    backend_kind: BackendKind,
    complexity_score: f64,
    cost: f64,
    latency_ms: f64,
    fallback_used: bool,
    request_id: Uuid,
}

impl From<ResponseEnvelope> for ChatResponse {
    fn from(envelope: ResponseEnvelope) -> Self {
        Self {
            response: envelope.text,
            model_used: envelope.model,
            backend: envelope.backend_used,
            backend_kind: envelope.backend_kind,
            complexity_score: envelope.complexity,
            cost: envelope.cost,
            latency_ms: envelope.latency.as_secs_f64() * 1000.0,
            fallback_used: envelope.fallback_used,
            request_id: envelope.request_id,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ComplexityRequest {
    prompt: String,
}

#[derive(Debug, Deserialize)]
struct DecisionsQuery {
    limit: Option<usize>,
}

/// Handle `POST /api/v1/chat`
async fn chat(State(state): State<RouterState>, Json(request): Json<ChatRequest>) -> Response {
    match state.handle(request).await {
        Ok(envelope) => Json(ChatResponse::from(envelope)).into_response(),
        Err(e) => error_response(e),
    }
}

/// Handle `POST /api/v1/complexity`
async fn complexity(State(state): State<RouterState>, Json(request): Json<ComplexityRequest>) -> Response {
    match state.estimate(&request.prompt) {
        Ok(report) => Json(report).into_response(),
        Err(e) => error_response(e),
    }
}

/// Handle `GET /api/v1/stats`
async fn stats(State(state): State<RouterState>) -> Response {
    Json(state.report()).into_response()
}

/// Handle `GET /api/v1/decisions`
async fn decisions(State(state): State<RouterState>, Query(query): Query<DecisionsQuery>) -> Response {
    let limit = query.limit.unwrap_or(DEFAULT_DECISIONS_LIMIT);
    Json(state.recent(limit)).into_response()
}

/// Convert an error to a JSON error response
#[allow(clippy::needless_pass_by_value)]
fn error_response(error: LlmError) -> Response {
    let status = error.status_code();
    let body = serde_json::json!({
        "error": {
            "type": error.error_type(),
            "message": error.client_message(),
        }
    });

    (status, Json(body)).into_response()
}
