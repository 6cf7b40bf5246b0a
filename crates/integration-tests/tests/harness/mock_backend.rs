//! Mock inference backend for integration tests
//!
//! One server speaks all three wire formats the router uses: the Ollama
//! generate API, the ternary runtime API, and the Anthropic Messages API.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router, routing};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

/// Text returned when no custom response is set
pub const DEFAULT_RESPONSE: &str = "Hello from mock backend";

/// Mock backend that returns predictable responses
pub struct MockBackend {
    addr: SocketAddr,
    shutdown: CancellationToken,
    state: Arc<MockState>,
}

struct MockState {
    request_count: AtomicU32,
    /// Number of requests to fail before succeeding
    fail_count: AtomicU32,
    fail_status: StatusCode,
    delay: Option<Duration>,
    response_content: String,
}

impl MockBackend {
    /// Start the mock server, returning immediately
    pub async fn start() -> anyhow::Result<Self> {
        Self::start_inner(0, StatusCode::OK, None, DEFAULT_RESPONSE).await
    }

    /// Start a mock server with a custom response content
    pub async fn start_with_response(content: &str) -> anyhow::Result<Self> {
        Self::start_inner(0, StatusCode::OK, None, content).await
    }

    /// Start a mock server that fails the first `n` requests with 503
    pub async fn start_failing(n: u32) -> anyhow::Result<Self> {
        Self::start_inner(n, StatusCode::SERVICE_UNAVAILABLE, None, DEFAULT_RESPONSE).await
    }

    /// Start a mock server that answers the first `n` requests with `status`
    pub async fn start_with_status(status: StatusCode, n: u32) -> anyhow::Result<Self> {
        Self::start_inner(n, status, None, DEFAULT_RESPONSE).await
    }

    /// Start a mock server that waits `delay` before every answer
    pub async fn start_slow(delay: Duration) -> anyhow::Result<Self> {
        Self::start_inner(0, StatusCode::OK, Some(delay), DEFAULT_RESPONSE).await
    }

    async fn start_inner(
        fail_count: u32,
        fail_status: StatusCode,
        delay: Option<Duration>,
        response_content: &str,
    ) -> anyhow::Result<Self> {
        let state = Arc::new(MockState {
            request_count: AtomicU32::new(0),
            fail_count: AtomicU32::new(fail_count),
            fail_status,
            delay,
            response_content: response_content.to_owned(),
        });

        let app = Router::new()
            .route("/api/generate", routing::post(handle_ollama))
            .route("/generate", routing::post(handle_ternary))
            .route("/health", routing::get(|| async { "ok" }))
            .route("/v1/messages", routing::post(handle_messages))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let shutdown = CancellationToken::new();
        let shutdown_clone = shutdown.clone();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    shutdown_clone.cancelled().await;
                })
                .await
                .ok();
        });

        Ok(Self { addr, shutdown, state })
    }

    /// Base URL for local and ternary backends
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Base URL for a cloud backend
    ///
    /// Includes `/v1` since the cloud client appends `/messages`
    pub fn cloud_base_url(&self) -> String {
        format!("http://{}/v1", self.addr)
    }

    /// Number of generation requests received
    pub fn request_count(&self) -> u32 {
        self.state.request_count.load(Ordering::Relaxed)
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

impl MockState {
    /// Count the request, apply the delay, and fail it if still scripted to
    async fn gate(&self) -> Option<Response> {
        self.request_count.fetch_add(1, Ordering::Relaxed);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let should_fail = self
            .fail_count
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1))
            .is_ok();

        should_fail.then(|| {
            let mut response = (
                self.fail_status,
                Json(serde_json::json!({"error": {"message": "mock failure"}})),
            )
                .into_response();
            if self.fail_status == StatusCode::TOO_MANY_REQUESTS {
                response
                    .headers_mut()
                    .insert("retry-after", axum::http::HeaderValue::from_static("30"));
            }
            response
        })
    }
}

#[derive(Debug, Deserialize)]
struct OllamaRequest {
    model: String,
    #[allow(dead_code)]
    prompt: String,
    #[serde(default)]
    stream: bool,
}

async fn handle_ollama(State(state): State<Arc<MockState>>, Json(request): Json<OllamaRequest>) -> Response {
    if let Some(failure) = state.gate().await {
        return failure;
    }

    assert!(!request.stream, "router must not request streaming");

    Json(serde_json::json!({
        "model": request.model,
        "response": state.response_content,
        "done": true,
        "prompt_eval_count": 5,
        "eval_count": 7,
    }))
    .into_response()
}

#[derive(Debug, Deserialize)]
struct TernaryRequest {
    #[allow(dead_code)]
    model: String,
    #[allow(dead_code)]
    prompt: String,
    max_tokens: u32,
}

async fn handle_ternary(State(state): State<Arc<MockState>>, Json(request): Json<TernaryRequest>) -> Response {
    if let Some(failure) = state.gate().await {
        return failure;
    }

    Json(serde_json::json!({
        "text": state.response_content,
        "prompt_tokens": 5,
        "completion_tokens": request.max_tokens.min(7),
        "inference_time_ms": 12.5,
    }))
    .into_response()
}

#[derive(Debug, Deserialize)]
struct MessagesRequest {
    model: String,
    #[allow(dead_code)]
    max_tokens: u32,
    #[allow(dead_code)]
    messages: Vec<serde_json::Value>,
}

async fn handle_messages(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(request): Json<MessagesRequest>,
) -> Response {
    if !headers.contains_key("x-api-key") || !headers.contains_key("anthropic-version") {
        return (StatusCode::UNAUTHORIZED, "missing credentials").into_response();
    }

    if let Some(failure) = state.gate().await {
        return failure;
    }

    Json(serde_json::json!({
        "id": "msg_mock",
        "type": "message",
        "role": "assistant",
        "model": request.model,
        "content": [{"type": "text", "text": state.response_content}],
        "stop_reason": "end_turn",
        "usage": {"input_tokens": 1000, "output_tokens": 500},
    }))
    .into_response()
}
