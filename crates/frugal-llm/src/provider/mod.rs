//! Generation clients for each backend kind

pub mod cloud;
pub mod local;
pub mod ternary;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use frugal_config::{BackendConfig, BackendKind};
use http::StatusCode;
use http::header::RETRY_AFTER;
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;

use crate::error::{BackendError, LlmError};

/// A completed generation
#[derive(Debug, Clone)]
pub struct Generation {
    pub text: String,
    pub input_tokens: u64,
    /// Completion tokens, the response's token count
    pub output_tokens: u64,
    pub latency: Duration,
    /// Charged cost (USD); always 0 for local and ternary backends
    pub cost: f64,
}

/// Trait implemented by each backend client
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Backend id from configuration
    fn name(&self) -> &str;

    fn kind(&self) -> BackendKind;

    /// Generate a completion for `prompt` on `model` within `timeout`
    async fn generate(&self, prompt: &str, model: &str, timeout: Duration) -> Result<Generation, BackendError>;
}

/// Build the client matching a backend's kind
pub fn build_client(id: &str, config: &BackendConfig) -> Result<Arc<dyn GenerationClient>, LlmError> {
    let client: Arc<dyn GenerationClient> = match config.kind {
        BackendKind::Local => Arc::new(local::LocalClient::new(id.to_owned(), config)?),
        BackendKind::Ternary => Arc::new(ternary::TernaryClient::new(id.to_owned(), config)?),
        BackendKind::Cloud => Arc::new(cloud::CloudClient::new(id.to_owned(), config)),
    };

    Ok(client)
}

/// Send a request and decode a JSON body, classifying every failure
pub(crate) async fn send_json<T: DeserializeOwned>(
    backend: &str,
    builder: RequestBuilder,
    timeout: Duration,
) -> Result<T, BackendError> {
    let response = builder.timeout(timeout).send().await.map_err(|e| {
        tracing::warn!(backend = %backend, error = %e, "backend request failed");
        classify_transport(&e, timeout)
    })?;

    if !response.status().is_success() {
        let status = response.status();
        let retry_after = retry_after(&response);
        let body = response.text().await.unwrap_or_default();
        tracing::warn!(backend = %backend, status = %status, "backend returned error");
        return Err(classify_status(status, retry_after, &body, timeout));
    }

    response.json().await.map_err(|e| {
        if e.is_timeout() {
            BackendError::Timeout(timeout)
        } else {
            BackendError::InvalidResponse(format!("failed to decode response: {e}"))
        }
    })
}

pub(crate) fn classify_transport(error: &reqwest::Error, timeout: Duration) -> BackendError {
    if error.is_timeout() {
        BackendError::Timeout(timeout)
    } else {
        BackendError::Unavailable(error.to_string())
    }
}

/// Map a non-success HTTP status to a backend failure
pub(crate) fn classify_status(
    status: StatusCode,
    retry_after: Option<u64>,
    body: &str,
    timeout: Duration,
) -> BackendError {
    match status {
        StatusCode::TOO_MANY_REQUESTS => BackendError::QuotaExceeded { retry_after },
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => BackendError::Timeout(timeout),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            BackendError::Unavailable(format!("backend rejected credentials ({status})"))
        }
        s if s.is_server_error() => BackendError::Unavailable(format!("backend returned {status}: {body}")),
        _ => BackendError::InvalidResponse(format!("backend returned {status}: {body}")),
    }
}

fn retry_after(response: &Response) -> Option<u64> {
    response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

/// Reject completions with no text
pub(crate) fn non_empty(text: String) -> Result<String, BackendError> {
    if text.trim().is_empty() {
        Err(BackendError::InvalidResponse("empty completion".to_owned()))
    } else {
        Ok(text)
    }
}
