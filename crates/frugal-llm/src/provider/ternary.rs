//! Client for the ternary (1.58-bit) inference runtime

use std::time::{Duration, Instant};

use anyhow::anyhow;
use async_trait::async_trait;
use frugal_config::{BackendConfig, BackendKind};
use frugal_routing::registry::estimate_tokens;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use super::{Generation, GenerationClient};
use crate::error::{BackendError, LlmError};

pub struct TernaryClient {
    name: String,
    client: Client,
    base_url: Url,
    max_tokens: u32,
}

impl TernaryClient {
    /// Create from backend configuration
    ///
    /// # Errors
    ///
    /// Returns `LlmError::Internal` if no base URL is configured.
    pub fn new(name: String, config: &BackendConfig) -> Result<Self, LlmError> {
        let base_url = config
            .base_url
            .clone()
            .ok_or_else(|| anyhow!("ternary backend '{name}' has no base_url"))?;

        Ok(Self {
            name,
            client: Client::new(),
            base_url,
            max_tokens: config.max_tokens,
        })
    }

    fn generate_url(&self) -> String {
        let base = self.base_url.as_str().trim_end_matches('/');
        format!("{base}/generate")
    }
}

#[derive(Debug, Serialize)]
struct TernaryRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct TernaryResponse {
    text: String,
    #[serde(default)]
    prompt_tokens: Option<u64>,
    #[serde(default)]
    completion_tokens: Option<u64>,
}

#[async_trait]
impl GenerationClient for TernaryClient {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Ternary
    }

    async fn generate(&self, prompt: &str, model: &str, timeout: Duration) -> Result<Generation, BackendError> {
        let start = Instant::now();
        let request = TernaryRequest {
            model,
            prompt,
            max_tokens: self.max_tokens,
        };

        let builder = self.client.post(self.generate_url()).json(&request);
        let response: TernaryResponse = super::send_json(&self.name, builder, timeout).await?;
        let text = super::non_empty(response.text)?;

        Ok(Generation {
            input_tokens: response.prompt_tokens.unwrap_or_else(|| estimate_tokens(prompt) as u64),
            output_tokens: response
                .completion_tokens
                .unwrap_or_else(|| estimate_tokens(&text) as u64),
            text,
            latency: start.elapsed(),
            cost: 0.0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_carries_token_limit() {
        let request = TernaryRequest {
            model: "bitnet-b1.58-2b",
            prompt: "hi",
            max_tokens: 256,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["max_tokens"], 256);
        assert_eq!(json["model"], "bitnet-b1.58-2b");
    }

    #[test]
    fn response_decodes_runtime_stats() {
        let response: TernaryResponse = serde_json::from_str(
            r#"{"text":"hello","prompt_tokens":3,"completion_tokens":1,"inference_time_ms":12.5}"#,
        )
        .unwrap();
        assert_eq!(response.completion_tokens, Some(1));
    }
}
