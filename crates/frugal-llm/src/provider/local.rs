//! Ollama-style local model client

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

/// Client for a CPU-hosted model served with the Ollama generate API
pub struct LocalClient {
    name: String,
    client: Client,
    base_url: Url,
}

impl LocalClient {
    /// Create from backend configuration
    ///
    /// # Errors
    ///
    /// Returns `LlmError::Internal` if no base URL is configured.
    pub fn new(name: String, config: &BackendConfig) -> Result<Self, LlmError> {
        let base_url = config
            .base_url
            .clone()
            .ok_or_else(|| anyhow!("local backend '{name}' has no base_url"))?;

        Ok(Self {
            name,
            client: Client::new(),
            base_url,
        })
    }

    fn generate_url(&self) -> String {
        let base = self.base_url.as_str().trim_end_matches('/');
        format!("{base}/api/generate")
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
    #[serde(default)]
    prompt_eval_count: Option<u64>,
    #[serde(default)]
    eval_count: Option<u64>,
}

#[async_trait]
impl GenerationClient for LocalClient {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Local
    }

    async fn generate(&self, prompt: &str, model: &str, timeout: Duration) -> Result<Generation, BackendError> {
        let start = Instant::now();
        let request = GenerateRequest {
            model,
            prompt,
            stream: false,
        };

        let builder = self.client.post(self.generate_url()).json(&request);
        let response: GenerateResponse = super::send_json(&self.name, builder, timeout).await?;
        let text = super::non_empty(response.response)?;

        Ok(Generation {
            input_tokens: response
                .prompt_eval_count
                .unwrap_or_else(|| estimate_tokens(prompt) as u64),
            output_tokens: response.eval_count.unwrap_or_else(|| estimate_tokens(&text) as u64),
            text,
            latency: start.elapsed(),
            cost: 0.0,
        })
    }
}
