//! Anthropic Messages API client

use std::time::{Duration, Instant};

use async_trait::async_trait;
use frugal_config::{BackendConfig, BackendKind};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use url::Url;

use super::{Generation, GenerationClient};
use crate::error::BackendError;

/// Default Anthropic API base URL
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";

/// Anthropic API version header value
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Paid cloud model client
pub struct CloudClient {
    name: String,
    client: Client,
    base_url: Url,
    api_key: Option<SecretString>,
    max_tokens: u32,
    input_per_mtok: f64,
    output_per_mtok: f64,
}

impl CloudClient {
    /// Create from backend configuration
    ///
    /// # Panics
    ///
    /// Panics if the hardcoded default base URL is invalid (should never happen).
    pub fn new(name: String, config: &BackendConfig) -> Self {
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| Url::parse(DEFAULT_BASE_URL).expect("valid default URL"));

        Self {
            name,
            client: Client::new(),
            base_url,
            api_key: config.api_key.clone(),
            max_tokens: config.max_tokens,
            input_per_mtok: config.input_per_mtok,
            output_per_mtok: config.output_per_mtok,
        }
    }

    fn messages_url(&self) -> String {
        let base = self.base_url.as_str().trim_end_matches('/');
        format!("{base}/messages")
    }

    #[allow(clippy::cast_precision_loss)]
    fn cost(&self, usage: &Usage) -> f64 {
        usage.input_tokens as f64 * self.input_per_mtok / 1_000_000.0
            + usage.output_tokens as f64 * self.output_per_mtok / 1_000_000.0
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: [Message<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    usage: Usage,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text {
        text: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: u64,
    output_tokens: u64,
}

impl MessagesResponse {
    fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text.as_str()),
                ContentBlock::Other => None,
            })
            .collect()
    }
}

#[async_trait]
impl GenerationClient for CloudClient {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Cloud
    }

    async fn generate(&self, prompt: &str, model: &str, timeout: Duration) -> Result<Generation, BackendError> {
        let Some(api_key) = &self.api_key else {
            tracing::warn!(backend = %self.name, "cloud backend has no API key");
            return Err(BackendError::Unavailable("no API key configured".to_owned()));
        };

        let start = Instant::now();
        let request = MessagesRequest {
            model,
            max_tokens: self.max_tokens,
            messages: [Message {
                role: "user",
                content: prompt,
            }],
        };

        let builder = self
            .client
            .post(self.messages_url())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("x-api-key", api_key.expose_secret())
            .json(&request);

        let response: MessagesResponse = super::send_json(&self.name, builder, timeout).await?;
        let text = super::non_empty(response.text())?;
        let cost = self.cost(&response.usage);

        Ok(Generation {
            text,
            input_tokens: response.usage.input_tokens,
            output_tokens: response.usage.output_tokens,
            latency: start.elapsed(),
            cost,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claude() -> CloudClient {
        let mut config = BackendConfig::new(BackendKind::Cloud, "claude-sonnet-4-20250514");
        config.input_per_mtok = 3.0;
        config.output_per_mtok = 15.0;
        CloudClient::new("claude".into(), &config)
    }

    #[test]
    fn cost_follows_token_prices() {
        let usage = Usage {
            input_tokens: 1_000,
            output_tokens: 500,
        };
        // 1000 * 3 / 1e6 + 500 * 15 / 1e6
        assert!((claude().cost(&usage) - 0.0105).abs() < 1e-12);
    }

    #[test]
    fn text_joins_text_blocks_only() {
        let response: MessagesResponse = serde_json::from_str(
            r#"{
                "content": [
                    {"type": "text", "text": "Hello"},
                    {"type": "tool_use", "id": "t1", "name": "x", "input": {}},
                    {"type": "text", "text": " world"}
                ],
                "usage": {"input_tokens": 5, "output_tokens": 2}
            }"#,
        )
        .unwrap();
        assert_eq!(response.text(), "Hello world");
    }

    #[test]
    fn default_base_url() {
        assert_eq!(claude().messages_url(), "https://api.anthropic.com/v1/messages");
    }

    #[tokio::test]
    async fn missing_key_fails_without_network() {
        let err = claude()
            .generate("hi", "claude-sonnet-4-20250514", Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Unavailable(_)));
    }
}
