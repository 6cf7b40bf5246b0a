use std::fmt;
use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use url::Url;

/// Configuration for a single inference backend
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BackendConfig {
    /// Hosting class, which also selects the wire protocol
    pub kind: BackendKind,
    /// Model identifier passed to the backend
    pub model: String,
    /// Base URL; required for local and ternary backends
    #[serde(default)]
    pub base_url: Option<Url>,
    /// API key for cloud backends
    #[serde(default)]
    pub api_key: Option<SecretString>,
    /// Lowest complexity this backend is competent for
    #[serde(default)]
    pub min_complexity: f64,
    /// Highest complexity this backend is competent for
    #[serde(default = "default_max_complexity")]
    pub max_complexity: f64,
    /// Expected cost of one request in USD; derived from token prices when absent
    #[serde(default)]
    pub unit_cost_per_request: Option<f64>,
    /// Cost per million input tokens (USD)
    #[serde(default)]
    pub input_per_mtok: f64,
    /// Cost per million output tokens (USD)
    #[serde(default)]
    pub output_per_mtok: f64,
    /// Typical response latency, used to break cost ties
    #[serde(default = "default_latency_hint", deserialize_with = "crate::duration::deserialize")]
    pub latency_hint: Duration,
    /// Upper bound for a single generate call
    #[serde(default = "default_timeout", deserialize_with = "crate::duration::deserialize")]
    pub timeout: Duration,
    /// Completion token limit sent to the backend
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl BackendConfig {
    /// Minimal configuration for a backend of the given kind
    pub fn new(kind: BackendKind, model: impl Into<String>) -> Self {
        Self {
            kind,
            model: model.into(),
            base_url: None,
            api_key: None,
            min_complexity: 0.0,
            max_complexity: default_max_complexity(),
            unit_cost_per_request: None,
            input_per_mtok: 0.0,
            output_per_mtok: 0.0,
            latency_hint: default_latency_hint(),
            timeout: default_timeout(),
            max_tokens: default_max_tokens(),
        }
    }
}

/// Where a backend runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// On-box CPU model served by an Ollama-style runtime
    Local,
    /// Local ternary-quantized runtime
    Ternary,
    /// Paid cloud API
    Cloud,
}

impl BackendKind {
    /// Whether requests to this kind run on local hardware at zero marginal cost
    pub const fn is_local(self) -> bool {
        matches!(self, Self::Local | Self::Ternary)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Ternary => "ternary",
            Self::Cloud => "cloud",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const fn default_max_complexity() -> f64 {
    1.0
}

const fn default_latency_hint() -> Duration {
    Duration::from_secs(1)
}

const fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

const fn default_max_tokens() -> u32 {
    1024
}
