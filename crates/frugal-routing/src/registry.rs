//! Backend registry with competence bands, cost, and latency profiles
//!
//! Built once from the `[backends]` configuration and read-only afterwards.

use std::cmp::Ordering;
use std::sync::LazyLock;
use std::time::Duration;

use frugal_config::{BackendConfig, BackendKind};
use indexmap::IndexMap;
use tiktoken_rs::{CoreBPE, o200k_base};

/// Input tokens assumed when deriving a nominal per-request cost
const NOMINAL_INPUT_TOKENS: usize = 500;

/// Output tokens assumed for every request when predicting cost
pub const EXPECTED_OUTPUT_TOKENS: usize = 500;

static BPE: LazyLock<Option<CoreBPE>> = LazyLock::new(|| o200k_base().ok());

/// Runtime profile of one backend
#[derive(Debug, Clone)]
pub struct Backend {
    /// Registry key, unique across backends
    pub id: String,
    pub kind: BackendKind,
    /// Model identifier sent to the backend
    pub model: String,
    /// Lowest complexity this backend is competent for
    pub min_complexity: f64,
    /// Highest complexity this backend is competent for
    pub max_complexity: f64,
    /// Expected USD cost of one request; always 0 for local kinds
    pub unit_cost_per_request: f64,
    /// Typical response latency
    pub latency_hint: Duration,
    /// Cost per million input tokens (USD)
    pub input_per_mtok: f64,
    /// Cost per million output tokens (USD)
    pub output_per_mtok: f64,
    /// Upper bound for one generate call
    pub timeout: Duration,
}

impl Backend {
    /// Build a runtime profile from configuration
    pub fn from_config(id: &str, config: &BackendConfig) -> Self {
        let mut backend = Self {
            id: id.to_owned(),
            kind: config.kind,
            model: config.model.clone(),
            min_complexity: config.min_complexity,
            max_complexity: config.max_complexity,
            unit_cost_per_request: 0.0,
            latency_hint: config.latency_hint,
            input_per_mtok: config.input_per_mtok,
            output_per_mtok: config.output_per_mtok,
            timeout: config.timeout,
        };

        if !backend.kind.is_local() {
            backend.unit_cost_per_request = config
                .unit_cost_per_request
                .unwrap_or_else(|| backend.estimate_cost(NOMINAL_INPUT_TOKENS, EXPECTED_OUTPUT_TOKENS));
        }

        backend
    }

    /// Whether `complexity` falls inside this backend's competence band
    pub fn covers(&self, complexity: f64) -> bool {
        (self.min_complexity..=self.max_complexity).contains(&complexity)
    }

    /// Estimate the cost of a request with the given token counts
    ///
    /// Local and ternary backends are free.
    #[allow(clippy::cast_precision_loss)]
    pub fn estimate_cost(&self, input_tokens: usize, output_tokens: usize) -> f64 {
        if self.kind.is_local() {
            return 0.0;
        }

        let input_cost = (input_tokens as f64 / 1_000_000.0) * self.input_per_mtok;
        let output_cost = (output_tokens as f64 / 1_000_000.0) * self.output_per_mtok;
        input_cost + output_cost
    }

    /// Predicted cost of serving `prompt` on this backend
    pub fn predicted_cost(&self, prompt: &str) -> f64 {
        self.estimate_cost(estimate_tokens(prompt), EXPECTED_OUTPUT_TOKENS)
    }

    /// Cheapest first, then fastest
    pub fn cost_order(&self, other: &Self) -> Ordering {
        self.unit_cost_per_request
            .partial_cmp(&other.unit_cost_per_request)
            .unwrap_or(Ordering::Equal)
            .then_with(|| self.latency_hint.cmp(&other.latency_hint))
    }
}

/// Registry of all routable backends, in configuration order
#[derive(Debug, Default)]
pub struct BackendRegistry {
    backends: Vec<Backend>,
}

impl BackendRegistry {
    /// Build a registry from configuration
    ///
    /// Ternary backends are only registered when `ternary_enabled` is set.
    pub fn from_config(configs: &IndexMap<String, BackendConfig>, ternary_enabled: bool) -> Self {
        let backends = configs
            .iter()
            .filter(|(id, config)| {
                let keep = ternary_enabled || config.kind != BackendKind::Ternary;
                if !keep {
                    tracing::debug!(backend = %id, "ternary backend skipped, ternary routing disabled");
                }
                keep
            })
            .map(|(id, config)| Backend::from_config(id, config))
            .collect();

        Self { backends }
    }

    /// All registered backends
    pub fn backends(&self) -> &[Backend] {
        &self.backends
    }

    /// Find a backend by id
    pub fn get(&self, id: &str) -> Option<&Backend> {
        self.backends.iter().find(|b| b.id == id)
    }

    /// Backends sorted cheapest first, ties broken by latency hint
    pub fn by_cost(&self) -> Vec<&Backend> {
        let mut sorted: Vec<&Backend> = self.backends.iter().collect();
        sorted.sort_by(|a, b| a.cost_order(b));
        sorted
    }

    /// Cheapest backend of the given kind
    pub fn cheapest_of_kind(&self, kind: BackendKind) -> Option<&Backend> {
        self.by_cost().into_iter().find(|b| b.kind == kind)
    }
}

/// Estimate token count using tiktoken, falling back to four characters per token
pub fn estimate_tokens(text: &str) -> usize {
    BPE.as_ref()
        .map_or_else(|| text.len() / 4, |bpe| bpe.encode_with_special_tokens(text).len())
}
