//! Request orchestration: validate, estimate, route, dispatch, record

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::anyhow;
use frugal_config::{BackendKind, Config};
use frugal_core::Prompt;
use frugal_ledger::{CostLedger, LedgerReport};
use frugal_routing::{
    AttemptRecord, Backend, BackendRegistry, ComplexityBand, ComplexityEstimator, ComplexityFactors, Dispatch,
    QuotaTracker, RequestOutcome, Router, RoutingDecision,
};
use serde::{Deserialize, Serialize, Serializer};
use uuid::Uuid;

use crate::error::{BackendError, LlmError};
use crate::provider::{self, Generation, GenerationClient};

/// One inference request
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub prompt: String,
    /// Backend id or model name to pin, bypassing complexity routing
    #[serde(default, alias = "model")]
    pub backend: Option<String>,
}

impl ChatRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            backend: None,
        }
    }
}

/// Answer returned to the caller
#[derive(Debug, Clone, Serialize)]
pub struct ResponseEnvelope {
    pub request_id: Uuid,
    pub text: String,
    pub backend_used: String,
    pub backend_kind: BackendKind,
    pub model: String,
    pub complexity: f64,
    pub cost: f64,
    /// Total time spent in backend calls, fallbacks included
    #[serde(rename = "latency_ms", serialize_with = "serialize_millis")]
    pub latency: Duration,
    pub fallback_used: bool,
}

/// Complexity analysis without dispatch
#[derive(Debug, Clone, Serialize)]
pub struct ComplexityReport {
    pub complexity_score: f64,
    pub factors: ComplexityFactors,
    pub reasoning: String,
    pub band: ComplexityBand,
    pub recommended_backend: Option<String>,
    pub predicted_cost: f64,
}

/// Shared state for the routing service
#[derive(Clone)]
pub struct RouterState {
    inner: Arc<RouterStateInner>,
}

struct RouterStateInner {
    estimator: ComplexityEstimator,
    router: Router,
    clients: HashMap<String, Arc<dyn GenerationClient>>,
    quota: QuotaTracker,
    ledger: Arc<CostLedger>,
    max_fallback_hops: usize,
    max_prompt_chars: usize,
}

impl RouterState {
    /// Build the state from configuration, constructing one client per backend
    ///
    /// # Errors
    ///
    /// Returns an error if the estimator or any client fails to initialize.
    pub fn from_config(config: &Config) -> Result<Self, LlmError> {
        let registry = BackendRegistry::from_config(&config.backends, config.router.ternary_enabled);

        let mut clients = HashMap::new();
        for backend in registry.backends() {
            let backend_config = config
                .backends
                .get(&backend.id)
                .ok_or_else(|| anyhow!("backend '{}' missing from configuration", backend.id))?;
            let client = provider::build_client(&backend.id, backend_config)?;
            tracing::debug!(backend = client.name(), kind = %client.kind(), "backend client ready");
            clients.insert(backend.id.clone(), client);
        }

        let ledger = Arc::new(CostLedger::from_config(&config.ledger));

        Self::with_clients(config, clients, ledger)
    }

    /// Build the state around caller-supplied clients and ledger
    ///
    /// # Errors
    ///
    /// Returns an error if the estimator configuration is invalid or a
    /// registered backend has no client.
    pub fn with_clients(
        config: &Config,
        clients: HashMap<String, Arc<dyn GenerationClient>>,
        ledger: Arc<CostLedger>,
    ) -> Result<Self, LlmError> {
        let estimator = ComplexityEstimator::new(&config.estimator)?;
        let registry = BackendRegistry::from_config(&config.backends, config.router.ternary_enabled);

        if let Some(orphan) = registry.backends().iter().find(|b| !clients.contains_key(&b.id)) {
            return Err(anyhow!("no client for backend '{}'", orphan.id).into());
        }

        tracing::info!(
            backends = registry.backends().len(),
            ternary_enabled = config.router.ternary_enabled,
            max_fallback_hops = config.router.max_fallback_hops,
            "router initialized"
        );

        Ok(Self {
            inner: Arc::new(RouterStateInner {
                estimator,
                router: Router::new(registry, &config.router),
                clients,
                quota: QuotaTracker::from_config(&config.router.quota),
                ledger,
                max_fallback_hops: config.router.max_fallback_hops,
                max_prompt_chars: config.router.max_prompt_chars,
            }),
        })
    }

    /// Serve one request end to end
    ///
    /// The outcome is recorded in the ledger whether or not a backend
    /// answered. A request that yields no answer never returns partial text.
    ///
    /// The work runs on its own task: dropping the returned future abandons
    /// the answer, but in-flight backend calls run to completion or timeout
    /// and the outcome is still recorded.
    pub async fn handle(&self, request: ChatRequest) -> Result<ResponseEnvelope, LlmError> {
        let state = self.clone();
        tokio::spawn(async move { state.serve(request).await })
            .await
            .map_err(|e| LlmError::Internal(anyhow!("request task failed: {e}")))?
    }

    async fn serve(&self, request: ChatRequest) -> Result<ResponseEnvelope, LlmError> {
        let prompt = self.validate(&request.prompt)?;
        let estimate = self.inner.estimator.estimate(prompt.text());

        let decision = match request.backend.as_deref() {
            Some(name) => {
                let id = self.resolve_backend(name);
                self.inner.router.decide_manual(&prompt, &estimate, id)?
            }
            None => self.inner.router.decide(&prompt, &estimate),
        };

        let mut dispatch = Dispatch::new(self.inner.max_fallback_hops);
        dispatch.score()?;

        let served = if decision.candidates.is_empty() {
            tracing::warn!(
                request_id = %decision.request_id,
                complexity = decision.complexity,
                "no competent backend for request"
            );
            dispatch.exhaust()?;
            None
        } else {
            dispatch.select()?;
            self.dispatch_candidates(&mut dispatch, &decision, prompt.text()).await?
        };

        let outcome = dispatch.into_outcome(decision);
        self.inner.ledger.record(&outcome);

        match served {
            Some((generation, model)) => Ok(envelope(&outcome, generation, model)),
            None => {
                let attempts = outcome.dispatched_attempts().count();
                tracing::error!(
                    request_id = %outcome.decision.request_id,
                    attempts,
                    last_error = outcome.error.map_or("none", |e| e.as_str()),
                    "all backends failed"
                );
                Err(LlmError::AllBackendsFailed {
                    attempts,
                    last_error: outcome.error,
                })
            }
        }
    }

    /// Score a prompt and preview where it would go, without dispatching
    pub fn estimate(&self, prompt: &str) -> Result<ComplexityReport, LlmError> {
        let prompt = self.validate(prompt)?;
        let estimate = self.inner.estimator.estimate(prompt.text());
        let candidates = self.inner.router.route(estimate.complexity);
        let recommended = candidates.first();

        Ok(ComplexityReport {
            complexity_score: estimate.complexity,
            band: self.inner.router.band(estimate.complexity),
            recommended_backend: recommended.map(|b| b.id.clone()),
            predicted_cost: recommended.map_or(0.0, |b| b.predicted_cost(prompt.text())),
            factors: estimate.factors,
            reasoning: estimate.reasoning,
        })
    }

    pub fn report(&self) -> LedgerReport {
        self.inner.ledger.report()
    }

    /// Newest recorded outcomes first
    pub fn recent(&self, limit: usize) -> Vec<RequestOutcome> {
        self.inner.ledger.recent(limit)
    }

    /// Registered backends in configuration order
    pub fn backends(&self) -> &[Backend] {
        self.inner.router.registry().backends()
    }

    /// Backends currently bypassed for quota exhaustion
    pub fn quota_blocked(&self) -> Vec<String> {
        self.inner.quota.blocked()
    }

    fn validate(&self, text: &str) -> Result<Prompt, LlmError> {
        let prompt = Prompt::new(text);

        if prompt.is_blank() {
            return Err(LlmError::InvalidInput("prompt must not be empty".to_owned()));
        }

        let chars = prompt.char_count();
        if chars > self.inner.max_prompt_chars {
            return Err(LlmError::InvalidInput(format!(
                "prompt is {chars} characters, limit is {}",
                self.inner.max_prompt_chars
            )));
        }

        Ok(prompt)
    }

    /// Accept either a backend id or a model name
    fn resolve_backend<'a>(&'a self, name: &'a str) -> &'a str {
        let registry = self.inner.router.registry();
        if registry.get(name).is_some() {
            return name;
        }

        registry
            .backends()
            .iter()
            .find(|b| b.model == name)
            .map_or(name, |b| b.id.as_str())
    }

    /// Try candidates in order until one answers or the hop budget runs out
    async fn dispatch_candidates(
        &self,
        dispatch: &mut Dispatch,
        decision: &RoutingDecision,
        prompt: &str,
    ) -> Result<Option<(Generation, String)>, LlmError> {
        for id in &decision.candidates {
            let Some(backend) = self.inner.router.registry().get(id) else {
                continue;
            };

            if self.inner.quota.is_blocked(id) {
                tracing::warn!(
                    request_id = %decision.request_id,
                    backend = %id,
                    "skipping backend with exhausted quota"
                );
                dispatch.skip(AttemptRecord::skipped(backend))?;
                continue;
            }

            let Some(client) = self.inner.clients.get(id) else {
                continue;
            };

            dispatch.dispatch()?;
            let start = Instant::now();

            match call(client.as_ref(), backend, prompt).await {
                Ok(mut generation) => {
                    // Free backends are never charged, whatever they report
                    if backend.kind.is_local() {
                        generation.cost = 0.0;
                    }

                    tracing::info!(
                        request_id = %decision.request_id,
                        backend = %id,
                        latency_ms = u64::try_from(generation.latency.as_millis()).unwrap_or(u64::MAX),
                        output_tokens = generation.output_tokens,
                        cost = generation.cost,
                        "completion served"
                    );

                    dispatch.succeed(AttemptRecord::succeeded(backend, generation.latency, generation.cost))?;
                    return Ok(Some((generation, backend.model.clone())));
                }
                Err(error) => {
                    if let BackendError::QuotaExceeded { retry_after } = &error {
                        tracing::debug!(backend = %id, retry_after = ?retry_after, "quota signal from backend");
                        self.inner.quota.mark_exhausted(id);
                    }

                    tracing::warn!(
                        request_id = %decision.request_id,
                        backend = %id,
                        error = %error,
                        "backend attempt failed"
                    );

                    let retry = dispatch.fail(AttemptRecord::failed(backend, error.kind(), start.elapsed()))?;
                    if !retry {
                        break;
                    }
                }
            }
        }

        dispatch.exhaust()?;
        Ok(None)
    }
}

/// Call a backend bounded by its timeout
async fn call(client: &dyn GenerationClient, backend: &Backend, prompt: &str) -> Result<Generation, BackendError> {
    tokio::time::timeout(backend.timeout, client.generate(prompt, &backend.model, backend.timeout))
        .await
        .unwrap_or(Err(BackendError::Timeout(backend.timeout)))
}

fn envelope(outcome: &RequestOutcome, generation: Generation, model: String) -> ResponseEnvelope {
    ResponseEnvelope {
        request_id: outcome.decision.request_id,
        text: generation.text,
        backend_used: outcome.backend_used.clone().unwrap_or_default(),
        backend_kind: outcome.backend_kind.unwrap_or(BackendKind::Local),
        model,
        complexity: outcome.decision.complexity,
        cost: outcome.cost,
        latency: outcome.latency,
        fallback_used: outcome.fallback_used,
    }
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn serialize_millis<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64() * 1000.0)
}
