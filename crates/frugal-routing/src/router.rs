//! Complexity-band routing
//!
//! Maps a complexity score to an ordered list of competent backends:
//! - **Low** (`< low_threshold`): local backends first
//! - **Medium**: ternary backends first when registered and competent,
//!   otherwise local
//! - **High** (`>= high_threshold`): cloud backends first
//!
//! Within and after the preferred kind, candidates are ordered cheapest
//! first, then by latency hint, then by configuration order.

use std::fmt;

use frugal_config::{BackendKind, RouterConfig};
use frugal_core::Prompt;
use jiff::Timestamp;
use serde::Serialize;

use crate::error::RoutingError;
use crate::estimator::Estimate;
use crate::outcome::RoutingDecision;
use crate::registry::{Backend, BackendRegistry};

/// Coarse complexity bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplexityBand {
    Low,
    Medium,
    High,
}

impl fmt::Display for ComplexityBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        })
    }
}

/// Threshold router over a backend registry
#[derive(Debug)]
pub struct Router {
    registry: BackendRegistry,
    low_threshold: f64,
    high_threshold: f64,
}

impl Router {
    pub fn new(registry: BackendRegistry, config: &RouterConfig) -> Self {
        Self {
            registry,
            low_threshold: config.low_threshold,
            high_threshold: config.high_threshold,
        }
    }

    pub const fn registry(&self) -> &BackendRegistry {
        &self.registry
    }

    /// Band for a complexity score
    pub fn band(&self, complexity: f64) -> ComplexityBand {
        if complexity < self.low_threshold {
            ComplexityBand::Low
        } else if complexity < self.high_threshold {
            ComplexityBand::Medium
        } else {
            ComplexityBand::High
        }
    }

    /// Ordered candidate backends for a complexity score
    ///
    /// Only backends whose competence band covers the score are returned.
    /// The list is empty when none does.
    pub fn route(&self, complexity: f64) -> Vec<&Backend> {
        let mut candidates: Vec<&Backend> = self
            .registry
            .backends()
            .iter()
            .filter(|b| b.covers(complexity))
            .collect();

        let preferred = preferred_kind(self.band(complexity), &candidates);

        // Stable sort keeps configuration order for full ties
        candidates.sort_by(|a, b| {
            (a.kind != preferred)
                .cmp(&(b.kind != preferred))
                .then_with(|| a.cost_order(b))
        });

        candidates
    }

    /// Build the routing decision for an estimated prompt
    pub fn decide(&self, prompt: &Prompt, estimate: &Estimate) -> RoutingDecision {
        let band = self.band(estimate.complexity);
        let candidates = self.route(estimate.complexity);
        let primary = candidates.first().copied();

        let reasoning = primary.map_or_else(
            || format!("{band} band, no competent backend; {}", estimate.reasoning),
            |backend| {
                format!(
                    "{band} band, primary {} ({}, ${:.4}/request); {}",
                    backend.id, backend.kind, backend.unit_cost_per_request, estimate.reasoning
                )
            },
        );

        let decision = RoutingDecision {
            request_id: prompt.id(),
            backend_id: primary.map(|b| b.id.clone()),
            complexity: estimate.complexity,
            factors: estimate.factors.clone(),
            band,
            candidates: candidates.iter().map(|b| b.id.clone()).collect(),
            reasoning,
            predicted_cost: primary.map_or(0.0, |b| b.predicted_cost(prompt.text())),
            baseline_cost: self.baseline_cost(prompt),
            manual: false,
            timestamp: Timestamp::now(),
        };

        tracing::info!(
            request_id = %decision.request_id,
            complexity = decision.complexity,
            band = %band,
            backend = decision.backend_id.as_deref().unwrap_or("none"),
            candidates = decision.candidates.len(),
            "routing decision made"
        );

        decision
    }

    /// Build a decision pinned to one backend chosen by the caller
    ///
    /// The estimate is still recorded; competence bands are not enforced.
    ///
    /// # Errors
    ///
    /// Returns `RoutingError::UnknownBackend` if the id is not registered
    pub fn decide_manual(
        &self,
        prompt: &Prompt,
        estimate: &Estimate,
        backend_id: &str,
    ) -> Result<RoutingDecision, RoutingError> {
        let backend = self
            .registry
            .get(backend_id)
            .ok_or_else(|| RoutingError::UnknownBackend {
                id: backend_id.to_owned(),
            })?;

        tracing::info!(
            request_id = %prompt.id(),
            backend = %backend.id,
            "backend selected manually"
        );

        Ok(RoutingDecision {
            request_id: prompt.id(),
            backend_id: Some(backend.id.clone()),
            complexity: estimate.complexity,
            factors: estimate.factors.clone(),
            band: self.band(estimate.complexity),
            candidates: vec![backend.id.clone()],
            reasoning: format!("manual selection of {}; {}", backend.id, estimate.reasoning),
            predicted_cost: backend.predicted_cost(prompt.text()),
            baseline_cost: self.baseline_cost(prompt),
            manual: true,
            timestamp: Timestamp::now(),
        })
    }

    /// Cost of serving the prompt on the cheapest cloud backend, 0 without one
    fn baseline_cost(&self, prompt: &Prompt) -> f64 {
        self.registry
            .cheapest_of_kind(BackendKind::Cloud)
            .map_or(0.0, |b| b.predicted_cost(prompt.text()))
    }
}

fn preferred_kind(band: ComplexityBand, competent: &[&Backend]) -> BackendKind {
    match band {
        ComplexityBand::Low => BackendKind::Local,
        ComplexityBand::Medium => {
            if competent.iter().any(|b| b.kind == BackendKind::Ternary) {
                BackendKind::Ternary
            } else {
                BackendKind::Local
            }
        }
        ComplexityBand::High => BackendKind::Cloud,
    }
}
