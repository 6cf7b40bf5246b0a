//! Routing decisions and request outcomes
//!
//! Both are immutable records: a decision is produced once per request
//! before dispatch, an outcome once dispatch terminates.

use std::fmt;
use std::time::Duration;

use frugal_config::BackendKind;
use jiff::Timestamp;
use serde::{Serialize, Serializer};
use uuid::Uuid;

use crate::dispatch::DispatchState;
use crate::estimator::ComplexityFactors;
use crate::registry::Backend;
use crate::router::ComplexityBand;

/// Why a backend attempt failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Timeout,
    Unavailable,
    InvalidResponse,
    QuotaExceeded,
}

impl FailureKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Unavailable => "unavailable",
            Self::InvalidResponse => "invalid_response",
            Self::QuotaExceeded => "quota_exceeded",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where and why a request was sent
#[derive(Debug, Clone, Serialize)]
pub struct RoutingDecision {
    pub request_id: Uuid,
    /// Primary backend, absent when no backend is competent
    pub backend_id: Option<String>,
    pub complexity: f64,
    pub factors: ComplexityFactors,
    pub band: ComplexityBand,
    /// Backends to try, in order
    pub candidates: Vec<String>,
    pub reasoning: String,
    /// Expected cost on the primary backend (USD)
    pub predicted_cost: f64,
    /// Expected cost had the cheapest cloud backend served it (USD)
    pub baseline_cost: f64,
    /// Whether the caller pinned the backend
    pub manual: bool,
    pub timestamp: Timestamp,
}

/// Result of a single candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    Succeeded,
    Failed,
    /// Bypassed without dispatch (quota cool-down)
    Skipped,
}

/// One entry in a request's dispatch history
#[derive(Debug, Clone, Serialize)]
pub struct AttemptRecord {
    pub backend_id: String,
    pub kind: BackendKind,
    pub status: AttemptStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<FailureKind>,
    #[serde(rename = "latency_ms", serialize_with = "serialize_millis")]
    pub latency: Duration,
    /// Charged cost (USD); failed and skipped attempts are never charged
    pub cost: f64,
}

impl AttemptRecord {
    pub fn succeeded(backend: &Backend, latency: Duration, cost: f64) -> Self {
        Self {
            backend_id: backend.id.clone(),
            kind: backend.kind,
            status: AttemptStatus::Succeeded,
            error: None,
            latency,
            cost,
        }
    }

    pub fn failed(backend: &Backend, error: FailureKind, latency: Duration) -> Self {
        Self {
            backend_id: backend.id.clone(),
            kind: backend.kind,
            status: AttemptStatus::Failed,
            error: Some(error),
            latency,
            cost: 0.0,
        }
    }

    pub fn skipped(backend: &Backend) -> Self {
        Self {
            backend_id: backend.id.clone(),
            kind: backend.kind,
            status: AttemptStatus::Skipped,
            error: None,
            latency: Duration::ZERO,
            cost: 0.0,
        }
    }
}

/// Terminal record of one request, kept for audit whether it succeeded or not
#[derive(Debug, Clone, Serialize)]
pub struct RequestOutcome {
    pub decision: RoutingDecision,
    pub success: bool,
    pub backend_used: Option<String>,
    pub backend_kind: Option<BackendKind>,
    /// Time spent in backend calls
    #[serde(rename = "latency_ms", serialize_with = "serialize_millis")]
    pub latency: Duration,
    /// Actual charged cost (USD)
    pub cost: f64,
    /// Last failure seen, if any
    pub error: Option<FailureKind>,
    pub fallback_used: bool,
    pub attempts: Vec<AttemptRecord>,
    pub transitions: Vec<DispatchState>,
}

impl RequestOutcome {
    /// Attempts that actually reached a backend
    pub fn dispatched_attempts(&self) -> impl Iterator<Item = &AttemptRecord> {
        self.attempts.iter().filter(|a| a.status != AttemptStatus::Skipped)
    }
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn serialize_millis<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64() * 1000.0)
}
