//! Process-wide cost ledger
//!
//! Folds every request outcome into per-backend and overall totals and keeps
//! a bounded trail of recent outcomes for audit. In-memory only; totals reset
//! when the process restarts.

#![allow(clippy::must_use_candidate)]

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Mutex, PoisonError};

use dashmap::DashMap;
use frugal_config::{BackendKind, LedgerConfig};
use frugal_routing::{AttemptStatus, FailureKind, RequestOutcome};
use serde::Serialize;

/// Failed attempts broken down by cause
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FailureCounts {
    pub timeout: u64,
    pub unavailable: u64,
    pub invalid_response: u64,
    pub quota_exceeded: u64,
}

impl FailureCounts {
    fn add(&mut self, kind: FailureKind) {
        match kind {
            FailureKind::Timeout => self.timeout += 1,
            FailureKind::Unavailable => self.unavailable += 1,
            FailureKind::InvalidResponse => self.invalid_response += 1,
            FailureKind::QuotaExceeded => self.quota_exceeded += 1,
        }
    }

    pub const fn total(&self) -> u64 {
        self.timeout + self.unavailable + self.invalid_response + self.quota_exceeded
    }
}

/// Running totals for one backend
struct BackendTotals {
    kind: BackendKind,
    served: u64,
    attempts: u64,
    skipped: u64,
    failures: FailureCounts,
    total_cost: f64,
    served_latency_ms: f64,
}

impl BackendTotals {
    const fn new(kind: BackendKind) -> Self {
        Self {
            kind,
            served: 0,
            attempts: 0,
            skipped: 0,
            failures: FailureCounts {
                timeout: 0,
                unavailable: 0,
                invalid_response: 0,
                quota_exceeded: 0,
            },
            total_cost: 0.0,
            served_latency_ms: 0.0,
        }
    }
}

#[derive(Default)]
struct OverallTotals {
    total_requests: u64,
    succeeded: u64,
    failed: u64,
    fallback_requests: u64,
    local_requests: u64,
    cloud_requests: u64,
    total_cost: f64,
    predicted_cost: f64,
    baseline_cost: f64,
}

/// Aggregated cost and routing statistics
pub struct CostLedger {
    backends: DashMap<String, BackendTotals>,
    overall: Mutex<OverallTotals>,
    recent: Mutex<VecDeque<RequestOutcome>>,
    audit_capacity: usize,
}

impl CostLedger {
    /// Create an empty ledger keeping up to `audit_capacity` recent outcomes
    pub fn new(audit_capacity: usize) -> Self {
        let audit_capacity = audit_capacity.max(1);
        Self {
            backends: DashMap::new(),
            overall: Mutex::new(OverallTotals::default()),
            recent: Mutex::new(VecDeque::with_capacity(audit_capacity.min(1024))),
            audit_capacity,
        }
    }

    pub fn from_config(config: &LedgerConfig) -> Self {
        Self::new(config.audit_capacity)
    }

    /// Fold one terminal request outcome into the ledger
    ///
    /// Safe to call from many tasks at once; no update is lost.
    pub fn record(&self, outcome: &RequestOutcome) {
        for attempt in &outcome.attempts {
            let mut entry = self
                .backends
                .entry(attempt.backend_id.clone())
                .or_insert_with(|| BackendTotals::new(attempt.kind));

            match attempt.status {
                AttemptStatus::Succeeded => {
                    entry.attempts += 1;
                    entry.served += 1;
                    entry.total_cost += attempt.cost;
                    entry.served_latency_ms += attempt.latency.as_secs_f64() * 1000.0;
                }
                AttemptStatus::Failed => {
                    entry.attempts += 1;
                    if let Some(kind) = attempt.error {
                        entry.failures.add(kind);
                    }
                }
                AttemptStatus::Skipped => entry.skipped += 1,
            }
        }

        {
            let mut overall = self.overall.lock().unwrap_or_else(PoisonError::into_inner);
            overall.total_requests += 1;

            if outcome.success {
                overall.succeeded += 1;
                overall.total_cost += outcome.cost;
                overall.predicted_cost += outcome.decision.predicted_cost;
                overall.baseline_cost += outcome.decision.baseline_cost;
                match outcome.backend_kind {
                    Some(kind) if kind.is_local() => overall.local_requests += 1,
                    Some(_) => overall.cloud_requests += 1,
                    None => {}
                }
            } else {
                overall.failed += 1;
            }

            if outcome.fallback_used {
                overall.fallback_requests += 1;
            }
        }

        let mut recent = self.recent.lock().unwrap_or_else(PoisonError::into_inner);
        if recent.len() >= self.audit_capacity {
            recent.pop_front();
        }
        recent.push_back(outcome.clone());
        drop(recent);

        tracing::debug!(
            request_id = %outcome.decision.request_id,
            success = outcome.success,
            backend = outcome.backend_used.as_deref().unwrap_or("none"),
            cost = outcome.cost,
            "outcome recorded in ledger"
        );
    }

    /// Snapshot of all totals
    #[allow(clippy::cast_precision_loss)]
    pub fn report(&self) -> LedgerReport {
        let per_backend = self
            .backends
            .iter()
            .map(|entry| {
                let totals = entry.value();
                let avg_latency_ms = if totals.served == 0 {
                    0.0
                } else {
                    totals.served_latency_ms / totals.served as f64
                };

                let report = BackendReport {
                    kind: totals.kind,
                    count: totals.served,
                    attempts: totals.attempts,
                    skipped: totals.skipped,
                    failures: totals.failures,
                    total_cost: totals.total_cost,
                    avg_latency_ms,
                };
                (entry.key().clone(), report)
            })
            .collect();

        let overall = self.overall.lock().unwrap_or_else(PoisonError::into_inner);
        let ratio = |part: u64| {
            if overall.total_requests == 0 {
                0.0
            } else {
                part as f64 / overall.total_requests as f64
            }
        };
        let savings = overall.baseline_cost - overall.total_cost;
        let savings_percent = if overall.baseline_cost > 0.0 {
            savings / overall.baseline_cost * 100.0
        } else {
            0.0
        };

        let overall = OverallReport {
            total_requests: overall.total_requests,
            succeeded: overall.succeeded,
            failed: overall.failed,
            fallback_requests: overall.fallback_requests,
            local_requests: overall.local_requests,
            cloud_requests: overall.cloud_requests,
            local_fraction: ratio(overall.local_requests),
            total_cost: overall.total_cost,
            predicted_cost: overall.predicted_cost,
            baseline_cost: overall.baseline_cost,
            savings,
            savings_percent,
        };

        LedgerReport { per_backend, overall }
    }

    /// Most recent outcomes, newest first
    pub fn recent(&self, limit: usize) -> Vec<RequestOutcome> {
        let recent = self.recent.lock().unwrap_or_else(PoisonError::into_inner);
        recent.iter().rev().take(limit).cloned().collect()
    }
}

/// Point-in-time ledger snapshot
#[derive(Debug, Clone, Serialize)]
pub struct LedgerReport {
    pub per_backend: BTreeMap<String, BackendReport>,
    pub overall: OverallReport,
}

/// Totals for one backend
#[derive(Debug, Clone, Serialize)]
pub struct BackendReport {
    pub kind: BackendKind,
    /// Requests this backend served successfully
    pub count: u64,
    /// Calls dispatched to this backend, successful or not
    pub attempts: u64,
    /// Times the backend was bypassed by the quota policy
    pub skipped: u64,
    pub failures: FailureCounts,
    pub total_cost: f64,
    /// Mean latency of successful calls
    pub avg_latency_ms: f64,
}

/// Totals across all requests
#[derive(Debug, Clone, Serialize)]
pub struct OverallReport {
    pub total_requests: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub fallback_requests: u64,
    /// Requests served by local or ternary backends
    pub local_requests: u64,
    pub cloud_requests: u64,
    /// `local_requests / total_requests`
    pub local_fraction: f64,
    pub total_cost: f64,
    pub predicted_cost: f64,
    /// What the served requests would have cost on the cheapest cloud backend
    pub baseline_cost: f64,
    pub savings: f64,
    pub savings_percent: f64,
}
