//! Per-request dispatch state machine
//!
//! ```text
//! Init -> Scored -> BackendSelected -> Dispatched -> Succeeded
//!                                         |    ^
//!                                         v    |
//!                                    FallbackRetry
//! ```
//!
//! Any non-terminal state after `Scored` may move to `Failed`. Attempts are
//! strictly sequential and bounded by `1 + max_fallback_hops`.

use std::time::Duration;

use serde::Serialize;

use crate::error::RoutingError;
use crate::outcome::{AttemptRecord, AttemptStatus, RequestOutcome, RoutingDecision};

/// Lifecycle state of one request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchState {
    Init,
    Scored,
    BackendSelected,
    Dispatched,
    FallbackRetry,
    Succeeded,
    Failed,
}

impl DispatchState {
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    const fn can_advance_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Init, Self::Scored)
                | (Self::Scored, Self::BackendSelected | Self::Failed)
                | (Self::BackendSelected | Self::FallbackRetry, Self::Dispatched | Self::Failed)
                | (Self::Dispatched, Self::Succeeded | Self::FallbackRetry | Self::Failed)
        )
    }
}

/// Drives one request through its states and collects its attempt history
#[derive(Debug)]
pub struct Dispatch {
    state: DispatchState,
    transitions: Vec<DispatchState>,
    attempts: Vec<AttemptRecord>,
    dispatched: usize,
    max_attempts: usize,
}

impl Dispatch {
    /// Start a dispatch allowing `max_fallback_hops` retries after the primary
    pub fn new(max_fallback_hops: usize) -> Self {
        Self {
            state: DispatchState::Init,
            transitions: vec![DispatchState::Init],
            attempts: Vec::new(),
            dispatched: 0,
            max_attempts: max_fallback_hops.saturating_add(1),
        }
    }

    pub const fn state(&self) -> DispatchState {
        self.state
    }

    /// Every state entered so far, in order
    pub fn transitions(&self) -> &[DispatchState] {
        &self.transitions
    }

    pub fn attempts(&self) -> &[AttemptRecord] {
        &self.attempts
    }

    /// Number of attempts that reached a backend
    pub const fn dispatched(&self) -> usize {
        self.dispatched
    }

    /// Complexity has been computed
    pub fn score(&mut self) -> Result<(), RoutingError> {
        self.advance(DispatchState::Scored)
    }

    /// A candidate list with a primary backend exists
    pub fn select(&mut self) -> Result<(), RoutingError> {
        self.advance(DispatchState::BackendSelected)
    }

    /// A backend call is about to start
    pub fn dispatch(&mut self) -> Result<(), RoutingError> {
        self.advance(DispatchState::Dispatched)?;
        self.dispatched += 1;
        Ok(())
    }

    /// The in-flight call succeeded
    pub fn succeed(&mut self, attempt: AttemptRecord) -> Result<(), RoutingError> {
        self.advance(DispatchState::Succeeded)?;
        self.attempts.push(attempt);
        Ok(())
    }

    /// The in-flight call failed
    ///
    /// Moves to `FallbackRetry` while the hop budget allows another attempt,
    /// otherwise to `Failed`. Returns whether another attempt may follow.
    pub fn fail(&mut self, attempt: AttemptRecord) -> Result<bool, RoutingError> {
        let next = if self.dispatched < self.max_attempts {
            DispatchState::FallbackRetry
        } else {
            DispatchState::Failed
        };

        if self.state != DispatchState::Dispatched {
            return Err(RoutingError::IllegalTransition { from: self.state, to: next });
        }

        self.advance(next)?;
        self.attempts.push(attempt);
        Ok(next == DispatchState::FallbackRetry)
    }

    /// Record a candidate that was bypassed without dispatch
    pub fn skip(&mut self, attempt: AttemptRecord) -> Result<(), RoutingError> {
        if !matches!(self.state, DispatchState::BackendSelected | DispatchState::FallbackRetry) {
            return Err(RoutingError::IllegalTransition {
                from: self.state,
                to: DispatchState::Dispatched,
            });
        }
        self.attempts.push(attempt);
        Ok(())
    }

    /// No further candidates remain; terminate as failed
    ///
    /// A no-op once the dispatch is already terminal.
    pub fn exhaust(&mut self) -> Result<(), RoutingError> {
        if self.state.is_terminal() {
            return Ok(());
        }
        self.advance(DispatchState::Failed)
    }

    /// Close the dispatch and build its outcome
    pub fn into_outcome(self, decision: RoutingDecision) -> RequestOutcome {
        let served = self
            .attempts
            .iter()
            .find(|a| a.status == AttemptStatus::Succeeded);
        let skipped_any = self.attempts.iter().any(|a| a.status == AttemptStatus::Skipped);
        let error = self.attempts.iter().rev().find_map(|a| a.error);
        let latency = self.attempts.iter().map(|a| a.latency).sum::<Duration>();

        RequestOutcome {
            success: self.state == DispatchState::Succeeded,
            backend_used: served.map(|a| a.backend_id.clone()),
            backend_kind: served.map(|a| a.kind),
            latency,
            cost: served.map_or(0.0, |a| a.cost),
            error,
            fallback_used: self.dispatched > 1 || (self.dispatched > 0 && skipped_any),
            decision,
            attempts: self.attempts,
            transitions: self.transitions,
        }
    }

    fn advance(&mut self, next: DispatchState) -> Result<(), RoutingError> {
        if !self.state.can_advance_to(next) {
            return Err(RoutingError::IllegalTransition { from: self.state, to: next });
        }
        self.state = next;
        self.transitions.push(next);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use frugal_config::{BackendConfig, BackendKind};
    use jiff::Timestamp;
    use uuid::Uuid;

    use super::*;
    use crate::estimator::{ComplexityFactors, TaskType};
    use crate::registry::Backend;
    use crate::router::ComplexityBand;
    use crate::outcome::FailureKind;

    fn backend(id: &str, kind: BackendKind) -> Backend {
        Backend::from_config(id, &BackendConfig::new(kind, id))
    }

    fn decision() -> RoutingDecision {
        RoutingDecision {
            request_id: Uuid::new_v4(),
            backend_id: Some("tinyllama".to_owned()),
            complexity: 0.1,
            factors: ComplexityFactors {
                length_score: 0.0,
                keyword_score: 0.0,
                code_score: 0.0,
                task_type_score: 0.1,
                task_type: TaskType::Question,
                matched_keywords: Vec::new(),
                char_count: 5,
            },
            band: ComplexityBand::Low,
            candidates: vec!["tinyllama".to_owned(), "phi2".to_owned()],
            reasoning: String::new(),
            predicted_cost: 0.0,
            baseline_cost: 0.0,
            manual: false,
            timestamp: Timestamp::now(),
        }
    }

    fn selected(max_hops: usize) -> Dispatch {
        let mut dispatch = Dispatch::new(max_hops);
        dispatch.score().unwrap();
        dispatch.select().unwrap();
        dispatch
    }

    #[test]
    fn primary_success_path() {
        let mut dispatch = selected(1);
        dispatch.dispatch().unwrap();
        dispatch
            .succeed(AttemptRecord::succeeded(&backend("tinyllama", BackendKind::Local), Duration::from_millis(40), 0.0))
            .unwrap();

        assert_eq!(
            dispatch.transitions(),
            &[
                DispatchState::Init,
                DispatchState::Scored,
                DispatchState::BackendSelected,
                DispatchState::Dispatched,
                DispatchState::Succeeded,
            ]
        );

        let outcome = dispatch.into_outcome(decision());
        assert!(outcome.success);
        assert!(!outcome.fallback_used);
        assert_eq!(outcome.backend_used.as_deref(), Some("tinyllama"));
        assert_eq!(outcome.error, None);
    }

    #[test]
    fn one_fallback_then_success() {
        let mut dispatch = selected(1);
        dispatch.dispatch().unwrap();
        let retry = dispatch
            .fail(AttemptRecord::failed(
                &backend("tinyllama", BackendKind::Local),
                FailureKind::Timeout,
                Duration::from_secs(30),
            ))
            .unwrap();
        assert!(retry);
        assert_eq!(dispatch.state(), DispatchState::FallbackRetry);

        dispatch.dispatch().unwrap();
        dispatch
            .succeed(AttemptRecord::succeeded(&backend("phi2", BackendKind::Local), Duration::from_millis(60), 0.0))
            .unwrap();

        let outcome = dispatch.into_outcome(decision());
        assert!(outcome.success);
        assert!(outcome.fallback_used);
        assert_eq!(outcome.backend_used.as_deref(), Some("phi2"));
        assert_eq!(outcome.error, Some(FailureKind::Timeout));
        assert_eq!(outcome.latency, Duration::from_millis(30_060));
        assert_eq!(outcome.dispatched_attempts().count(), 2);
    }

    #[test]
    fn hop_budget_ends_in_failure() {
        let mut dispatch = selected(1);
        let local = backend("tinyllama", BackendKind::Local);

        dispatch.dispatch().unwrap();
        assert!(dispatch.fail(AttemptRecord::failed(&local, FailureKind::Unavailable, Duration::ZERO)).unwrap());
        dispatch.dispatch().unwrap();
        assert!(!dispatch.fail(AttemptRecord::failed(&local, FailureKind::Unavailable, Duration::ZERO)).unwrap());

        assert_eq!(dispatch.state(), DispatchState::Failed);
        assert_eq!(dispatch.dispatched(), 2);
        // No third attempt once terminal
        assert!(dispatch.dispatch().is_err());

        let outcome = dispatch.into_outcome(decision());
        assert!(!outcome.success);
        assert!(outcome.cost.abs() < f64::EPSILON);
        assert_eq!(outcome.backend_used, None);
    }

    #[test]
    fn zero_hops_allows_only_the_primary() {
        let mut dispatch = selected(0);
        dispatch.dispatch().unwrap();
        let retry = dispatch
            .fail(AttemptRecord::failed(
                &backend("tinyllama", BackendKind::Local),
                FailureKind::InvalidResponse,
                Duration::ZERO,
            ))
            .unwrap();
        assert!(!retry);
        assert_eq!(dispatch.state(), DispatchState::Failed);
    }

    #[test]
    fn exhausting_candidates_fails_from_retry() {
        let mut dispatch = selected(3);
        dispatch.dispatch().unwrap();
        dispatch
            .fail(AttemptRecord::failed(&backend("claude", BackendKind::Cloud), FailureKind::QuotaExceeded, Duration::ZERO))
            .unwrap();
        dispatch.exhaust().unwrap();
        assert_eq!(dispatch.state(), DispatchState::Failed);
        // Idempotent once terminal
        dispatch.exhaust().unwrap();
    }

    #[test]
    fn skipped_primary_counts_as_fallback() {
        let mut dispatch = selected(1);
        dispatch.skip(AttemptRecord::skipped(&backend("claude", BackendKind::Cloud))).unwrap();
        dispatch.dispatch().unwrap();
        dispatch
            .succeed(AttemptRecord::succeeded(&backend("phi2", BackendKind::Local), Duration::ZERO, 0.0))
            .unwrap();

        let outcome = dispatch.into_outcome(decision());
        assert!(outcome.fallback_used);
        assert_eq!(outcome.dispatched_attempts().count(), 1);
        assert_eq!(outcome.attempts.len(), 2);
    }

    #[test]
    fn out_of_order_transitions_are_rejected() {
        let mut dispatch = Dispatch::new(1);
        assert!(matches!(
            dispatch.select(),
            Err(RoutingError::IllegalTransition {
                from: DispatchState::Init,
                to: DispatchState::BackendSelected
            })
        ));

        dispatch.score().unwrap();
        assert!(dispatch.dispatch().is_err());
        assert!(dispatch.skip(AttemptRecord::skipped(&backend("x", BackendKind::Local))).is_err());
        assert!(
            dispatch
                .succeed(AttemptRecord::succeeded(&backend("x", BackendKind::Local), Duration::ZERO, 0.0))
                .is_err()
        );
    }
}
