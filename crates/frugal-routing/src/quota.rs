//! Quota exhaustion tracking
//!
//! Backends that answered with a quota error are skipped by the dispatch
//! loop according to the configured policy, without consuming a hop.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use frugal_config::{QuotaConfig, QuotaPolicy};

/// Backends that recently reported quota exhaustion
#[derive(Debug)]
pub struct QuotaTracker {
    /// Backend id -> when it reported exhaustion
    exhausted: DashMap<String, Instant>,
    policy: QuotaPolicy,
    cooldown: Duration,
}

impl QuotaTracker {
    /// Create a tracker for the given policy
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    /// use frugal_config::QuotaPolicy;
    /// use frugal_routing::QuotaTracker;
    ///
    /// let tracker = QuotaTracker::new(QuotaPolicy::Cooldown, Duration::from_secs(60));
    /// assert!(!tracker.is_blocked("claude"));
    /// ```
    pub fn new(policy: QuotaPolicy, cooldown: Duration) -> Self {
        Self {
            exhausted: DashMap::new(),
            policy,
            cooldown,
        }
    }

    pub fn from_config(config: &QuotaConfig) -> Self {
        Self::new(config.policy, config.cooldown)
    }

    /// Note that a backend reported quota exhaustion
    pub fn mark_exhausted(&self, backend: &str) {
        if self.policy == QuotaPolicy::Ignore {
            return;
        }

        tracing::warn!(
            backend = %backend,
            policy = ?self.policy,
            cooldown_secs = self.cooldown.as_secs(),
            "backend quota exhausted, skipping it for subsequent requests"
        );
        self.exhausted.insert(backend.to_owned(), Instant::now());
    }

    /// Whether the dispatch loop should bypass this backend
    pub fn is_blocked(&self, backend: &str) -> bool {
        match self.policy {
            QuotaPolicy::Ignore => false,
            QuotaPolicy::Disable => self.exhausted.contains_key(backend),
            QuotaPolicy::Cooldown => self
                .exhausted
                .get(backend)
                .is_some_and(|marked_at| marked_at.elapsed() < self.cooldown),
        }
    }

    /// Ids of currently blocked backends
    pub fn blocked(&self) -> Vec<String> {
        match self.policy {
            QuotaPolicy::Ignore => return Vec::new(),
            QuotaPolicy::Cooldown => {
                self.exhausted.retain(|_, marked_at| marked_at.elapsed() < self.cooldown);
            }
            QuotaPolicy::Disable => {}
        }

        self.exhausted.iter().map(|entry| entry.key().clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cooldown_blocks_within_window() {
        let tracker = QuotaTracker::new(QuotaPolicy::Cooldown, Duration::from_secs(3600));
        tracker.mark_exhausted("claude");

        assert!(tracker.is_blocked("claude"));
        assert!(!tracker.is_blocked("phi2"));
        assert_eq!(tracker.blocked(), vec!["claude".to_owned()]);
    }

    #[test]
    fn cooldown_expires() {
        let tracker = QuotaTracker::new(QuotaPolicy::Cooldown, Duration::ZERO);
        tracker.mark_exhausted("claude");

        assert!(!tracker.is_blocked("claude"));
        assert!(tracker.blocked().is_empty());
    }

    #[test]
    fn disable_blocks_until_restart() {
        let tracker = QuotaTracker::new(QuotaPolicy::Disable, Duration::ZERO);
        tracker.mark_exhausted("claude");

        // Cooldown length is irrelevant under this policy
        assert!(tracker.is_blocked("claude"));
    }

    #[test]
    fn ignore_never_blocks() {
        let tracker = QuotaTracker::new(QuotaPolicy::Ignore, Duration::from_secs(3600));
        tracker.mark_exhausted("claude");

        assert!(!tracker.is_blocked("claude"));
        assert!(tracker.blocked().is_empty());
    }
}
