use std::time::Duration;

use serde::Deserialize;

/// Routing thresholds and dispatch limits
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RouterConfig {
    /// Complexity below this goes to the cheapest local backend
    #[serde(default = "default_low_threshold")]
    pub low_threshold: f64,
    /// Complexity at or above this goes to the cloud tier
    #[serde(default = "default_high_threshold")]
    pub high_threshold: f64,
    /// Extra attempts allowed after the primary backend fails
    #[serde(default = "default_max_fallback_hops")]
    pub max_fallback_hops: usize,
    /// Longest accepted prompt, in characters
    #[serde(default = "default_max_prompt_chars")]
    pub max_prompt_chars: usize,
    /// Register ternary backends and prefer them for mid-complexity prompts
    #[serde(default)]
    pub ternary_enabled: bool,
    /// What to do with a backend that reported quota exhaustion
    #[serde(default)]
    pub quota: QuotaConfig,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            low_threshold: default_low_threshold(),
            high_threshold: default_high_threshold(),
            max_fallback_hops: default_max_fallback_hops(),
            max_prompt_chars: default_max_prompt_chars(),
            ternary_enabled: false,
            quota: QuotaConfig::default(),
        }
    }
}

/// Handling of backends that returned a quota error
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QuotaConfig {
    #[serde(default)]
    pub policy: QuotaPolicy,
    /// Skip window for [`QuotaPolicy::Cooldown`]
    #[serde(default = "default_cooldown", deserialize_with = "crate::duration::deserialize")]
    pub cooldown: Duration,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            policy: QuotaPolicy::default(),
            cooldown: default_cooldown(),
        }
    }
}

/// Quota exhaustion policy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuotaPolicy {
    /// Skip the backend for a fixed window
    #[default]
    Cooldown,
    /// Skip the backend until the process restarts
    Disable,
    /// Keep dispatching to the backend
    Ignore,
}

const fn default_low_threshold() -> f64 {
    0.3
}

const fn default_high_threshold() -> f64 {
    0.6
}

const fn default_max_fallback_hops() -> usize {
    1
}

const fn default_max_prompt_chars() -> usize {
    32_000
}

const fn default_cooldown() -> Duration {
    Duration::from_secs(60)
}
