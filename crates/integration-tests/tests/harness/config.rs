//! Programmatic configuration builder for integration tests

use std::net::SocketAddr;
use std::time::Duration;

use frugal_config::{BackendConfig, BackendKind, Config, QuotaPolicy};
use secrecy::SecretString;

/// Builder for constructing test configurations
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder with minimal defaults
    pub fn new() -> Self {
        let mut config = Config::default();
        config.server.listen_address = Some(SocketAddr::from(([127, 0, 0, 1], 0)));

        Self { config }
    }

    /// Add a local backend competent up to `max_complexity`
    pub fn with_local(self, id: &str, base_url: &str, max_complexity: f64) -> Self {
        let mut backend = BackendConfig::new(BackendKind::Local, id);
        backend.base_url = Some(base_url.parse().expect("valid URL"));
        backend.max_complexity = max_complexity;
        self.with_backend(id, backend)
    }

    /// Add a ternary backend and enable ternary routing
    pub fn with_ternary(mut self, id: &str, base_url: &str, max_complexity: f64) -> Self {
        let mut backend = BackendConfig::new(BackendKind::Ternary, id);
        backend.base_url = Some(base_url.parse().expect("valid URL"));
        backend.max_complexity = max_complexity;
        backend.max_tokens = 256;
        self.config.router.ternary_enabled = true;
        self.with_backend(id, backend)
    }

    /// Add a cloud backend priced like the default Claude model
    pub fn with_cloud(self, id: &str, base_url: &str) -> Self {
        let mut backend = BackendConfig::new(BackendKind::Cloud, "claude-sonnet-4-20250514");
        backend.base_url = Some(base_url.parse().expect("valid URL"));
        backend.api_key = Some(SecretString::from("test-key"));
        backend.input_per_mtok = 3.0;
        backend.output_per_mtok = 15.0;
        self.with_backend(id, backend)
    }

    /// Add an arbitrary backend
    pub fn with_backend(mut self, id: &str, backend: BackendConfig) -> Self {
        self.config.backends.insert(id.to_owned(), backend);
        self
    }

    /// Set the per-call timeout of an already added backend
    pub fn with_timeout(mut self, id: &str, timeout: Duration) -> Self {
        if let Some(backend) = self.config.backends.get_mut(id) {
            backend.timeout = timeout;
        }
        self
    }

    pub fn with_max_fallback_hops(mut self, hops: usize) -> Self {
        self.config.router.max_fallback_hops = hops;
        self
    }

    pub fn with_max_prompt_chars(mut self, chars: usize) -> Self {
        self.config.router.max_prompt_chars = chars;
        self
    }

    pub fn with_quota_policy(mut self, policy: QuotaPolicy, cooldown: Duration) -> Self {
        self.config.router.quota.policy = policy;
        self.config.router.quota.cooldown = cooldown;
        self
    }

    /// Disable health endpoint
    pub fn without_health(mut self) -> Self {
        self.config.server.health.enabled = false;
        self
    }

    /// Build the final config
    pub fn build(self) -> Config {
        self.config
    }
}
