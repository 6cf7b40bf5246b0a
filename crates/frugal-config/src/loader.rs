use std::path::Path;

use crate::{BackendKind, Config};

/// Allowed drift when checking that factor weights sum to one
const WEIGHT_TOLERANCE: f64 = 1e-6;

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Reads the file, expands `{{ env.VAR }}` placeholders, then
    /// deserializes and validates the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, environment variable
    /// expansion fails, TOML parsing fails, or validation fails
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config file {}: {e}", path.display()))?;

        Self::from_toml(&raw)
    }

    /// Parse and validate configuration from TOML text
    ///
    /// # Errors
    ///
    /// Returns an error if expansion, parsing, or validation fails
    pub fn from_toml(raw: &str) -> anyhow::Result<Self> {
        let expanded =
            crate::env::expand_env(raw).map_err(|e| anyhow::anyhow!("config variable expansion failed: {e}"))?;

        let config: Self = toml::from_str(&expanded).map_err(|e| anyhow::anyhow!("failed to parse config: {e}"))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate that the configuration is internally consistent
    ///
    /// # Errors
    ///
    /// Returns an error if no backend is configured, thresholds or weights
    /// are out of range, or a backend definition is unusable
    pub fn validate(&self) -> anyhow::Result<()> {
        self.validate_router()?;
        self.validate_estimator()?;
        self.validate_backends()?;

        if self.ledger.audit_capacity == 0 {
            anyhow::bail!("ledger.audit_capacity must be greater than 0");
        }

        Ok(())
    }

    fn validate_router(&self) -> anyhow::Result<()> {
        let router = &self.router;

        if !(0.0..=1.0).contains(&router.low_threshold) || !(0.0..=1.0).contains(&router.high_threshold) {
            anyhow::bail!("router thresholds must lie within [0, 1]");
        }

        if router.low_threshold >= router.high_threshold {
            anyhow::bail!(
                "router.low_threshold ({}) must be below router.high_threshold ({})",
                router.low_threshold,
                router.high_threshold
            );
        }

        if router.max_prompt_chars == 0 {
            anyhow::bail!("router.max_prompt_chars must be greater than 0");
        }

        Ok(())
    }

    fn validate_estimator(&self) -> anyhow::Result<()> {
        let estimator = &self.estimator;
        let weights = &estimator.weights;

        for (name, weight) in [
            ("length", weights.length),
            ("keyword", weights.keyword),
            ("code", weights.code),
            ("task_type", weights.task_type),
        ] {
            if !(0.0..=1.0).contains(&weight) {
                anyhow::bail!("estimator.weights.{name} must lie within [0, 1], got {weight}");
            }
        }

        if (weights.total() - 1.0).abs() > WEIGHT_TOLERANCE {
            anyhow::bail!("estimator weights must sum to 1.0, got {}", weights.total());
        }

        if estimator.length_ceiling == 0 {
            anyhow::bail!("estimator.length_ceiling must be greater than 0");
        }

        if estimator.max_keyword_matches == 0 {
            anyhow::bail!("estimator.max_keyword_matches must be greater than 0");
        }

        if let Some(ref keywords) = estimator.keywords
            && keywords.iter().any(|k| k.trim().is_empty())
        {
            anyhow::bail!("estimator.keywords must not contain empty entries");
        }

        Ok(())
    }

    fn validate_backends(&self) -> anyhow::Result<()> {
        if self.backends.is_empty() {
            anyhow::bail!("at least one backend must be configured");
        }

        for (id, backend) in &self.backends {
            if !(0.0..=1.0).contains(&backend.min_complexity)
                || !(0.0..=1.0).contains(&backend.max_complexity)
                || backend.min_complexity > backend.max_complexity
            {
                anyhow::bail!("backend '{id}' must satisfy 0 <= min_complexity <= max_complexity <= 1");
            }

            if backend.input_per_mtok < 0.0 || backend.output_per_mtok < 0.0 {
                anyhow::bail!("backend '{id}' token prices must not be negative");
            }

            if backend.max_tokens == 0 {
                anyhow::bail!("backend '{id}' max_tokens must be greater than 0");
            }

            match backend.kind {
                BackendKind::Local | BackendKind::Ternary => {
                    if backend.base_url.is_none() {
                        anyhow::bail!("{} backend '{id}' requires a base_url", backend.kind);
                    }
                    if backend.unit_cost_per_request.is_some_and(|cost| cost != 0.0) {
                        anyhow::bail!("{} backend '{id}' cannot carry a per-request cost", backend.kind);
                    }
                }
                BackendKind::Cloud => {
                    if backend.unit_cost_per_request.is_some_and(|cost| cost < 0.0) {
                        anyhow::bail!("backend '{id}' unit_cost_per_request must not be negative");
                    }
                    if backend.api_key.is_none() {
                        tracing::warn!(backend = %id, "cloud backend has no api_key; it will report unavailable");
                    }
                }
            }
        }

        let has_ternary = self.backends.values().any(|b| b.kind == BackendKind::Ternary);
        if self.router.ternary_enabled && !has_ternary {
            tracing::warn!("router.ternary_enabled is set but no ternary backend is configured");
        }

        Ok(())
    }
}
