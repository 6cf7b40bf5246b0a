//! Logging for Frugal
//!
//! Structured logs via the `tracing` ecosystem, printed as text or JSON

use frugal_config::{LogFormat, TelemetryConfig};
use tracing_subscriber::EnvFilter;

/// Filter used when the configured one does not parse
const FALLBACK_FILTER: &str = "info";

/// Initialize the global subscriber from configuration
///
/// `RUST_LOG`, when set, takes precedence over the configured filter.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed
pub fn init(config: Option<&TelemetryConfig>) -> anyhow::Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let default = TelemetryConfig::default();
    let config = config.unwrap_or(&default);
    let filter = build_filter(&config.log_filter);

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    match config.format {
        LogFormat::Text => tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .try_init()?,
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer.json().flatten_event(true))
            .try_init()?,
    }

    Ok(())
}

fn build_filter(configured: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(configured))
        .unwrap_or_else(|_| EnvFilter::new(FALLBACK_FILTER))
}
