#![allow(clippy::must_use_candidate)]

pub mod backend;
mod duration;
mod env;
pub mod estimator;
pub mod ledger;
mod loader;
pub mod router;
pub mod server;
pub mod telemetry;

use indexmap::IndexMap;
use serde::Deserialize;

pub use backend::*;
pub use estimator::*;
pub use ledger::*;
pub use router::*;
pub use server::*;
pub use telemetry::{LogFormat, TelemetryConfig};

/// Top-level Frugal configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Routing thresholds, fallback budget, and quota policy
    #[serde(default)]
    pub router: RouterConfig,
    /// Complexity estimator tuning
    #[serde(default)]
    pub estimator: EstimatorConfig,
    /// Cost ledger configuration
    #[serde(default)]
    pub ledger: LedgerConfig,
    /// Telemetry configuration
    #[serde(default)]
    pub telemetry: Option<TelemetryConfig>,
    /// Inference backends keyed by id, in preference order for ties
    #[serde(default)]
    pub backends: IndexMap<String, BackendConfig>,
}
