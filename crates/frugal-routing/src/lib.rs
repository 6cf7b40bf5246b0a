//! Complexity-aware routing for Frugal
//!
//! - **Estimator**: four-factor heuristic complexity score
//! - **Registry**: backends with competence bands, cost, and latency
//! - **Router**: complexity band to ordered candidate list
//! - **Dispatch**: per-request state machine bounding fallback hops
//! - **Quota**: skip backends that reported quota exhaustion

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

pub mod dispatch;
pub mod error;
pub mod estimator;
pub mod outcome;
pub mod quota;
pub mod registry;
pub mod router;

pub use dispatch::{Dispatch, DispatchState};
pub use error::RoutingError;
pub use estimator::{ComplexityEstimator, ComplexityFactors, Estimate, FactorWeights, TaskType};
pub use frugal_config::BackendKind;
pub use outcome::{AttemptRecord, AttemptStatus, FailureKind, RequestOutcome, RoutingDecision};
pub use quota::QuotaTracker;
pub use registry::{Backend, BackendRegistry};
pub use router::{ComplexityBand, Router};
