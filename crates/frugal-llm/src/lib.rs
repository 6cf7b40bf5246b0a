//! Backend clients and request orchestration for Frugal
//!
//! Talks to local (Ollama-style), ternary (BitNet-style), and cloud
//! (Anthropic Messages API) backends behind one `GenerationClient` trait,
//! and drives each request from validation through fallback to the ledger.

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

pub mod error;
#[cfg(feature = "http")]
pub mod handler;
pub mod provider;
pub mod state;

pub use error::{BackendError, LlmError};
#[cfg(feature = "http")]
pub use handler::router_routes;
pub use provider::{Generation, GenerationClient};
pub use state::{ChatRequest, ComplexityReport, ResponseEnvelope, RouterState};
