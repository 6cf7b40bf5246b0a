//! Routing-specific error types

use thiserror::Error;

use crate::dispatch::DispatchState;

/// Errors raised while building routing components or driving a dispatch
#[derive(Debug, Error)]
pub enum RoutingError {
    /// Factor weights do not sum to one
    #[error("factor weights must sum to 1.0, got {total}")]
    InvalidWeights { total: f64 },

    /// Trigger keyword list could not be compiled
    #[error("invalid keyword list: {0}")]
    InvalidKeywords(String),

    /// Named backend is not registered
    #[error("unknown backend: {id}")]
    UnknownBackend { id: String },

    /// Dispatch state machine was driven out of order
    #[error("illegal dispatch transition from {from:?} to {to:?}")]
    IllegalTransition { from: DispatchState, to: DispatchState },
}
