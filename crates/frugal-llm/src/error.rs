use std::time::Duration;

use frugal_core::HttpError;
use frugal_routing::{FailureKind, RoutingError};
use http::StatusCode;
use thiserror::Error;

/// Failure of a single backend call
///
/// Every variant is recoverable by trying the next candidate.
#[derive(Debug, Error)]
pub enum BackendError {
    /// No answer within the backend's time budget
    #[error("timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// Connection refused, transport failure, or a server-side error
    #[error("unavailable: {0}")]
    Unavailable(String),

    /// Malformed, unexpected, or empty response
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Backend rejected the call for quota or rate-limit reasons
    #[error("quota exceeded")]
    QuotaExceeded {
        /// Seconds the backend asked us to wait, when it said so
        retry_after: Option<u64>,
    },
}

impl BackendError {
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::Timeout(_) => FailureKind::Timeout,
            Self::Unavailable(_) => FailureKind::Unavailable,
            Self::InvalidResponse(_) => FailureKind::InvalidResponse,
            Self::QuotaExceeded { .. } => FailureKind::QuotaExceeded,
        }
    }
}

/// Errors surfaced to callers of the router
#[derive(Debug, Error)]
pub enum LlmError {
    /// Prompt was empty or too long
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Caller pinned a backend that is not registered
    #[error("backend not found: {0}")]
    BackendNotFound(String),

    /// Every candidate failed or was skipped
    #[error("all backends failed after {attempts} attempt(s)")]
    AllBackendsFailed {
        attempts: usize,
        last_error: Option<FailureKind>,
    },

    /// Unexpected internal error
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<RoutingError> for LlmError {
    fn from(error: RoutingError) -> Self {
        match error {
            RoutingError::UnknownBackend { id } => Self::BackendNotFound(id),
            other => Self::Internal(other.into()),
        }
    }
}

impl HttpError for LlmError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::BackendNotFound(_) => StatusCode::NOT_FOUND,
            Self::AllBackendsFailed { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_type(&self) -> &str {
        match self {
            Self::InvalidInput(_) => "invalid_request_error",
            Self::BackendNotFound(_) => "not_found_error",
            Self::AllBackendsFailed { .. } => "all_backends_failed",
            Self::Internal(_) => "internal_error",
        }
    }

    fn client_message(&self) -> String {
        match self {
            Self::AllBackendsFailed {
                attempts,
                last_error: Some(kind),
            } => format!("all backends failed after {attempts} attempt(s), last error: {kind}"),
            Self::Internal(_) => "an internal error occurred".to_owned(),
            other => other.to_string(),
        }
    }
}
