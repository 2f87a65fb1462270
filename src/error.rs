//! Gateway error taxonomy.
//!
//! Every failure path in the gateway resolves to one of these variants and,
//! at the HTTP boundary, to a response. Backend or store failures never
//! crash the process.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Gateway error type.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Unknown service name or empty instance list.
    #[error("service not found: {0}")]
    NotFound(String),

    /// Malformed registration or unsupported action.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// All resolvable instances failed or are circuit-open; store unreachable.
    #[error("service unavailable: {0}")]
    Unavailable(String),

    /// Gateway-wide concurrency limit reached.
    #[error("too many requests")]
    AdmissionRejected,

    /// Prepare phase did not reach unanimous ready.
    #[error("transaction {0} aborted during prepare")]
    TransactionAborted(String),

    /// Commit phase had an error, compensated by rollback.
    #[error("transaction {0} failed during commit")]
    TransactionFailed(String),

    /// Registry store error.
    #[error("store error: {0}")]
    Store(String),

    /// Outbound HTTP error.
    #[error("upstream error: {0}")]
    Upstream(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<redis::RedisError> for GatewayError {
    fn from(err: redis::RedisError) -> Self {
        GatewayError::Store(err.to_string())
    }
}

impl GatewayError {
    /// HTTP status this error surfaces as.
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::NotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            GatewayError::Unavailable(_) | GatewayError::Store(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            GatewayError::AdmissionRejected => StatusCode::TOO_MANY_REQUESTS,
            GatewayError::TransactionAborted(_)
            | GatewayError::TransactionFailed(_)
            | GatewayError::Upstream(_)
            | GatewayError::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

/// Result type for gateway operations.
pub type Result<T> = std::result::Result<T, GatewayError>;
