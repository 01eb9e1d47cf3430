//! Error types for backend calls.

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when calling an extraction backend.
#[derive(Error, Debug)]
pub enum BackendError {
    /// Network connectivity error (DNS, connection refused, etc.).
    #[error("Network error: {0}")]
    Network(String),

    /// Request exceeded deadline.
    #[error("Request timeout after {0}ms")]
    Timeout(u64),

    /// Backend returned an error response (non-429 4xx, 5xx).
    #[error("Backend error {status}: {message}")]
    Upstream { status: u16, message: String },

    /// Backend rejected the request due to rate limiting or quota.
    #[error("Rate limited by backend")]
    RateLimited { retry_after: Option<Duration> },

    /// Authentication or authorization failure.
    #[error("Authentication rejected: {0}")]
    Auth(String),

    /// Backend response doesn't match the expected format.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Backend configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl BackendError {
    /// Short stable tag for metrics labels and persisted error details.
    pub fn kind(&self) -> &'static str {
        match self {
            BackendError::Network(_) => "network",
            BackendError::Timeout(_) => "timeout",
            BackendError::Upstream { .. } => "upstream",
            BackendError::RateLimited { .. } => "rate_limited",
            BackendError::Auth(_) => "auth",
            BackendError::InvalidResponse(_) => "invalid_response",
            BackendError::Configuration(_) => "configuration",
        }
    }
}
