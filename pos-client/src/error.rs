//! Client error types

use thiserror::Error;

/// Client error type
#[derive(Debug, Error)]
pub enum ClientError {
    /// Network-level failure (connect, timeout, body read)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Definitive non-success status after retries are exhausted.
    /// 4xx responses land here and are never retried.
    #[error("API returned {status} for {path}")]
    Status {
        status: reqwest::StatusCode,
        path: String,
    },

    /// The circuit breaker is open; the call never reached the network.
    /// Distinct from a network error so callers can serve stale data
    /// without waiting out a timeout.
    #[error("circuit breaker open, failing fast")]
    BreakerOpen,

    /// A payload field was missing or had the wrong shape
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// A receipt scan exceeded its whole-scan time budget
    #[error("receipt scan exceeded its time budget")]
    ScanBudget,
}

impl ClientError {
    /// True when the failure is a client-side (4xx) response: the request
    /// itself was wrong, so there is nothing to retry or fall back from.
    pub fn is_client_error(&self) -> bool {
        matches!(self, ClientError::Status { status, .. } if status.is_client_error())
    }
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;
