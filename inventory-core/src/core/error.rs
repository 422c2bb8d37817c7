//! Unified error handling

use pos_client::ClientError;
use thiserror::Error;

use crate::db::repository::RepoError;

/// Application error enum
#[derive(Debug, Error)]
pub enum AppError {
    /// A fundamental identifier (product, store, job) could not be resolved
    #[error("not found: {0}")]
    NotFound(String),

    /// Operation refused because another one is in flight
    #[error("conflict: {0}")]
    Conflict(String),

    /// Input or record failed validation
    #[error("validation failed: {0}")]
    Validation(String),

    /// Persistent store failure
    #[error("database error: {0}")]
    Database(String),

    /// Upstream POS API failure
    #[error("POS API error: {0}")]
    Api(#[from] ClientError),

    /// Anything else
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        AppError::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        AppError::Conflict(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        AppError::Internal(anyhow::anyhow!(msg.into()))
    }
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound(msg) => AppError::NotFound(msg),
            other => AppError::Database(other.to_string()),
        }
    }
}

/// Result type for application operations
pub type AppResult<T> = Result<T, AppError>;
