//! Centralized error types for MaculaCutis.

use thiserror::Error;

/// Main error type for MaculaCutis operations.
#[derive(Error, Debug)]
pub enum MaculaError {
    /// Bad input shape, size or type. User-correctable.
    #[error("{0}")]
    Validation(String),

    /// The external classification endpoint failed or replied with garbage.
    #[error("Classification failed: {0}")]
    Classification(String),

    #[error("Heatmap generation failed: {0}")]
    Heatmap(String),

    #[error("Storage error: {0}")]
    Storage(#[from] macula_db::DbError),

    /// Missing or invalid configuration detected before serving traffic.
    #[error("Startup error: {0}")]
    Startup(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for MaculaCutis operations.
pub type MaculaResult<T> = Result<T, MaculaError>;

impl MaculaError {
    /// Create a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a classification error.
    pub fn classification(msg: impl Into<String>) -> Self {
        Self::Classification(msg.into())
    }

    /// Create a heatmap error.
    pub fn heatmap(msg: impl Into<String>) -> Self {
        Self::Heatmap(msg.into())
    }

    /// Create a startup error.
    pub fn startup(msg: impl Into<String>) -> Self {
        Self::Startup(msg.into())
    }

    /// Create an unauthorized error.
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }
}
