//! Error types for the fitrec recommender
//!
//! This module provides structured error definitions with thiserror. Library
//! code returns [`Result`]; the CLI layers anyhow context on top.

use thiserror::Error;

/// Main error type for fitrec operations
#[derive(Error, Debug)]
pub enum FitrecError {
    /// Malformed input (rating out of range, bad profile field, empty program id)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Durable write failed; the caller should treat the data as not recorded
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// No model could be loaded or bootstrapped
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    /// Feature preparation, fitting or artifact persistence failed during a retrain
    #[error("Retrain failed: {0}")]
    Retrain(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

/// Result type alias for fitrec operations
pub type Result<T> = std::result::Result<T, FitrecError>;

/// Convert anyhow::Error to FitrecError
impl From<anyhow::Error> for FitrecError {
    fn from(err: anyhow::Error) -> Self {
        FitrecError::Other(err.to_string())
    }
}
