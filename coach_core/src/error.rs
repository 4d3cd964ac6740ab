//! Error types for the coach_core library.

use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for coach_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Exercise or plan failed validation
    #[error("Plan validation error: {0}")]
    PlanValidation(String),

    /// Plan could not be produced by a plan source
    #[error("Plan error: {0}")]
    Plan(String),

    /// Storage backend refused or lost a write
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}
