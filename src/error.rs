//! Error types for the risk & compliance orchestrator

use thiserror::Error;

/// Result type alias for orchestrator operations
pub type Result<T> = std::result::Result<T, OrchestrationError>;

#[derive(Error, Debug)]
pub enum OrchestrationError {

    // =============================
    // Core Pipeline Errors
    // =============================

    /// A transaction field was present but could not be coerced.
    /// Absent fields never produce this; they take their default.
    #[error("Invalid feature '{field}': {reason}")]
    InvalidFeature { field: String, reason: String },

    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Scoring failed: {0}")]
    ScoringFailed(String),

    #[error("Classification parse failure: {0}")]
    ClassificationParse(String),

    #[error("Text generation failed: {0}")]
    GenerationFailed(String),

    #[error("Configuration error: {0}")]
    Config(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl OrchestrationError {
    pub fn invalid_feature(field: &str, reason: impl Into<String>) -> Self {
        Self::InvalidFeature {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    /// Errors caused by caller input rather than by the system.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::InvalidFeature { .. })
    }
}
