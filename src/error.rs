//! Error types for WellTrack Insight

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::chain::Stage;

/// Errors that can occur while producing predictions and recommendations
#[derive(Debug, Error)]
pub enum InsightError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Failed to load artifact {path:?}: {reason}")]
    ArtifactLoad { path: PathBuf, reason: String },

    #[error("Feature shape mismatch for {model} model: {reason}")]
    FeatureShape { model: &'static str, reason: String },

    #[error("Prediction failed at {stage} stage: {reason}")]
    StageFailure { stage: Stage, reason: String },

    #[error("Text generation failed: {0}")]
    Synthesis(#[from] SynthesisError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl InsightError {
    /// Whether the error was caused by the caller's input rather than by the service
    pub fn is_client_error(&self) -> bool {
        matches!(self, InsightError::Validation(_) | InsightError::Json(_))
    }
}

/// Failure of the external text-generation capability
#[derive(Debug, Clone, Error)]
pub enum SynthesisError {
    #[error("HTTP transport error: {0}")]
    Http(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("rate limited by text-generation service")]
    RateLimited,

    #[error("missing API key (set {0})")]
    MissingApiKey(String),

    #[error("empty response from text-generation service")]
    EmptyResponse,

    #[error("unparsable response: {0}")]
    InvalidResponse(String),
}

impl SynthesisError {
    /// Transient failures are worth another attempt; everything else fails fast
    pub fn is_transient(&self) -> bool {
        match self {
            SynthesisError::Http(_) | SynthesisError::Timeout(_) | SynthesisError::RateLimited => {
                true
            }
            SynthesisError::Api { status, .. } => *status >= 500,
            SynthesisError::MissingApiKey(_)
            | SynthesisError::EmptyResponse
            | SynthesisError::InvalidResponse(_) => false,
        }
    }
}
