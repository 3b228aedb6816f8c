//! Error types for Replicator.

use thiserror::Error;

/// Library-level error type for Replicator operations.
#[derive(Error, Debug)]
pub enum ReplicatorError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Ingestion failed: {0}")]
    Ingestion(String),

    #[error("Analysis failed: {0}")]
    Analysis(String),

    /// The model response could not be turned into an execution plan.
    /// `raw` keeps the offending text so it can be shown to a human.
    #[error("Malformed plan: {reason}")]
    MalformedPlan { reason: String, raw: String },

    #[error("Artifact error: {0}")]
    Artifact(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("External tool not found: {0}. Please install it and ensure it's in your PATH.")]
    ToolNotFound(String),

    #[error("External tool failed: {0}")]
    ToolFailed(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl ReplicatorError {
    /// Build a `MalformedPlan` error that carries the raw response text.
    pub fn malformed(reason: impl Into<String>, raw: &str) -> Self {
        ReplicatorError::MalformedPlan {
            reason: reason.into(),
            raw: raw.to_string(),
        }
    }

    /// The raw model text behind a malformed plan, if this is one.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            ReplicatorError::MalformedPlan { raw, .. } => Some(raw),
            _ => None,
        }
    }
}

/// Result type alias for Replicator operations.
pub type Result<T> = std::result::Result<T, ReplicatorError>;
