//! Error types for the fitcoach-analysis library.
//!
//! Storage, LLM and serialization failures are all funnelled into
//! [`PipelineError`]. The analysis surfaces (accessor, classifier,
//! extractors, orchestrator) never hand these to their callers; they log
//! them and fall back to their soft outcome instead.

use thiserror::Error;

/// Errors that can occur inside the analysis pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Connection pool errors
    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// Transport-level HTTP failure talking to the LLM service
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The LLM service answered with an error status or an unusable body
    #[error("LLM service error: {0}")]
    Llm(String),

    /// An LLM call did not finish within its time budget
    #[error("LLM call timed out after {0} ms")]
    Timeout(u64),

    /// Identity could not be mapped to an internal user
    #[error("User not found: {0}")]
    UserNotFound(String),

    /// Stored role value is not `user` or `assistant`
    #[error("Invalid message role: {0}")]
    InvalidRole(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// CSV output errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A blocking storage task was cancelled or panicked
    #[error("Background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    /// General error with context
    #[error("{0}")]
    Other(String),
}

/// Convenience type alias for Result with `PipelineError`
pub type Result<T> = std::result::Result<T, PipelineError>;

impl From<anyhow::Error> for PipelineError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
