use fm_integrations::IntegrationError;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// A phase failure: the task is marked `Failed` with this message.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A retry-wrapped step exhausted its attempts.
    #[error("{operation} failed: {source}")]
    Step {
        operation: &'static str,
        source: IntegrationError,
    },
    #[error("task {0} disappeared from the store")]
    TaskNotFound(String),
}

pub type Result<T> = std::result::Result<T, PipelineError>;

// ---------------------------------------------------------------------------
// Intents
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntentError {
    #[error("task {0} not found")]
    TaskNotFound(String),
    #[error("rating must be between 1 and 5 (got {0})")]
    InvalidRating(u8),
}

// ---------------------------------------------------------------------------
// Initialization
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum InitError {
    #[error("orchestration pool unreachable: {0}")]
    Unreachable(#[from] IntegrationError),
    #[error("cannot initialize while a run is active")]
    RunActive,
}
