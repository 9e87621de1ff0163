use avlink_infra_common::ProviderError;
use thiserror::Error;

/// Result type for task operations.
pub type Result<T> = std::result::Result<T, TaskError>;

/// Task-related errors surfaced synchronously to callers.
///
/// Provider failures during an asynchronous run never appear here; they
/// are recorded on the task's state and broadcast on the event bus.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("task not found: {0}")]
    NotFound(String),

    #[error("invalid resource reference: {0}")]
    InvalidResource(String),

    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("task already started: {0}")]
    AlreadyStarted(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}
