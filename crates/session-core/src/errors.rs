use avlink_infra_common::ProviderError;
use thiserror::Error;

/// Result type for session operations.
pub type Result<T> = std::result::Result<T, SessionError>;

/// Session-related errors surfaced synchronously to callers.
///
/// Transport failures during a live session never appear here; they are
/// recorded on the session's status and broadcast on the event bus.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session not found: {0}")]
    NotFound(String),

    #[error("session already connected: {0}")]
    AlreadyConnected(String),

    #[error("invalid state transition: {0}")]
    InvalidTransition(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}
