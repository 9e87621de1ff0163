use thiserror::Error;

/// Generic failure reported by an external provider capability.
///
/// Provider calls may fail with a message; no richer contract is assumed.
/// The managers map this into the affected entity's terminal state rather
/// than letting it escape their public surface.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("provider error: {0}")]
pub struct ProviderError(pub String);

impl ProviderError {
    /// Create a provider error from any displayable message.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<String> for ProviderError {
    fn from(message: String) -> Self {
        Self(message)
    }
}

impl From<&str> for ProviderError {
    fn from(message: &str) -> Self {
        Self(message.to_string())
    }
}
