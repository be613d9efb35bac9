//! Error types for engine operations.

use convoy_error::CommonError;
use thiserror::Error;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors that can occur during engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Common errors shared across Convoy crates.
    #[error(transparent)]
    Common(#[from] CommonError),

    /// The engine rejected an API call.
    #[error("engine api error: {0}")]
    Api(String),

    /// A container reported a failure at the container level: a forbidden
    /// non-zero exit code, an unhealthy healthcheck, or an unexpected state.
    #[error("container failure: {0}")]
    Container(String),
}

impl EngineError {
    /// Creates a new API error.
    #[must_use]
    pub fn api(msg: impl Into<String>) -> Self {
        Self::Api(msg.into())
    }

    /// Creates a new container-level failure.
    #[must_use]
    pub fn container(msg: impl Into<String>) -> Self {
        Self::Container(msg.into())
    }

    /// Creates a new not found error.
    #[must_use]
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::Common(CommonError::not_found(resource))
    }

    /// Returns true if this is a not found error.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Common(CommonError::NotFound(_)))
    }
}
