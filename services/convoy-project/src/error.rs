//! Error types for the project model.

use convoy_error::CommonError;
use thiserror::Error;

/// Result type alias for project model operations.
pub type Result<T> = std::result::Result<T, ProjectError>;

/// Errors that can occur while working with the project model.
#[derive(Debug, Error)]
pub enum ProjectError {
    /// Common errors shared across Convoy crates.
    #[error(transparent)]
    Common(#[from] CommonError),

    /// Config hashing failed to serialize the service.
    #[error("failed to hash service config: {0}")]
    Hash(#[from] serde_json::Error),
}

impl ProjectError {
    /// Creates a new not found error.
    #[must_use]
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::Common(CommonError::not_found(resource))
    }
}
