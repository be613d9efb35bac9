//! Error types for convergence.

use convoy_engine::EngineError;
use convoy_error::CommonError;
use thiserror::Error;

/// Result type alias for convergence operations.
pub type Result<T> = std::result::Result<T, ConvergeError>;

/// Errors that can occur while converging a project.
#[derive(Debug, Error)]
pub enum ConvergeError {
    /// Common errors shared across Convoy crates.
    #[error(transparent)]
    Common(#[from] CommonError),

    /// The underlying engine rejected an operation or a container reported
    /// a failure.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// A reference to another service could not be resolved because the
    /// service has no observed containers.
    #[error("missing dependency: {0}")]
    MissingDependency(String),
}

impl ConvergeError {
    /// Creates a new invalid-configuration error.
    #[must_use]
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::Common(CommonError::config(msg))
    }

    /// Creates a new internal error.
    #[must_use]
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Common(CommonError::internal(msg))
    }

    /// Returns true if this is a configuration error.
    #[must_use]
    pub fn is_invalid_config(&self) -> bool {
        matches!(self, Self::Common(CommonError::Config(_)))
    }

    /// Returns true if this is a missing-dependency error.
    #[must_use]
    pub fn is_missing_dependency(&self) -> bool {
        matches!(self, Self::MissingDependency(_))
    }

    /// Returns true if this is a timeout.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::Common(CommonError::Timeout(_))
                | Self::Engine(EngineError::Common(CommonError::Timeout(_)))
        )
    }

    /// Returns true if this is an ambient cancellation.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            Self::Common(CommonError::Cancelled)
                | Self::Engine(EngineError::Common(CommonError::Cancelled))
        )
    }
}
