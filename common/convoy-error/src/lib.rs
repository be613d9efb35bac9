//! Common error types for Convoy.
//!
//! This crate provides unified error types that are shared across multiple Convoy crates,
//! reducing code duplication and ensuring consistent error handling patterns.
//!
//! # Usage
//!
//! ```rust
//! use convoy_error::CommonError;
//!
//! fn example() -> Result<(), CommonError> {
//!     Err(CommonError::NotFound("resource".to_string()))
//! }
//! ```
//!
//! # Crate-Specific Errors
//!
//! Each crate can define its own error type that wraps `CommonError`:
//!
//! ```rust,ignore
//! use convoy_error::CommonError;
//! use thiserror::Error;
//!
//! #[derive(Debug, Error)]
//! pub enum MyError {
//!     #[error(transparent)]
//!     Common(#[from] CommonError),
//!
//!     #[error("my specific error: {0}")]
//!     Specific(String),
//! }
//! ```

mod common;

pub use common::CommonError;

/// Result type alias using `CommonError`.
pub type Result<T> = std::result::Result<T, CommonError>;
