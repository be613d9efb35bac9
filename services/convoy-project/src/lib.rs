//! # convoy-project
//!
//! Desired-state model for Convoy.
//!
//! This crate provides the declarative project model that drives convergence:
//! a named set of services with dependencies, scale, networks, volumes, and
//! lifecycle policy, plus the deterministic config-hash used to detect
//! divergence between desired and observed containers.

#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::struct_excessive_bools)]

pub mod error;
pub mod hash;
pub mod project;
pub mod service;

pub use error::{ProjectError, Result};
pub use hash::service_hash;
pub use project::Project;
pub use service::{
    Condition, ServiceConfig, ServiceDependency, ServiceHook, ServiceNetwork, ServiceProvider,
    ServiceVolume,
};
