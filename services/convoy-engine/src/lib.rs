//! # convoy-engine
//!
//! Container engine port for Convoy.
//!
//! This crate abstracts the container runtime behind the [`Engine`] trait
//! and provides the observed container model (summaries, details, labels,
//! naming) shared by everything that talks to an engine. Implementations
//! live elsewhere; the convergence core only sees this surface.

#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::missing_const_for_fn)]

pub mod engine;
pub mod error;
pub mod labels;
pub mod names;
pub mod state;
pub mod version;

pub use engine::{CreateConfig, EndpointConfig, Engine, MountRequest, NetworkAttachment};
pub use error::{EngineError, Result};
pub use state::{
    ContainerDetail, ContainerId, ContainerState, ContainerSummary, EndpointSummary, HealthStatus,
    MountKind, MountSummary,
};
