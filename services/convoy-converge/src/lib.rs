//! # convoy-converge
//!
//! The convergence engine for Convoy.
//!
//! Given a [`Project`](convoy_project::Project) and a snapshot of the
//! containers an engine currently runs, [`Convergence`] moves the observed
//! state toward the declared one: creating, recreating, starting, stopping,
//! and removing containers per service, in dependency order, honoring
//! wait-for-condition gates between services.
//!
//! Image building and pulling, network/volume/secret materialization, and
//! project loading happen upstream; the engine itself is only reached
//! through the [`Engine`](convoy_engine::Engine) port.

#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::significant_drop_tightening)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::default_trait_access)]

pub mod convergence;
pub mod divergence;
pub mod error;
pub mod graph;
pub mod links;
pub mod observed;
pub mod plugins;
pub mod progress;
pub mod resolver;
pub mod start;
pub mod wait;

pub use convergence::{ConvergeOptions, Convergence};
pub use divergence::{must_recreate, RecreatePolicy, OVERLAY_NETWORK_PLACEHOLDER};
pub use error::{ConvergeError, Result};
pub use graph::{in_dependency_order, ServiceGraph};
pub use observed::ObservedState;
pub use plugins::{NoPlugins, PluginRunner};
pub use progress::{container_progress_id, Event, EventStatus, ProgressWriter};
