//! External plugin port.
//!
//! Provider services and post-start hooks are black boxes to the
//! convergence core: both are delegated through this trait. The default
//! [`NoPlugins`] implementation rejects provider services and ignores
//! hooks.

use crate::error::{ConvergeError, Result};
use async_trait::async_trait;
use convoy_engine::ContainerSummary;
use convoy_project::{Project, ServiceConfig, ServiceHook};

/// Host for provider plugins and in-container lifecycle hooks.
#[async_trait]
pub trait PluginRunner: Send + Sync {
    /// Runs the provider plugin for a service; the result is the full
    /// reconcile outcome for that service.
    async fn run_plugin(
        &self,
        project: &Project,
        service: &ServiceConfig,
        command: &str,
    ) -> Result<()>;

    /// Runs one post-start hook inside a container.
    async fn run_hook(
        &self,
        container: &ContainerSummary,
        service: &ServiceConfig,
        hook: &ServiceHook,
    ) -> Result<()>;
}

/// Plugin host used when the embedder configures none.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPlugins;

#[async_trait]
impl PluginRunner for NoPlugins {
    async fn run_plugin(
        &self,
        _project: &Project,
        service: &ServiceConfig,
        _command: &str,
    ) -> Result<()> {
        let kind = service
            .provider
            .as_ref()
            .map_or("unknown", |p| p.kind.as_str());
        Err(ConvergeError::invalid_config(format!(
            "service \"{}\" is managed by provider \"{}\" but no plugin runner is configured",
            service.name, kind
        )))
    }

    async fn run_hook(
        &self,
        container: &ContainerSummary,
        _service: &ServiceConfig,
        _hook: &ServiceHook,
    ) -> Result<()> {
        tracing::debug!(
            container = container.canonical_name(),
            "no plugin runner configured; skipping post-start hook"
        );
        Ok(())
    }
}
