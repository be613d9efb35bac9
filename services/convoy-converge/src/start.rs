//! The start phase.
//!
//! After convergence, services are started in dependency order; each
//! service's stopped containers are started only once its declared
//! dependency conditions hold. Engine start calls across the whole process
//! are serialized, because some engines race when assigning host ports from
//! ranges.

use crate::convergence::Convergence;
use crate::error::{ConvergeError, Result};
use crate::graph::in_dependency_order;
use crate::progress::{container_progress_id, Event};
use convoy_engine::{ContainerState, ContainerSummary, EngineError};
use convoy_project::Project;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Serializes engine start calls process-wide, across concurrent
/// convergence runs against the same engine.
static START_GUARD: Mutex<()> = Mutex::const_new(());

impl Convergence {
    /// Starts every service of the project in dependency order, gating each
    /// on its declared dependency conditions.
    pub async fn start(
        self: &Arc<Self>,
        project: &Arc<Project>,
        wait_timeout: Option<Duration>,
    ) -> Result<()> {
        let this = Arc::clone(self);
        let project_handle = Arc::clone(project);
        in_dependency_order(project, &self.token, move |name| {
            let this = Arc::clone(&this);
            let project = Arc::clone(&project_handle);
            async move { this.start_service(&project, &name, wait_timeout).await }
        })
        .await
    }

    /// Starts one service's stopped containers once its dependency
    /// conditions hold, running post-start hooks after each start.
    pub(crate) async fn start_service(
        &self,
        project: &Project,
        name: &str,
        wait_timeout: Option<Duration>,
    ) -> Result<()> {
        let Some(service) = project.service(name) else {
            return Err(ConvergeError::internal(format!("unknown service \"{name}\"")));
        };
        if service.provider.is_some() {
            return Ok(());
        }

        self.wait_dependencies(project, &service.name, &service.depends_on, wait_timeout)
            .await?;

        let containers = self.observed.get(&service.name)?;
        if containers.is_empty() {
            if service.scale() == 0 {
                return Ok(());
            }
            return Err(EngineError::container(format!(
                "service \"{}\" has no container to start",
                service.name
            ))
            .into());
        }

        for container in &containers {
            if container.state == ContainerState::Running {
                continue;
            }

            let event_id = container_progress_id(container);
            self.progress.event(Event::starting(&event_id));
            self.serialized_start(container).await?;

            for hook in &service.post_start {
                self.plugins.run_hook(container, service, hook).await?;
            }

            self.progress.event(Event::started(&event_id));
        }
        Ok(())
    }

    /// Restarts a stray stopped container found during reconciliation.
    pub(crate) async fn restart_container(&self, container: &ContainerSummary) -> Result<()> {
        let event_id = container_progress_id(container);
        self.progress.event(Event::working(&event_id, "Restart"));
        self.serialized_start(container).await?;
        self.progress.event(Event::done(&event_id, "Restarted"));
        Ok(())
    }

    async fn serialized_start(&self, container: &ContainerSummary) -> Result<()> {
        let _serial = START_GUARD.lock().await;
        self.guard(self.engine.start(&container.id)).await
    }
}
