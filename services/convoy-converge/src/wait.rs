//! Wait-for-dependency gates.
//!
//! Before a service's start phase proceeds, each declared dependency is
//! polled until its condition holds. Required dependencies abort the run on
//! failure; optional ones downgrade to a warning and a skip.

use crate::convergence::Convergence;
use crate::error::{ConvergeError, Result};
use crate::progress::{container_progress_id, Event};
use convoy_engine::{ContainerState, ContainerSummary, EngineError, HealthStatus};
use convoy_error::CommonError;
use convoy_project::{Condition, Project, ServiceDependency};
use std::collections::BTreeMap;
use std::time::Duration;

/// Poll period for dependency conditions.
const POLL_PERIOD: Duration = Duration::from_millis(500);

impl Convergence {
    /// Waits until every declared dependency of `dependant` reaches its
    /// condition, a deadline expires, or the run is cancelled.
    ///
    /// Independent dependency waits run concurrently; the first fatal
    /// failure cancels the rest. When `timeout` is set, expiry surfaces as
    /// a timeout error.
    pub async fn wait_dependencies(
        &self,
        project: &Project,
        dependant: &str,
        dependencies: &BTreeMap<String, ServiceDependency>,
        timeout: Option<Duration>,
    ) -> Result<()> {
        if dependencies.is_empty() {
            return Ok(());
        }

        let wait_all = async {
            let mut waits = Vec::new();
            for (dep, config) in dependencies {
                if !should_wait(dep, config, project)? {
                    continue;
                }

                let waiting_for = self.observed.get(dep)?;
                self.progress.events(
                    waiting_for
                        .iter()
                        .map(|c| Event::waiting(container_progress_id(c))),
                );
                if waiting_for.is_empty() {
                    if config.required {
                        return Err(ConvergeError::MissingDependency(format!(
                            "{dependant} is missing dependency {dep}"
                        )));
                    }
                    tracing::warn!("{} is missing dependency {}", dependant, dep);
                    continue;
                }

                waits.push(self.wait_for_condition(dep, config, waiting_for));
            }
            futures::future::try_join_all(waits).await.map(|_| ())
        };

        match timeout {
            Some(deadline) if !deadline.is_zero() => {
                tokio::time::timeout(deadline, wait_all)
                    .await
                    .map_err(|_| CommonError::timeout("timeout waiting for dependencies"))?
            }
            _ => wait_all.await,
        }
    }

    async fn wait_for_condition(
        &self,
        dep: &str,
        config: &ServiceDependency,
        waiting_for: Vec<ContainerSummary>,
    ) -> Result<()> {
        let mut ticker = tokio::time::interval(POLL_PERIOD);
        // The first tick of an interval fires immediately; conditions are
        // only checked after a full poll period.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                () = self.token.cancelled() => return Ok(()),
            }

            match &config.condition {
                Condition::RunningOrHealthy => {
                    match self.is_service_healthy(&waiting_for, true).await {
                        Err(err) => {
                            if !config.required {
                                let reason = format!(
                                    "optional dependency \"{dep}\" is not running or is unhealthy"
                                );
                                self.skip_all(&waiting_for, &reason);
                                tracing::warn!("{}: {}", reason, err);
                                return Ok(());
                            }
                            return Err(err);
                        }
                        Ok(true) => {
                            self.progress.events(
                                waiting_for
                                    .iter()
                                    .map(|c| Event::healthy(container_progress_id(c))),
                            );
                            return Ok(());
                        }
                        Ok(false) => {}
                    }
                }
                Condition::Healthy => {
                    match self.is_service_healthy(&waiting_for, false).await {
                        Err(err) => {
                            if !config.required {
                                let reason =
                                    format!("optional dependency \"{dep}\" failed to start");
                                self.skip_all(&waiting_for, &reason);
                                tracing::warn!("{}: {}", reason, err);
                                return Ok(());
                            }
                            self.progress.events(
                                waiting_for
                                    .iter()
                                    .map(|c| Event::error(container_progress_id(c), err.to_string())),
                            );
                            return Err(err);
                        }
                        Ok(true) => {
                            self.progress.events(
                                waiting_for
                                    .iter()
                                    .map(|c| Event::healthy(container_progress_id(c))),
                            );
                            return Ok(());
                        }
                        Ok(false) => {}
                    }
                }
                Condition::CompletedSuccessfully => {
                    if let Some(code) = self.service_exit_code(&waiting_for).await? {
                        if code == 0 {
                            self.progress.events(
                                waiting_for
                                    .iter()
                                    .map(|c| Event::exited(container_progress_id(c))),
                            );
                            return Ok(());
                        }

                        let suffix =
                            format!("\"{dep}\" didn't complete successfully: exit {code}");
                        if !config.required {
                            let reason = format!("optional dependency {suffix}");
                            self.skip_all(&waiting_for, &reason);
                            tracing::warn!("{}", reason);
                            return Ok(());
                        }
                        let message = format!("service {suffix}");
                        self.progress.events(
                            waiting_for
                                .iter()
                                .map(|c| Event::error(container_progress_id(c), message.clone())),
                        );
                        return Err(EngineError::container(message).into());
                    }
                }
                Condition::Started => return Ok(()),
                Condition::Other(other) => {
                    tracing::warn!("unsupported depends_on condition: {}", other);
                    return Ok(());
                }
            }
        }
    }

    fn skip_all(&self, waiting_for: &[ContainerSummary], reason: &str) {
        self.progress.events(
            waiting_for
                .iter()
                .map(|c| Event::skipped(container_progress_id(c), reason.to_string())),
        );
    }

    /// Returns true when every container satisfies the health condition.
    ///
    /// `fallback_running` lets a container with no configured healthcheck
    /// satisfy the condition by simply running; without it such a container
    /// is a configuration error.
    async fn is_service_healthy(
        &self,
        containers: &[ContainerSummary],
        fallback_running: bool,
    ) -> Result<bool> {
        for container in containers {
            let detail = self.guard(self.engine.inspect(&container.id)).await?;
            let name = detail.name.trim_start_matches('/');

            if detail.state == ContainerState::Exited {
                return Err(EngineError::container(format!(
                    "container {name} exited ({})",
                    detail.exit_code.unwrap_or_default()
                ))
                .into());
            }

            if !detail.has_healthcheck {
                if fallback_running {
                    if detail.state == ContainerState::Running {
                        continue;
                    }
                    return Ok(false);
                }
                return Err(ConvergeError::invalid_config(format!(
                    "container {name} has no healthcheck configured"
                )));
            }

            match detail.health {
                Some(HealthStatus::Healthy) => {}
                Some(HealthStatus::Unhealthy) => {
                    return Err(EngineError::container(format!(
                        "container {name} is unhealthy"
                    ))
                    .into());
                }
                Some(HealthStatus::Starting) | None => return Ok(false),
            }
        }
        Ok(true)
    }

    /// Exit code of the first container observed exited, if any.
    async fn service_exit_code(&self, containers: &[ContainerSummary]) -> Result<Option<i64>> {
        for container in containers {
            let detail = self.guard(self.engine.inspect(&container.id)).await?;
            if detail.state == ContainerState::Exited {
                return Ok(Some(detail.exit_code.unwrap_or_default()));
            }
        }
        Ok(None)
    }
}

/// Decides whether a dependency needs an active wait at all.
///
/// `service_started` is already satisfied by dependency-ordered
/// convergence; disabled services, zero-scale services, and provider
/// services are skipped.
fn should_wait(dep: &str, config: &ServiceDependency, project: &Project) -> Result<bool> {
    if config.condition == Condition::Started {
        return Ok(false);
    }
    match project.service(dep) {
        None if project.is_disabled(dep) => Ok(false),
        None => Err(ConvergeError::MissingDependency(format!(
            "depends_on references unknown service {dep}"
        ))),
        Some(service) if service.scale() == 0 => Ok(false),
        Some(service) if service.provider.is_some() => Ok(false),
        Some(_) => Ok(true),
    }
}
