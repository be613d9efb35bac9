//! Per-service reconciliation and the convergence entry points.
//!
//! Based on the initially observed state, [`Convergence`] reconciles each
//! service's containers with the desired configuration: re-creating
//! divergent containers, adding or removing replicas, and starting stopped
//! containers. Cross-service dependencies are handled by converging in
//! dependency order and rewriting `service:<name>` references once the
//! upstream service has converged.

use crate::divergence::{must_recreate, RecreatePolicy};
use crate::error::{ConvergeError, Result};
use crate::graph::in_dependency_order;
use crate::links::get_links;
use crate::observed::ObservedState;
use crate::plugins::{NoPlugins, PluginRunner};
use crate::progress::{container_progress_id, Event, ProgressWriter};
use crate::resolver::resolve_service_references;
use convoy_engine::engine::MULTI_NETWORK_CREATE_VERSION;
use convoy_engine::{
    labels, names, version, ContainerState, ContainerSummary, CreateConfig, EndpointConfig,
    Engine, MountKind, MountRequest, NetworkAttachment,
};
use convoy_error::CommonError;
use convoy_project::{service_hash, Project, ServiceConfig, ServiceVolume};
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Options for one convergence run.
#[derive(Debug, Clone, Default)]
pub struct ConvergeOptions {
    /// Recreate policy for explicitly selected services.
    pub recreate: RecreatePolicy,
    /// Recreate policy for everything pulled in as a dependency.
    pub recreate_dependencies: RecreatePolicy,
    /// Explicitly selected services; empty means none are selected and all
    /// services use `recreate_dependencies`.
    pub services: Vec<String>,
    /// Inherit anonymous volumes from the replaced container on recreate.
    pub inherit: bool,
    /// Grace period for container stops.
    pub timeout: Option<Duration>,
    /// Deadline for dependency waits during the start phase.
    pub wait_timeout: Option<Duration>,
}

/// Convergence engine for one project against one container engine.
pub struct Convergence {
    pub(crate) engine: Arc<dyn Engine>,
    pub(crate) plugins: Arc<dyn PluginRunner>,
    pub(crate) progress: ProgressWriter,
    pub(crate) observed: ObservedState,
    pub(crate) networks: Option<HashMap<String, String>>,
    pub(crate) volumes: Option<HashMap<String, String>>,
    pub(crate) token: CancellationToken,
}

impl Convergence {
    /// Creates a convergence run seeded with the engine snapshot taken at
    /// its start. One-off containers are filtered out of the snapshot.
    #[must_use]
    pub fn new(engine: Arc<dyn Engine>, project: &Project, snapshot: Vec<ContainerSummary>) -> Self {
        Self {
            engine,
            plugins: Arc::new(NoPlugins),
            progress: ProgressWriter::new(),
            observed: ObservedState::new(project, snapshot),
            networks: None,
            volumes: None,
            token: CancellationToken::new(),
        }
    }

    /// Supplies the declared-network-name → engine-network-id map used for
    /// attachment checks.
    #[must_use]
    pub fn with_networks(mut self, networks: HashMap<String, String>) -> Self {
        self.networks = Some(networks);
        self
    }

    /// Supplies the declared-volume-name → engine-volume-name map used for
    /// mount checks.
    #[must_use]
    pub fn with_volumes(mut self, volumes: HashMap<String, String>) -> Self {
        self.volumes = Some(volumes);
        self
    }

    /// Supplies the plugin host for provider services and post-start hooks.
    #[must_use]
    pub fn with_plugins(mut self, plugins: Arc<dyn PluginRunner>) -> Self {
        self.plugins = plugins;
        self
    }

    /// Supplies the ambient cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    /// The observed state store for this run.
    #[must_use]
    pub fn observed(&self) -> &ObservedState {
        &self.observed
    }

    /// The progress writer for this run; subscribe for events.
    #[must_use]
    pub fn progress(&self) -> &ProgressWriter {
        &self.progress
    }

    /// Converges every service of the project, in dependency order, then
    /// runs the start phase with its dependency-condition gates.
    pub async fn up(self: &Arc<Self>, project: &Arc<Project>, options: &ConvergeOptions) -> Result<()> {
        self.apply(project, options).await?;
        self.start(project, options.wait_timeout).await
    }

    /// Converges every service of the project in dependency order without
    /// starting stopped containers.
    pub async fn apply(
        self: &Arc<Self>,
        project: &Arc<Project>,
        options: &ConvergeOptions,
    ) -> Result<()> {
        let this = Arc::clone(self);
        let project_handle = Arc::clone(project);
        let options = options.clone();
        in_dependency_order(project, &self.token, move |name| {
            let this = Arc::clone(&this);
            let project = Arc::clone(&project_handle);
            let options = options.clone();
            async move {
                let policy = if options.services.iter().any(|s| *s == name) {
                    options.recreate
                } else {
                    options.recreate_dependencies
                };
                this.ensure_service(&project, &name, policy, options.inherit, options.timeout)
                    .await
            }
        })
        .await
    }

    /// Reconciles one service: scales down excess replicas, recreates
    /// divergent containers, enforces survivors are running, and scales up
    /// missing replicas. The observed store is updated even when a task
    /// fails, so partial progress informs downstream services.
    pub(crate) async fn ensure_service(
        self: &Arc<Self>,
        project: &Arc<Project>,
        name: &str,
        policy: RecreatePolicy,
        inherit: bool,
        timeout: Option<Duration>,
    ) -> Result<()> {
        let Some(service) = project.service(name) else {
            return Err(ConvergeError::internal(format!("unknown service \"{name}\"")));
        };
        if service.provider.is_some() {
            return self.plugins.run_plugin(project, service, "up").await;
        }

        let expected = usize::try_from(get_scale(service)?)
            .map_err(|_| ConvergeError::invalid_config("scale out of range"))?;

        let mut service = service.clone();
        resolve_service_references(&self.observed, &mut service)?;

        let containers = self.observed.get(&service.name)?;
        let actual = containers.len();

        let mut flagged = Vec::with_capacity(actual);
        for container in containers {
            let divergent = must_recreate(
                &project.name,
                &service,
                &container,
                policy,
                self.networks.as_ref(),
                self.volumes.as_ref(),
            )?;
            flagged.push((container, divergent));
        }
        let flagged = order_for_traversal(flagged);
        let next = next_container_number(flagged.iter().map(|(c, _)| c));

        let service = Arc::new(service);
        let mut updated: Vec<Option<ContainerSummary>> = vec![None; expected];
        let mut tasks: Vec<JoinHandle<Result<Option<(usize, ContainerSummary)>>>> = Vec::new();

        for (i, (container, divergent)) in flagged.into_iter().enumerate() {
            if i >= expected {
                // Scale down: the traversal order puts the most divergent
                // and highest-numbered containers at the dropped tail.
                let this = Arc::clone(self);
                tasks.push(tokio::spawn(async move {
                    this.stop_and_remove_container(&container, timeout)
                        .await
                        .map(|()| None)
                }));
                continue;
            }

            if divergent {
                self.stop_dependent_containers(project, &service, timeout)
                    .await?;

                let this = Arc::clone(self);
                let project = Arc::clone(project);
                let service = Arc::clone(&service);
                tasks.push(tokio::spawn(async move {
                    this.recreate_container(&project, &service, container, inherit, timeout)
                        .await
                        .map(|c| Some((i, c)))
                }));
                continue;
            }

            // Enforce that surviving, non-divergent containers are running.
            match container.state {
                ContainerState::Running => {
                    self.progress
                        .event(Event::done(container_progress_id(&container), "Running"));
                    updated[i] = Some(container);
                }
                ContainerState::Created
                | ContainerState::Restarting
                | ContainerState::Exited => {
                    updated[i] = Some(container);
                }
                _ => {
                    let this = Arc::clone(self);
                    tasks.push(tokio::spawn(async move {
                        this.restart_container(&container)
                            .await
                            .map(|()| Some((i, container)))
                    }));
                }
            }
        }

        for k in 0..expected.saturating_sub(actual) {
            // Scale up.
            let number = next + k as u64;
            let container_name = container_name(&project.name, &service, number);
            let this = Arc::clone(self);
            let project = Arc::clone(project);
            let service = Arc::clone(&service);
            let slot = actual + k;
            tasks.push(tokio::spawn(async move {
                this.create_container(&project, &service, container_name, number)
                    .await
                    .map(|c| Some((slot, c)))
            }));
        }

        let mut first_error: Option<ConvergeError> = None;
        for task in tasks {
            match task.await {
                Ok(Ok(Some((slot, container)))) => updated[slot] = Some(container),
                Ok(Ok(None)) => {}
                Ok(Err(err)) => {
                    if first_error.is_none() {
                        first_error = Some(err);
                    }
                }
                Err(join_err) => {
                    if first_error.is_none() {
                        first_error =
                            Some(ConvergeError::internal(format!("reconcile task failed: {join_err}")));
                    }
                }
            }
        }

        self.observed
            .set(&service.name, updated.into_iter().flatten().collect())?;
        first_error.map_or(Ok(()), Err)
    }

    /// Stops every service that depends on `service` with `restart: true`
    /// and marks its observed containers exited, so the start phase brings
    /// them back up after the recreate settles.
    async fn stop_dependent_containers(
        &self,
        project: &Project,
        service: &ServiceConfig,
        timeout: Option<Duration>,
    ) -> Result<()> {
        for dependent in project.dependents_with_restart(&service.name) {
            let containers = self.observed.get(&dependent)?;
            futures::future::try_join_all(
                containers
                    .iter()
                    .map(|container| self.stop_container(container, timeout)),
            )
            .await?;

            let mut stopped = containers;
            for container in &mut stopped {
                container.state = ContainerState::Exited;
            }
            self.observed.set(&dependent, stopped)?;
        }
        Ok(())
    }

    async fn stop_container(
        &self,
        container: &ContainerSummary,
        timeout: Option<Duration>,
    ) -> Result<()> {
        let event_id = container_progress_id(container);
        self.progress.event(Event::working(&event_id, "Stopping"));
        match self.guard(self.engine.stop(&container.id, timeout)).await {
            Ok(()) => {
                self.progress.event(Event::done(&event_id, "Stopped"));
                Ok(())
            }
            Err(err) => {
                if !err.is_cancelled() {
                    self.progress.event(Event::error(&event_id, err.to_string()));
                }
                Err(err)
            }
        }
    }

    async fn stop_and_remove_container(
        &self,
        container: &ContainerSummary,
        timeout: Option<Duration>,
    ) -> Result<()> {
        let event_id = container_progress_id(container);
        self.progress.event(Event::working(&event_id, "Stopping"));
        let result = async {
            self.guard(self.engine.stop(&container.id, timeout)).await?;
            self.progress.event(Event::working(&event_id, "Removing"));
            self.guard(self.engine.remove(&container.id)).await
        }
        .await;
        match result {
            Ok(()) => {
                self.progress.event(Event::done(&event_id, "Removed"));
                Ok(())
            }
            Err(err) => {
                if !err.is_cancelled() {
                    self.progress.event(Event::error(&event_id, err.to_string()));
                }
                Err(err)
            }
        }
    }

    /// Creates one new replica for a scale-up.
    async fn create_container(
        &self,
        project: &Project,
        service: &ServiceConfig,
        name: String,
        number: u64,
    ) -> Result<ContainerSummary> {
        let event_id = format!("Container {name}");
        self.progress.event(Event::creating(&event_id));
        match self
            .create_raw(project, service, &name, number, None, BTreeMap::new())
            .await
        {
            Ok(created) => {
                self.progress.event(Event::created(&event_id));
                Ok(created)
            }
            Err(err) => {
                if !err.is_cancelled() {
                    self.progress.event(Event::error(&event_id, err.to_string()));
                }
                Err(err)
            }
        }
    }

    /// Replaces a container: create under a transient name, stop and remove
    /// the victim, then rename the replacement to the canonical name. On
    /// failure after the create, the transient container is left behind for
    /// the next run to converge away; there is no rollback.
    async fn recreate_container(
        &self,
        project: &Project,
        service: &ServiceConfig,
        replaced: ContainerSummary,
        inherit: bool,
        timeout: Option<Duration>,
    ) -> Result<ContainerSummary> {
        let event_id = container_progress_id(&replaced);
        self.progress.event(Event::working(&event_id, "Recreate"));
        match self
            .recreate_steps(project, service, &replaced, inherit, timeout)
            .await
        {
            Ok(created) => {
                self.progress.event(Event::done(&event_id, "Recreated"));
                Ok(created)
            }
            Err(err) => {
                if !err.is_cancelled() {
                    self.progress.event(Event::error(&event_id, err.to_string()));
                }
                Err(err)
            }
        }
    }

    async fn recreate_steps(
        &self,
        project: &Project,
        service: &ServiceConfig,
        replaced: &ContainerSummary,
        inherit: bool,
        timeout: Option<Duration>,
    ) -> Result<ContainerSummary> {
        let number = replaced.number().ok_or_else(|| {
            ConvergeError::internal(format!(
                "container {} has a missing or invalid {} label",
                replaced.id,
                labels::CONTAINER_NUMBER
            ))
        })?;

        let replaced_name = service.container_name.clone().unwrap_or_else(|| {
            format!("{}{}{}", service.name, names::SEPARATOR, number)
        });
        let name = container_name(&project.name, service, number);
        let tmp_name = names::transient_container_name(replaced.id.as_str(), &name);

        let mut extra_labels = BTreeMap::new();
        extra_labels.insert(labels::REPLACE.to_string(), replaced_name);

        let inherited = inherit.then_some(replaced);
        let mut created = self
            .create_raw(project, service, &tmp_name, number, inherited, extra_labels)
            .await?;

        self.guard(self.engine.stop(&replaced.id, timeout)).await?;
        self.guard(self.engine.remove(&replaced.id)).await?;
        self.guard(self.engine.rename(&created.id, &name)).await?;
        created.names = vec![format!("/{name}")];
        Ok(created)
    }

    /// Creates a container and returns its observed summary. For engines
    /// that only accept the primary network at create, the remaining
    /// networks are attached one at a time in declared-priority order.
    async fn create_raw(
        &self,
        project: &Project,
        service: &ServiceConfig,
        name: &str,
        number: u64,
        inherit: Option<&ContainerSummary>,
        extra_labels: BTreeMap<String, String>,
    ) -> Result<ContainerSummary> {
        let mut config =
            self.build_create_config(project, service, name, number, inherit, extra_labels)?;

        let api_version = self.guard(self.engine.api_version()).await?;
        let deferred = if version::less_than(&api_version, MULTI_NETWORK_CREATE_VERSION)
            && config.networks.len() > 1
        {
            config.networks.split_off(1)
        } else {
            Vec::new()
        };

        let id = self.guard(self.engine.create(config)).await?;
        let detail = self.guard(self.engine.inspect(&id)).await?;
        let created = ContainerSummary::from(&detail);

        for attachment in deferred {
            self.guard(
                self.engine
                    .connect_network(&attachment.network, &id, attachment.endpoint),
            )
            .await?;
        }
        Ok(created)
    }

    fn build_create_config(
        &self,
        project: &Project,
        service: &ServiceConfig,
        name: &str,
        number: u64,
        inherit: Option<&ContainerSummary>,
        extra_labels: BTreeMap<String, String>,
    ) -> Result<CreateConfig> {
        let config_hash = service_hash(service)
            .map_err(|e| CommonError::internal(format!("failed to hash service config: {e}")))?;

        let mut container_labels = service.labels.clone();
        container_labels.insert(labels::PROJECT.to_string(), project.name.clone());
        container_labels.insert(labels::SERVICE.to_string(), service.name.clone());
        container_labels.insert(labels::CONTAINER_NUMBER.to_string(), number.to_string());
        container_labels.insert(labels::CONFIG_HASH.to_string(), config_hash);
        container_labels.insert(
            labels::ONE_OFF.to_string(),
            labels::ONE_OFF_FALSE.to_string(),
        );
        container_labels.insert(
            labels::VERSION.to_string(),
            env!("CARGO_PKG_VERSION").to_string(),
        );
        if let Some(digest) = &service.image_digest {
            container_labels.insert(labels::IMAGE_DIGEST.to_string(), digest.clone());
        }
        container_labels.extend(extra_labels);

        let env: Vec<String> = service
            .environment
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();

        let mut mounts = Vec::new();
        for volume in &service.volumes {
            mounts.push(match volume {
                ServiceVolume::Bind {
                    source,
                    target,
                    read_only,
                } => MountRequest {
                    kind: MountKind::Bind,
                    source: source.clone(),
                    target: target.clone(),
                    read_only: *read_only,
                },
                ServiceVolume::Volume {
                    source,
                    target,
                    read_only,
                } => MountRequest {
                    kind: MountKind::Volume,
                    source: self.resolve_volume_name(source),
                    target: target.clone(),
                    read_only: *read_only,
                },
                ServiceVolume::Tmpfs { target, .. } => MountRequest {
                    kind: MountKind::Tmpfs,
                    source: String::new(),
                    target: target.clone(),
                    read_only: false,
                },
            });
        }
        if let Some(victim) = inherit {
            // Keep the victim's engine-managed volumes so anonymous volume
            // data survives the recreate.
            for mount in &victim.mounts {
                if mount.kind == MountKind::Volume
                    && !mounts.iter().any(|m| m.target == mount.target)
                {
                    mounts.push(MountRequest {
                        kind: MountKind::Volume,
                        source: mount.name.clone(),
                        target: mount.target.clone(),
                        read_only: false,
                    });
                }
            }
        }

        let shared_links = get_links(&self.observed, &project.name, service, number)?;

        let mut attachments = Vec::new();
        for net_name in service.networks_by_priority() {
            let declared = &service.networks[net_name];
            let network = self
                .networks
                .as_ref()
                .and_then(|m| m.get(net_name))
                .cloned()
                .unwrap_or_else(|| net_name.to_string());
            let mut aliases = declared.aliases.clone();
            aliases.push(service.name.clone());
            attachments.push(NetworkAttachment {
                network,
                endpoint: EndpointConfig {
                    aliases,
                    ipv4_address: declared.ipv4_address.clone(),
                    ipv6_address: declared.ipv6_address.clone(),
                    links: shared_links.clone(),
                },
            });
        }

        Ok(CreateConfig {
            name: name.to_string(),
            image: service.image.clone(),
            labels: container_labels,
            env,
            mounts,
            networks: attachments,
            network_mode: service.network_mode.clone(),
            ipc: service.ipc.clone(),
            pid: service.pid.clone(),
            volumes_from: service.volumes_from.clone(),
            links: shared_links,
            platform: service.platform.clone(),
        })
    }

    fn resolve_volume_name(&self, declared: &str) -> String {
        if declared.is_empty() {
            return String::new();
        }
        self.volumes
            .as_ref()
            .and_then(|m| m.get(declared))
            .cloned()
            .unwrap_or_else(|| declared.to_string())
    }

    /// Races an engine operation against ambient cancellation.
    pub(crate) async fn guard<T, E>(
        &self,
        operation: impl Future<Output = std::result::Result<T, E>>,
    ) -> Result<T>
    where
        ConvergeError: From<E>,
    {
        tokio::select! {
            () = self.token.cancelled() => Err(CommonError::Cancelled.into()),
            result = operation => result.map_err(ConvergeError::from),
        }
    }
}

/// Validates the replica count against the custom-name constraint.
pub(crate) fn get_scale(service: &ServiceConfig) -> Result<u64> {
    let scale = service.scale();
    if scale > 1 {
        if let Some(custom) = &service.container_name {
            return Err(ConvergeError::invalid_config(format!(
                "service \"{}\" uses the custom container name \"{custom}\"; \
                 containers must have unique names, remove the custom name to scale the service",
                service.name
            )));
        }
    }
    Ok(scale)
}

/// Canonical name for one replica, honoring a custom container name.
pub(crate) fn container_name(project_name: &str, service: &ServiceConfig, number: u64) -> String {
    service.container_name.clone().unwrap_or_else(|| {
        names::default_container_name(project_name, &service.name, number)
    })
}

/// Next free replica number: one past the highest observed.
pub(crate) fn next_container_number<'a>(
    containers: impl Iterator<Item = &'a ContainerSummary>,
) -> u64 {
    let mut highest = 0;
    for container in containers {
        match container.number() {
            Some(n) => highest = highest.max(n),
            None => tracing::warn!(
                "container {} has a missing or invalid {} label",
                container.id,
                labels::CONTAINER_NUMBER
            ),
        }
    }
    highest + 1
}

/// Canonical traversal order for reconciliation: divergent containers
/// first, then descending replica number, falling back to ascending
/// creation time, and finally the whole list reversed. Index
/// `i >= expected` then selects the most-divergent and oldest containers
/// to drop while the lowest numbers survive.
pub(crate) fn order_for_traversal(
    mut flagged: Vec<(ContainerSummary, bool)>,
) -> Vec<(ContainerSummary, bool)> {
    flagged.sort_by(|(a, a_divergent), (b, b_divergent)| {
        use std::cmp::Ordering;
        match (a_divergent, b_divergent) {
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            _ => match (a.number(), b.number()) {
                (Some(na), Some(nb)) => nb.cmp(&na),
                _ => a.created.cmp(&b.created),
            },
        }
    });
    flagged.reverse();
    flagged
}
