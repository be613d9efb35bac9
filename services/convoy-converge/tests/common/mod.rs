//! Shared test harness: an in-memory engine that records every mutation.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use convoy_engine::{
    labels, names, ContainerDetail, ContainerId, ContainerState, ContainerSummary, CreateConfig,
    EndpointConfig, EndpointSummary, Engine, EngineError, HealthStatus, MountSummary,
};
use convoy_project::{service_hash, Project, ServiceConfig};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

/// Fixed base for deterministic creation timestamps.
const CREATED_BASE: i64 = 1_700_000_000;

#[derive(Debug, Clone)]
pub struct FakeContainer {
    pub id: String,
    pub name: String,
    pub labels: HashMap<String, String>,
    pub state: ContainerState,
    pub created: DateTime<Utc>,
    pub exit_code: Option<i64>,
    pub networks: HashMap<String, EndpointSummary>,
    pub mounts: Vec<MountSummary>,
}

#[derive(Debug, Default)]
struct Inner {
    containers: HashMap<String, FakeContainer>,
    ops: Vec<String>,
    seq: u64,
    healthcheck_services: HashSet<String>,
    health_scripts: HashMap<String, VecDeque<HealthStatus>>,
    exit_on_start: HashMap<String, i64>,
}

/// In-memory [`Engine`] implementation. Mutating calls are appended to an
/// operation log so tests can assert exact sequences and idempotence.
#[derive(Debug)]
pub struct MemoryEngine {
    inner: Mutex<Inner>,
    api_version: String,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::with_api_version("1.47")
    }

    pub fn with_api_version(version: &str) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            api_version: version.to_string(),
        }
    }

    /// Marks a service's containers as carrying an image healthcheck.
    pub fn set_healthcheck(&self, service: &str) {
        self.inner
            .lock()
            .unwrap()
            .healthcheck_services
            .insert(service.to_string());
    }

    /// Scripts the health statuses a service's containers report on
    /// successive inspects; the last entry repeats forever.
    pub fn script_health(&self, service: &str, statuses: Vec<HealthStatus>) {
        let mut inner = self.inner.lock().unwrap();
        inner.healthcheck_services.insert(service.to_string());
        inner
            .health_scripts
            .insert(service.to_string(), statuses.into());
    }

    /// Makes a service's containers exit with `code` as soon as started.
    pub fn exit_on_start(&self, service: &str, code: i64) {
        self.inner
            .lock()
            .unwrap()
            .exit_on_start
            .insert(service.to_string(), code);
    }

    /// Seeds a running container as if a previous run created it.
    pub fn seed(&self, project: &Project, service: &ServiceConfig, number: u64) -> ContainerSummary {
        self.seed_with_state(project, service, number, ContainerState::Running, None)
    }

    /// Seeds a container in an arbitrary state.
    pub fn seed_with_state(
        &self,
        project: &Project,
        service: &ServiceConfig,
        number: u64,
        state: ContainerState,
        exit_code: Option<i64>,
    ) -> ContainerSummary {
        let name = service
            .container_name
            .clone()
            .unwrap_or_else(|| names::default_container_name(&project.name, &service.name, number));
        self.seed_named(project, service, number, &name, state, exit_code)
    }

    /// Seeds a container under an explicit name (e.g. a leftover transient
    /// name from an interrupted recreate).
    pub fn seed_named(
        &self,
        project: &Project,
        service: &ServiceConfig,
        number: u64,
        name: &str,
        state: ContainerState,
        exit_code: Option<i64>,
    ) -> ContainerSummary {
        let hash = service_hash(service).unwrap();
        let mut container_labels = HashMap::new();
        container_labels.insert(labels::PROJECT.to_string(), project.name.clone());
        container_labels.insert(labels::SERVICE.to_string(), service.name.clone());
        container_labels.insert(labels::CONTAINER_NUMBER.to_string(), number.to_string());
        container_labels.insert(labels::CONFIG_HASH.to_string(), hash);
        container_labels.insert(
            labels::ONE_OFF.to_string(),
            labels::ONE_OFF_FALSE.to_string(),
        );
        if let Some(digest) = &service.image_digest {
            container_labels.insert(labels::IMAGE_DIGEST.to_string(), digest.clone());
        }

        let mut inner = self.inner.lock().unwrap();
        inner.seq += 1;
        let seq = inner.seq;
        let fake = FakeContainer {
            id: format!("{seq:064x}"),
            name: name.to_string(),
            labels: container_labels,
            state,
            created: Utc.timestamp_opt(CREATED_BASE + seq as i64, 0).unwrap(),
            exit_code,
            networks: HashMap::new(),
            mounts: Vec::new(),
        };
        let summary = summary_of(&fake);
        inner.containers.insert(fake.id.clone(), fake);
        summary
    }

    /// Every container currently on the engine, as a convergence snapshot.
    pub fn snapshot(&self) -> Vec<ContainerSummary> {
        let inner = self.inner.lock().unwrap();
        let mut all: Vec<ContainerSummary> = inner.containers.values().map(summary_of).collect();
        all.sort_by(|a, b| a.id.as_str().cmp(b.id.as_str()));
        all
    }

    /// The mutation log, in call order.
    pub fn ops(&self) -> Vec<String> {
        self.inner.lock().unwrap().ops.clone()
    }

    pub fn clear_ops(&self) {
        self.inner.lock().unwrap().ops.clear();
    }

    /// Container names currently on the engine, sorted.
    pub fn names(&self) -> Vec<String> {
        let inner = self.inner.lock().unwrap();
        let mut all: Vec<String> = inner.containers.values().map(|c| c.name.clone()).collect();
        all.sort();
        all
    }

    pub fn container_by_name(&self, name: &str) -> Option<FakeContainer> {
        let inner = self.inner.lock().unwrap();
        inner.containers.values().find(|c| c.name == name).cloned()
    }

    fn index_of_op(&self, op: &str) -> Option<usize> {
        self.ops().iter().position(|o| o == op)
    }

    /// Asserts `earlier` appears in the mutation log before `later`.
    pub fn assert_op_order(&self, earlier: &str, later: &str) {
        let first = self
            .index_of_op(earlier)
            .unwrap_or_else(|| panic!("op {earlier:?} not found in {:?}", self.ops()));
        let second = self
            .index_of_op(later)
            .unwrap_or_else(|| panic!("op {later:?} not found in {:?}", self.ops()));
        assert!(
            first < second,
            "expected {earlier:?} before {later:?} in {:?}",
            self.ops()
        );
    }
}

fn summary_of(fake: &FakeContainer) -> ContainerSummary {
    ContainerSummary {
        id: ContainerId::from_string(&fake.id),
        names: vec![format!("/{}", fake.name)],
        labels: fake.labels.clone(),
        state: fake.state,
        created: fake.created,
        networks: fake.networks.clone(),
        mounts: fake.mounts.clone(),
    }
}

#[async_trait]
impl Engine for MemoryEngine {
    async fn create(&self, config: CreateConfig) -> Result<ContainerId, EngineError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.containers.values().any(|c| c.name == config.name) {
            return Err(EngineError::api(format!(
                "container name \"{}\" is already in use",
                config.name
            )));
        }
        inner.seq += 1;
        let seq = inner.seq;
        let id = format!("{seq:064x}");
        let networks = config
            .networks
            .iter()
            .map(|a| {
                (
                    a.network.clone(),
                    EndpointSummary {
                        network_id: a.network.clone(),
                    },
                )
            })
            .collect();
        let mounts = config
            .mounts
            .iter()
            .map(|m| MountSummary {
                kind: m.kind,
                name: m.source.clone(),
                target: m.target.clone(),
            })
            .collect();
        let fake = FakeContainer {
            id: id.clone(),
            name: config.name.clone(),
            labels: config.labels.into_iter().collect(),
            state: ContainerState::Created,
            created: Utc.timestamp_opt(CREATED_BASE + seq as i64, 0).unwrap(),
            exit_code: None,
            networks,
            mounts,
        };
        inner.ops.push(format!("create {}", config.name));
        inner.containers.insert(id.clone(), fake);
        Ok(ContainerId::from_string(id))
    }

    async fn inspect(&self, id: &ContainerId) -> Result<ContainerDetail, EngineError> {
        let mut inner = self.inner.lock().unwrap();
        let Some(service) = inner
            .containers
            .get(id.as_str())
            .and_then(|c| c.labels.get(labels::SERVICE).cloned())
        else {
            return Err(EngineError::not_found(format!("container {id}")));
        };
        let has_healthcheck = inner.healthcheck_services.contains(&service);
        let health = {
            let state = inner.containers[id.as_str()].state;
            if has_healthcheck && state == ContainerState::Running {
                match inner.health_scripts.get_mut(&service) {
                    Some(script) if script.len() > 1 => script.pop_front(),
                    Some(script) => script.front().copied(),
                    None => Some(HealthStatus::Healthy),
                }
            } else {
                None
            }
        };
        let fake = &inner.containers[id.as_str()];
        Ok(ContainerDetail {
            id: ContainerId::from_string(&fake.id),
            name: format!("/{}", fake.name),
            labels: fake.labels.clone(),
            state: fake.state,
            created: fake.created,
            exit_code: fake.exit_code,
            health,
            has_healthcheck,
            networks: fake.networks.clone(),
            mounts: fake.mounts.clone(),
        })
    }

    async fn start(&self, id: &ContainerId) -> Result<(), EngineError> {
        let mut inner = self.inner.lock().unwrap();
        let Some(fake) = inner.containers.get(id.as_str()) else {
            return Err(EngineError::not_found(format!("container {id}")));
        };
        let name = fake.name.clone();
        let service = fake.labels.get(labels::SERVICE).cloned().unwrap_or_default();
        let exit = inner.exit_on_start.get(&service).copied();
        let fake = inner.containers.get_mut(id.as_str()).unwrap();
        match exit {
            Some(code) => {
                fake.state = ContainerState::Exited;
                fake.exit_code = Some(code);
            }
            None => fake.state = ContainerState::Running,
        }
        inner.ops.push(format!("start {name}"));
        Ok(())
    }

    async fn stop(&self, id: &ContainerId, _timeout: Option<Duration>) -> Result<(), EngineError> {
        let mut inner = self.inner.lock().unwrap();
        let Some(fake) = inner.containers.get_mut(id.as_str()) else {
            return Err(EngineError::not_found(format!("container {id}")));
        };
        fake.state = ContainerState::Exited;
        fake.exit_code.get_or_insert(0);
        let name = fake.name.clone();
        inner.ops.push(format!("stop {name}"));
        Ok(())
    }

    async fn remove(&self, id: &ContainerId) -> Result<(), EngineError> {
        let mut inner = self.inner.lock().unwrap();
        let Some(fake) = inner.containers.remove(id.as_str()) else {
            return Err(EngineError::not_found(format!("container {id}")));
        };
        inner.ops.push(format!("remove {}", fake.name));
        Ok(())
    }

    async fn rename(&self, id: &ContainerId, new_name: &str) -> Result<(), EngineError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.containers.values().any(|c| c.name == new_name) {
            return Err(EngineError::api(format!(
                "container name \"{new_name}\" is already in use"
            )));
        }
        let Some(fake) = inner.containers.get_mut(id.as_str()) else {
            return Err(EngineError::not_found(format!("container {id}")));
        };
        let old = std::mem::replace(&mut fake.name, new_name.to_string());
        inner.ops.push(format!("rename {old} {new_name}"));
        Ok(())
    }

    async fn connect_network(
        &self,
        network: &str,
        id: &ContainerId,
        _endpoint: EndpointConfig,
    ) -> Result<(), EngineError> {
        let mut inner = self.inner.lock().unwrap();
        let Some(fake) = inner.containers.get_mut(id.as_str()) else {
            return Err(EngineError::not_found(format!("container {id}")));
        };
        fake.networks.insert(
            network.to_string(),
            EndpointSummary {
                network_id: network.to_string(),
            },
        );
        let name = fake.name.clone();
        inner.ops.push(format!("connect {network} {name}"));
        Ok(())
    }

    async fn api_version(&self) -> Result<String, EngineError> {
        Ok(self.api_version.clone())
    }
}

/// Service config builder with sensible defaults.
pub fn service(name: &str) -> ServiceConfig {
    ServiceConfig {
        name: name.to_string(),
        image: format!("registry.example/{name}:latest"),
        ..Default::default()
    }
}
