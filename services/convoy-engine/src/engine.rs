//! The engine port: the capability surface Convoy needs from a container
//! runtime.

use crate::error::Result;
use crate::state::{ContainerDetail, ContainerId, MountKind};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::time::Duration;

/// Engine API version starting from which a single create call accepts all
/// of a container's networks. Older engines take only the primary network at
/// create and the rest are connected one at a time.
pub const MULTI_NETWORK_CREATE_VERSION: &str = "1.44";

/// One mount requested at container create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountRequest {
    /// Mount kind.
    pub kind: MountKind,
    /// Volume name or id for volume mounts, host path for binds, empty for
    /// anonymous volumes and tmpfs.
    pub source: String,
    /// Container path.
    pub target: String,
    /// Read-only mount.
    pub read_only: bool,
}

/// Endpoint settings used when attaching a container to a network.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndpointConfig {
    /// DNS aliases on the network.
    pub aliases: Vec<String>,
    /// Fixed IPv4 address.
    pub ipv4_address: Option<String>,
    /// Fixed IPv6 address.
    pub ipv6_address: Option<String>,
    /// Legacy links, `name:alias` form.
    pub links: Vec<String>,
}

/// One network attachment requested at container create, in declared
/// priority order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkAttachment {
    /// Engine network ID (or name, for engines that resolve names).
    pub network: String,
    /// Endpoint settings.
    pub endpoint: EndpointConfig,
}

/// Everything the engine needs to create one container.
#[derive(Debug, Clone, Default)]
pub struct CreateConfig {
    /// Container name.
    pub name: String,
    /// Image reference.
    pub image: String,
    /// Labels.
    pub labels: BTreeMap<String, String>,
    /// Environment, `KEY=value` form.
    pub env: Vec<String>,
    /// Mounts.
    pub mounts: Vec<MountRequest>,
    /// Network attachments in priority order; the first is primary.
    pub networks: Vec<NetworkAttachment>,
    /// Network namespace mode (`container:<id>` after resolution).
    pub network_mode: Option<String>,
    /// IPC namespace mode (`container:<id>` after resolution).
    pub ipc: Option<String>,
    /// PID namespace mode (`container:<id>` after resolution).
    pub pid: Option<String>,
    /// Containers to import volumes from, by ID after resolution.
    pub volumes_from: Vec<String>,
    /// Legacy links, `name:alias` form.
    pub links: Vec<String>,
    /// Target platform, e.g. `linux/arm64`.
    pub platform: Option<String>,
}

/// Abstraction over the container runtime.
///
/// All operations are cancellable by dropping the returned future; every
/// failure carries an [`EngineError`](crate::EngineError). No ordering is
/// assumed between concurrent calls.
#[async_trait]
pub trait Engine: Send + Sync {
    /// Creates a container and returns its ID.
    async fn create(&self, config: CreateConfig) -> Result<ContainerId>;

    /// Inspects a container.
    async fn inspect(&self, id: &ContainerId) -> Result<ContainerDetail>;

    /// Starts a container.
    async fn start(&self, id: &ContainerId) -> Result<()>;

    /// Stops a container, waiting up to `timeout` before the engine kills it.
    async fn stop(&self, id: &ContainerId, timeout: Option<Duration>) -> Result<()>;

    /// Removes a stopped container.
    async fn remove(&self, id: &ContainerId) -> Result<()>;

    /// Renames a container.
    async fn rename(&self, id: &ContainerId, new_name: &str) -> Result<()>;

    /// Attaches a container to a network.
    async fn connect_network(
        &self,
        network: &str,
        id: &ContainerId,
        endpoint: EndpointConfig,
    ) -> Result<()>;

    /// Engine API version, e.g. `"1.47"`.
    async fn api_version(&self) -> Result<String>;
}
