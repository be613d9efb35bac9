//! Service configuration model.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Condition a dependency's containers must reach before the dependent
/// service is allowed to start.
///
/// Unknown user-supplied strings are preserved as [`Condition::Other`] so the
/// wait layer can warn and skip them instead of failing deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Condition {
    /// The dependency has been scheduled before the dependent. Satisfied by
    /// dependency-ordered convergence alone.
    Started,
    /// Every dependency container is healthy, or running when it carries no
    /// healthcheck.
    RunningOrHealthy,
    /// Every dependency container reports a healthy healthcheck.
    Healthy,
    /// Some dependency container has exited with code 0.
    CompletedSuccessfully,
    /// Unrecognized condition string; waited on as a no-op with a warning.
    Other(String),
}

impl Condition {
    /// User-facing string for the `service_started` condition.
    pub const STARTED: &'static str = "service_started";
    /// User-facing string for the `service_running_or_healthy` condition.
    pub const RUNNING_OR_HEALTHY: &'static str = "service_running_or_healthy";
    /// User-facing string for the `service_healthy` condition.
    pub const HEALTHY: &'static str = "service_healthy";
    /// User-facing string for the `service_completed_successfully` condition.
    pub const COMPLETED_SUCCESSFULLY: &'static str = "service_completed_successfully";

    /// Returns the user-facing string form of this condition.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Started => Self::STARTED,
            Self::RunningOrHealthy => Self::RUNNING_OR_HEALTHY,
            Self::Healthy => Self::HEALTHY,
            Self::CompletedSuccessfully => Self::COMPLETED_SUCCESSFULLY,
            Self::Other(s) => s,
        }
    }
}

impl Default for Condition {
    fn default() -> Self {
        Self::Started
    }
}

impl From<String> for Condition {
    fn from(s: String) -> Self {
        match s.as_str() {
            Self::STARTED => Self::Started,
            Self::RUNNING_OR_HEALTHY => Self::RunningOrHealthy,
            Self::HEALTHY => Self::Healthy,
            Self::COMPLETED_SUCCESSFULLY => Self::CompletedSuccessfully,
            _ => Self::Other(s),
        }
    }
}

impl From<Condition> for String {
    fn from(c: Condition) -> Self {
        c.as_str().to_string()
    }
}

/// Declared dependency edge between two services.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceDependency {
    /// Condition the dependency must reach before the dependent starts.
    pub condition: Condition,
    /// When true, a dependency failure aborts the dependent; when false it
    /// is downgraded to a warning.
    pub required: bool,
    /// When true, the dependent is stopped before the dependency is
    /// recreated, so the later start phase restarts it.
    pub restart: bool,
}

impl Default for ServiceDependency {
    fn default() -> Self {
        Self {
            condition: Condition::Started,
            required: true,
            restart: false,
        }
    }
}

/// Per-service attachment to a declared network.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceNetwork {
    /// Relative priority; the highest-priority network is the container's
    /// primary network.
    pub priority: i64,
    /// Extra DNS aliases for the container on this network.
    pub aliases: Vec<String>,
    /// Fixed IPv4 address, if any.
    pub ipv4_address: Option<String>,
    /// Fixed IPv6 address, if any.
    pub ipv6_address: Option<String>,
}

/// A single declared mount, as a tagged union over the mount kinds the
/// engine understands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServiceVolume {
    /// Host path bind mount.
    Bind {
        /// Host path.
        source: String,
        /// Container path.
        target: String,
        /// Read-only mount.
        #[serde(default)]
        read_only: bool,
    },
    /// Named (or anonymous, when `source` is empty) engine-managed volume.
    Volume {
        /// Volume name; empty for an anonymous volume.
        #[serde(default)]
        source: String,
        /// Container path.
        target: String,
        /// Read-only mount.
        #[serde(default)]
        read_only: bool,
    },
    /// In-memory tmpfs mount.
    Tmpfs {
        /// Container path.
        target: String,
        /// Size limit in bytes; 0 means unbounded.
        #[serde(default)]
        size: u64,
    },
}

impl ServiceVolume {
    /// Container path this mount lands on.
    #[must_use]
    pub fn target(&self) -> &str {
        match self {
            Self::Bind { target, .. } | Self::Volume { target, .. } | Self::Tmpfs { target, .. } => {
                target
            }
        }
    }
}

/// Marker delegating a service's lifecycle to an external plugin.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceProvider {
    /// Plugin type identifier.
    #[serde(rename = "type")]
    pub kind: String,
    /// Opaque plugin options.
    pub options: BTreeMap<String, String>,
}

/// Lifecycle hook run inside a service container.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceHook {
    /// Command to execute.
    pub command: Vec<String>,
    /// User to run the command as.
    pub user: Option<String>,
    /// Working directory for the command.
    pub working_dir: Option<String>,
    /// Extra environment entries, `KEY=value` form.
    pub environment: Vec<String>,
}

/// Desired configuration for one service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Service name, unique within the project.
    pub name: String,
    /// Image reference the containers run.
    pub image: String,
    /// Desired replica count; `None` means 1.
    pub scale: Option<u64>,
    /// Explicit container name. Forbidden when scale > 1.
    pub container_name: Option<String>,
    /// Content digest of the resolved image.
    pub image_digest: Option<String>,
    /// Target platform, e.g. `linux/arm64`.
    pub platform: Option<String>,
    /// Environment variables.
    pub environment: BTreeMap<String, String>,
    /// User-declared labels, merged into every container.
    pub labels: BTreeMap<String, String>,
    /// Networks the containers attach to, by network name.
    pub networks: BTreeMap<String, ServiceNetwork>,
    /// Declared mounts.
    pub volumes: Vec<ServiceVolume>,
    /// Links to other services, `service[:alias]` form.
    pub links: Vec<String>,
    /// Links to containers outside the project, `name[:alias]` form.
    pub external_links: Vec<String>,
    /// Network namespace mode; may reference `service:<name>` or
    /// `container:<id>`.
    pub network_mode: Option<String>,
    /// IPC namespace mode; may reference `service:<name>` or
    /// `container:<id>`.
    pub ipc: Option<String>,
    /// PID namespace mode; may reference `service:<name>` or
    /// `container:<id>`.
    pub pid: Option<String>,
    /// Containers to import volumes from, `service[:mode]` or
    /// `container:<id>` form.
    pub volumes_from: Vec<String>,
    /// Dependencies on other services, keyed by service name.
    pub depends_on: BTreeMap<String, ServiceDependency>,
    /// When set, the service lifecycle is delegated to an external plugin
    /// and Convoy does not manage its containers.
    pub provider: Option<ServiceProvider>,
    /// Hooks run in each container right after it starts.
    pub post_start: Vec<ServiceHook>,
}

impl ServiceConfig {
    /// Effective replica count (defaults to 1).
    #[must_use]
    pub fn scale(&self) -> u64 {
        self.scale.unwrap_or(1)
    }

    /// Declared network names ordered by descending priority, ties broken
    /// by name. The first entry is the container's primary network.
    #[must_use]
    pub fn networks_by_priority(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.networks.keys().map(String::as_str).collect();
        names.sort_by(|a, b| {
            let pa = self.networks[*a].priority;
            let pb = self.networks[*b].priority;
            pb.cmp(&pa).then_with(|| a.cmp(b))
        });
        names
    }
}
