//! Observed container model.

use crate::labels;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Container identifier as reported by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContainerId(String);

impl ContainerId {
    /// Creates a container ID from a string.
    #[must_use]
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Returns the ID as a string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the 12-character short form of the ID.
    #[must_use]
    pub fn short(&self) -> &str {
        let end = self.0.len().min(12);
        &self.0[..end]
    }
}

impl std::fmt::Display for ContainerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ContainerId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Container state as reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerState {
    /// Created but never started.
    Created,
    /// Running.
    Running,
    /// Restarting under a restart policy.
    Restarting,
    /// Exited.
    Exited,
    /// Paused.
    Paused,
    /// Being removed.
    Removing,
    /// Dead (error state).
    Dead,
}

impl std::fmt::Display for ContainerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Created => "created",
            Self::Running => "running",
            Self::Restarting => "restarting",
            Self::Exited => "exited",
            Self::Paused => "paused",
            Self::Removing => "removing",
            Self::Dead => "dead",
        };
        write!(f, "{s}")
    }
}

/// Healthcheck status of a running container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Healthcheck has not yet settled.
    Starting,
    /// Healthcheck is passing.
    Healthy,
    /// Healthcheck is failing.
    Unhealthy,
}

/// Mount kind on an observed container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MountKind {
    /// Host path bind mount.
    Bind,
    /// Engine-managed volume.
    Volume,
    /// In-memory tmpfs.
    Tmpfs,
}

/// One mount on an observed container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountSummary {
    /// Mount kind.
    pub kind: MountKind,
    /// Volume name for volume mounts, host path for binds.
    pub name: String,
    /// Container path.
    pub target: String,
}

/// Per-network endpoint data on an observed container.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointSummary {
    /// Engine network ID the container is attached to.
    pub network_id: String,
}

/// Summary of one observed container, as returned by a list call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerSummary {
    /// Container ID.
    pub id: ContainerId,
    /// All names the engine knows the container by; the first is canonical.
    pub names: Vec<String>,
    /// Labels, including the Convoy identity labels.
    pub labels: HashMap<String, String>,
    /// Current state.
    pub state: ContainerState,
    /// Creation time.
    pub created: DateTime<Utc>,
    /// Networks the container is attached to, by network name.
    pub networks: HashMap<String, EndpointSummary>,
    /// Mounts on the container.
    pub mounts: Vec<MountSummary>,
}

impl ContainerSummary {
    /// Looks up a label value.
    #[must_use]
    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }

    /// Service this container belongs to, from its label.
    #[must_use]
    pub fn service(&self) -> Option<&str> {
        self.label(labels::SERVICE)
    }

    /// Replica number, parsed from the container-number label.
    ///
    /// Returns `None` when the label is missing or unparseable; such
    /// containers sort after well-labelled ones.
    #[must_use]
    pub fn number(&self) -> Option<u64> {
        self.label(labels::CONTAINER_NUMBER)?.parse().ok()
    }

    /// Returns true if the container was launched for an ad-hoc command.
    #[must_use]
    pub fn is_one_off(&self) -> bool {
        self.label(labels::ONE_OFF) == Some(labels::ONE_OFF_TRUE)
    }

    /// Canonical container name: the first engine name without its leading
    /// slash, falling back to the short ID.
    #[must_use]
    pub fn canonical_name(&self) -> &str {
        self.names
            .first()
            .map_or_else(|| self.id.short(), |n| n.trim_start_matches('/'))
    }
}

/// Detail of one inspected container.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerDetail {
    /// Container ID.
    pub id: ContainerId,
    /// Canonical name.
    pub name: String,
    /// Labels.
    pub labels: HashMap<String, String>,
    /// Current state.
    pub state: ContainerState,
    /// Creation time.
    pub created: DateTime<Utc>,
    /// Exit code, when exited.
    pub exit_code: Option<i64>,
    /// Healthcheck status; `None` when no healthcheck has reported yet.
    pub health: Option<HealthStatus>,
    /// Whether the container configuration declares a healthcheck.
    pub has_healthcheck: bool,
    /// Networks the container is attached to, by network name.
    pub networks: HashMap<String, EndpointSummary>,
    /// Mounts on the container.
    pub mounts: Vec<MountSummary>,
}

impl From<&ContainerDetail> for ContainerSummary {
    fn from(detail: &ContainerDetail) -> Self {
        Self {
            id: detail.id.clone(),
            names: vec![detail.name.clone()],
            labels: detail.labels.clone(),
            state: detail.state,
            created: detail.created,
            networks: detail.networks.clone(),
            mounts: detail.mounts.clone(),
        }
    }
}

/// Orders containers deterministically: ascending replica number, containers
/// with a missing or unparseable number last, ties by creation time, final
/// tie by ID.
pub fn sort_deterministic(containers: &mut [ContainerSummary]) {
    containers.sort_by(|a, b| {
        match (a.number(), b.number()) {
            (Some(na), Some(nb)) => na.cmp(&nb),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        }
        .then_with(|| a.created.cmp(&b.created))
        .then_with(|| a.id.as_str().cmp(b.id.as_str()))
    });
}
