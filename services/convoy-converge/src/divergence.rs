//! Divergence detection.
//!
//! Decides whether an observed container must be recreated to match its
//! declared service configuration.

use crate::error::Result;
use convoy_engine::{labels, names, ContainerState, ContainerSummary, MountKind};
use convoy_error::CommonError;
use convoy_project::{service_hash, ServiceConfig, ServiceVolume};
use std::collections::HashMap;

/// Network-id map value standing in for an overlay network whose engine id
/// is not visible until a container attaches. Attachment checks skip it.
pub const OVERLAY_NETWORK_PLACEHOLDER: &str = "overlay";

/// Recreate policy for a convergence run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RecreatePolicy {
    /// Recreate containers whose observed configuration diverged from the
    /// declared one.
    #[default]
    Diverged,
    /// Never recreate; divergent containers are left running.
    Never,
    /// Recreate every existing container.
    Force,
}

impl RecreatePolicy {
    /// Parses a user-facing policy string. Absent or unrecognized values
    /// mean [`RecreatePolicy::Diverged`].
    #[must_use]
    pub fn parse(s: Option<&str>) -> Self {
        match s {
            Some("never") => Self::Never,
            Some("force") => Self::Force,
            _ => Self::Diverged,
        }
    }
}

/// Returns true when the observed container must be recreated to match the
/// declared service.
///
/// The checks, in order: policy override, config-hash label, image-digest
/// label, canonical-name agreement (a leftover transient container from an
/// interrupted recreate never counts as up to date), declared network
/// attachment (running containers only, when a network-id map is supplied),
/// and declared named-volume mounts (when a volume-id map is supplied).
pub fn must_recreate(
    project_name: &str,
    service: &ServiceConfig,
    container: &ContainerSummary,
    policy: RecreatePolicy,
    networks: Option<&HashMap<String, String>>,
    volumes: Option<&HashMap<String, String>>,
) -> Result<bool> {
    match policy {
        RecreatePolicy::Never => return Ok(false),
        RecreatePolicy::Force => return Ok(true),
        RecreatePolicy::Diverged => {}
    }

    let config_hash = service_hash(service)
        .map_err(|e| CommonError::internal(format!("failed to hash service config: {e}")))?;
    if container.label(labels::CONFIG_HASH) != Some(config_hash.as_str()) {
        return Ok(true);
    }
    if container.label(labels::IMAGE_DIGEST) != service.image_digest.as_deref() {
        return Ok(true);
    }

    if let Some(number) = container.number() {
        let expected = service.container_name.clone().unwrap_or_else(|| {
            names::default_container_name(project_name, &service.name, number)
        });
        if container.canonical_name() != expected {
            return Ok(true);
        }
    }

    if let Some(networks) = networks {
        if container.state == ContainerState::Running
            && missing_expected_network(service, container, networks)
        {
            return Ok(true);
        }
    }

    if let Some(volumes) = volumes {
        if missing_expected_volume(service, container, volumes) {
            return Ok(true);
        }
    }

    Ok(false)
}

fn missing_expected_network(
    service: &ServiceConfig,
    container: &ContainerSummary,
    networks: &HashMap<String, String>,
) -> bool {
    for net in service.networks.keys() {
        let id = networks.get(net).map_or("", String::as_str);
        if id == OVERLAY_NETWORK_PLACEHOLDER {
            continue;
        }
        let attached = container
            .networks
            .values()
            .any(|endpoint| endpoint.network_id == id);
        if !attached {
            return true;
        }
    }
    false
}

fn missing_expected_volume(
    service: &ServiceConfig,
    container: &ContainerSummary,
    volumes: &HashMap<String, String>,
) -> bool {
    for vol in &service.volumes {
        let ServiceVolume::Volume { source, .. } = vol else {
            continue;
        };
        if source.is_empty() {
            continue;
        }
        let id = volumes.get(source).map_or("", String::as_str);
        let mounted = container
            .mounts
            .iter()
            .any(|m| m.kind == MountKind::Volume && m.name == id);
        if !mounted {
            return true;
        }
    }
    false
}
