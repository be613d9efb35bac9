//! Intra-project reference resolution.
//!
//! Before a service is reconciled, references to sibling services in its
//! working copy (`volumes_from`, shared network/IPC/PID namespaces) are
//! rewritten to concrete container IDs using the observed state store.

use crate::error::{ConvergeError, Result};
use crate::observed::ObservedState;
use convoy_engine::{state, ContainerSummary};
use convoy_project::ServiceConfig;

/// Prefix marking a mode string that references a sibling service.
const SERVICE_PREFIX: &str = "service:";

/// Prefix marking a mode string that references a concrete container.
const CONTAINER_PREFIX: &str = "container:";

/// Rewrites every intra-project reference in `service` to a concrete
/// container ID.
///
/// Fails with [`ConvergeError::MissingDependency`] when a referenced
/// service has no observed containers.
pub fn resolve_service_references(
    observed: &ObservedState,
    service: &mut ServiceConfig,
) -> Result<()> {
    resolve_volumes_from(observed, service)?;
    resolve_shared_namespaces(observed, service)
}

/// Service name referenced by a namespace mode string, if any.
#[must_use]
pub fn dependent_service_from_mode(mode: &str) -> Option<&str> {
    mode.strip_prefix(SERVICE_PREFIX)
}

fn resolve_volumes_from(observed: &ObservedState, service: &mut ServiceConfig) -> Result<()> {
    for entry in &mut service.volumes_from {
        let mut parts = entry.splitn(2, ':');
        let head = parts.next().unwrap_or_default();
        if head.is_empty() {
            continue;
        }
        if head == "container" {
            if let Some(id) = parts.next() {
                *entry = id.to_string();
            }
            continue;
        }
        let source = first_container(observed, head).ok_or_else(|| {
            ConvergeError::MissingDependency(format!(
                "cannot share volumes with service {head}: container missing"
            ))
        })?;
        *entry = source.id.to_string();
    }
    Ok(())
}

fn resolve_shared_namespaces(observed: &ObservedState, service: &mut ServiceConfig) -> Result<()> {
    for (field, kind) in [
        (&mut service.network_mode, "network"),
        (&mut service.ipc, "IPC"),
        (&mut service.pid, "PID"),
    ] {
        let Some(mode) = field.as_deref() else {
            continue;
        };
        let Some(name) = dependent_service_from_mode(mode) else {
            continue;
        };
        let source = first_container(observed, name).ok_or_else(|| {
            ConvergeError::MissingDependency(format!(
                "cannot share {kind} namespace with service {name}: container missing"
            ))
        })?;
        *field = Some(format!("{CONTAINER_PREFIX}{}", source.id));
    }
    Ok(())
}

/// First observed container of a service in deterministic order.
fn first_container(observed: &ObservedState, service: &str) -> Option<ContainerSummary> {
    let mut containers = observed.get(service).ok()?;
    if containers.is_empty() {
        return None;
    }
    state::sort_deterministic(&mut containers);
    containers.into_iter().next()
}
