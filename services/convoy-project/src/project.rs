//! Project model: a named set of services.

use crate::service::ServiceConfig;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A declarative project: the unit of convergence.
///
/// Loading and schema validation happen upstream; by the time a `Project`
/// reaches the convergence engine its services are structurally valid.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Project {
    /// Project name; part of every managed container's identity.
    pub name: String,
    /// Enabled services, keyed by name.
    pub services: BTreeMap<String, ServiceConfig>,
    /// Names of services declared but disabled for this run.
    pub disabled: BTreeSet<String>,
}

impl Project {
    /// Creates a project with the given name and services, fixing up each
    /// service's `name` field from its map key.
    #[must_use]
    pub fn new(name: impl Into<String>, services: impl IntoIterator<Item = ServiceConfig>) -> Self {
        let services = services
            .into_iter()
            .map(|s| (s.name.clone(), s))
            .collect();
        Self {
            name: name.into(),
            services,
            disabled: BTreeSet::new(),
        }
    }

    /// Looks up an enabled service by name.
    #[must_use]
    pub fn service(&self, name: &str) -> Option<&ServiceConfig> {
        self.services.get(name)
    }

    /// Returns true if the named service is declared but disabled.
    #[must_use]
    pub fn is_disabled(&self, name: &str) -> bool {
        self.disabled.contains(name)
    }

    /// Names of services that depend on `service` with `restart: true`.
    ///
    /// These are the services that must be stopped before `service` is
    /// recreated, so the later start phase brings them back up against the
    /// replacement container.
    #[must_use]
    pub fn dependents_with_restart(&self, service: &str) -> Vec<String> {
        self.services
            .values()
            .filter(|s| {
                s.depends_on
                    .get(service)
                    .is_some_and(|dep| dep.restart)
            })
            .map(|s| s.name.clone())
            .collect()
    }
}
