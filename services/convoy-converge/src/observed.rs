//! Observed state store.
//!
//! The single source of truth consulted during a convergence run: a mapping
//! from service name to the containers last observed for it. Seeded from the
//! initial engine snapshot, then replaced wholesale per service as each
//! reconciliation completes.

use crate::error::{ConvergeError, Result};
use convoy_engine::ContainerSummary;
use convoy_project::Project;
use std::collections::HashMap;
use std::sync::Mutex;

/// In-memory service name → container list mapping.
///
/// Callers receive snapshots and writers replace whole lists; the lists
/// themselves are never mutated in place.
#[derive(Debug)]
pub struct ObservedState {
    inner: Mutex<HashMap<String, Vec<ContainerSummary>>>,
}

impl ObservedState {
    /// Seeds the store from an engine snapshot.
    ///
    /// Every enabled service gets an entry (empty when nothing is running);
    /// one-off containers are excluded.
    #[must_use]
    pub fn new(project: &Project, snapshot: Vec<ContainerSummary>) -> Self {
        let mut map: HashMap<String, Vec<ContainerSummary>> = project
            .services
            .keys()
            .map(|name| (name.clone(), Vec::new()))
            .collect();
        for container in snapshot {
            if container.is_one_off() {
                continue;
            }
            let Some(service) = container.service() else {
                continue;
            };
            map.entry(service.to_string()).or_default().push(container);
        }
        Self {
            inner: Mutex::new(map),
        }
    }

    /// Returns a snapshot of the containers observed for a service.
    pub fn get(&self, service: &str) -> Result<Vec<ContainerSummary>> {
        let guard = self
            .inner
            .lock()
            .map_err(|_| ConvergeError::internal("observed state lock poisoned"))?;
        Ok(guard.get(service).cloned().unwrap_or_default())
    }

    /// Replaces the containers observed for a service.
    pub fn set(&self, service: &str, containers: Vec<ContainerSummary>) -> Result<()> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| ConvergeError::internal("observed state lock poisoned"))?;
        guard.insert(service.to_string(), containers);
        Ok(())
    }
}
