//! Dependency-ordered scheduling.
//!
//! Services are walked as an explicit integer-indexed adjacency graph with
//! edges from dependency to dependent. Independent branches run in
//! parallel; a service runs only after every prerequisite completed without
//! fatal error, and dependents of a failed service are skipped.

use crate::error::{ConvergeError, Result};
use convoy_error::CommonError;
use convoy_project::Project;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

#[derive(Debug)]
struct ServiceNode {
    name: String,
    /// Number of prerequisites that have not completed yet.
    pending: usize,
    /// Indices of services that depend on this one.
    dependents: Vec<usize>,
}

/// Explicit adjacency over a project's enabled services.
#[derive(Debug)]
pub struct ServiceGraph {
    nodes: Vec<ServiceNode>,
}

impl ServiceGraph {
    /// Builds the graph, validating that every dependency edge points at a
    /// known service and that the graph is acyclic.
    pub fn build(project: &Project) -> Result<Self> {
        let mut nodes: Vec<ServiceNode> = project
            .services
            .keys()
            .map(|name| ServiceNode {
                name: name.clone(),
                pending: 0,
                dependents: Vec::new(),
            })
            .collect();
        let index: HashMap<&str, usize> = project
            .services
            .keys()
            .enumerate()
            .map(|(i, name)| (name.as_str(), i))
            .collect();

        for (i, (name, service)) in project.services.iter().enumerate() {
            for dep in service.depends_on.keys() {
                match index.get(dep.as_str()) {
                    Some(&d) => {
                        nodes[d].dependents.push(i);
                        nodes[i].pending += 1;
                    }
                    None if project.is_disabled(dep) => {}
                    None => {
                        return Err(ConvergeError::invalid_config(format!(
                            "service \"{name}\" depends on undefined service \"{dep}\""
                        )));
                    }
                }
            }
        }

        let graph = Self { nodes };
        graph.check_acyclic()?;
        Ok(graph)
    }

    /// Kahn's count over a copy of the in-degrees; any node left unvisited
    /// sits on a cycle.
    fn check_acyclic(&self) -> Result<()> {
        let mut pending: Vec<usize> = self.nodes.iter().map(|n| n.pending).collect();
        let mut ready: Vec<usize> = pending
            .iter()
            .enumerate()
            .filter(|(_, &p)| p == 0)
            .map(|(i, _)| i)
            .collect();
        let mut visited = 0;
        while let Some(i) = ready.pop() {
            visited += 1;
            for &d in &self.nodes[i].dependents {
                pending[d] -= 1;
                if pending[d] == 0 {
                    ready.push(d);
                }
            }
        }
        if visited == self.nodes.len() {
            return Ok(());
        }
        let mut cyclic: Vec<&str> = pending
            .iter()
            .enumerate()
            .filter(|(_, &p)| p > 0)
            .map(|(i, _)| self.nodes[i].name.as_str())
            .collect();
        cyclic.sort_unstable();
        Err(ConvergeError::invalid_config(format!(
            "dependency cycle detected among services: {}",
            cyclic.join(", ")
        )))
    }
}

/// Runs `f` once per enabled service, in dependency order.
///
/// Independent services run concurrently on spawned tasks. A service is
/// launched only once every prerequisite's `f` returned `Ok`; dependents of
/// a failed service are skipped entirely and the first fatal error is
/// returned. Cancelling `token` stops launching new services and surfaces
/// as [`CommonError::Cancelled`] when nothing else failed first.
pub async fn in_dependency_order<F, Fut>(
    project: &Project,
    token: &CancellationToken,
    f: F,
) -> Result<()>
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    let mut graph = ServiceGraph::build(project)?;
    if graph.nodes.is_empty() {
        return Ok(());
    }

    let f = Arc::new(f);
    let (tx, mut rx) = mpsc::unbounded_channel::<(usize, Result<()>)>();
    let mut running = 0usize;
    let mut first_error: Option<ConvergeError> = None;

    let ready: Vec<usize> = graph
        .nodes
        .iter()
        .enumerate()
        .filter(|(_, n)| n.pending == 0)
        .map(|(i, _)| i)
        .collect();
    for i in ready {
        spawn_node(&graph, i, &f, &tx, &mut running);
    }

    while running > 0 {
        let Some((done, result)) = rx.recv().await else {
            break;
        };
        running -= 1;

        match result {
            Ok(()) => {
                if first_error.is_none() && !token.is_cancelled() {
                    let dependents = graph.nodes[done].dependents.clone();
                    for d in dependents {
                        graph.nodes[d].pending -= 1;
                        if graph.nodes[d].pending == 0 {
                            spawn_node(&graph, d, &f, &tx, &mut running);
                        }
                    }
                }
            }
            Err(err) => {
                if first_error.is_none() {
                    first_error = Some(err);
                }
            }
        }
    }

    if let Some(err) = first_error {
        return Err(err);
    }
    if token.is_cancelled() {
        return Err(CommonError::Cancelled.into());
    }
    Ok(())
}

fn spawn_node<F, Fut>(
    graph: &ServiceGraph,
    index: usize,
    f: &Arc<F>,
    tx: &mpsc::UnboundedSender<(usize, Result<()>)>,
    running: &mut usize,
) where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    let name = graph.nodes[index].name.clone();
    let f = Arc::clone(f);
    let tx = tx.clone();
    *running += 1;
    tokio::spawn(async move {
        let result = f(name).await;
        let _ = tx.send((index, result));
    });
}
