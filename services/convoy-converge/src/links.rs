//! Legacy link expansion.
//!
//! Declared `links` are expanded against the observed containers of the
//! linked service into `name:alias` pairs; each linked container is exposed
//! under the declared alias, the service-number form, and the fully
//! qualified name. External links pass through as declared.

use crate::error::Result;
use crate::observed::ObservedState;
use convoy_engine::names::SEPARATOR;
use convoy_project::ServiceConfig;

/// Expands a service's declared links for replica `number`.
pub fn get_links(
    observed: &ObservedState,
    project_name: &str,
    service: &ServiceConfig,
    number: u64,
) -> Result<Vec<String>> {
    let mut links = Vec::new();

    for raw in &service.links {
        let (link_service, alias) = split_link(raw);
        for container in observed.get(link_service)? {
            let name = container.canonical_name();
            links.push(format!("{name}:{alias}"));
            links.push(format!("{name}:{link_service}{SEPARATOR}{number}"));
            links.push(format!(
                "{name}:{project_name}{SEPARATOR}{link_service}{SEPARATOR}{number}"
            ));
        }
    }

    for raw in &service.external_links {
        let (name, alias) = split_link(raw);
        links.push(format!("{name}:{alias}"));
    }

    Ok(links)
}

fn split_link(raw: &str) -> (&str, &str) {
    raw.split_once(':').map_or((raw, raw), |(name, alias)| (name, alias))
}
