//! Container naming scheme.

/// Separator between the project, service, and replica-number parts of a
/// canonical container name.
pub const SEPARATOR: char = '-';

/// Default canonical name for a service replica:
/// `<project><SEP><service><SEP><number>`.
#[must_use]
pub fn default_container_name(project: &str, service: &str, number: u64) -> String {
    format!("{project}{SEPARATOR}{service}{SEPARATOR}{number}")
}

/// Transient name used while a replacement container coexists with its
/// victim: `<first-12-of-victim-id>_<canonical>`.
#[must_use]
pub fn transient_container_name(victim_id: &str, canonical: &str) -> String {
    let prefix: String = victim_id.chars().take(12).collect();
    format!("{prefix}_{canonical}")
}
