//! Deterministic config hashing.
//!
//! The hash is stored as a label on every managed container and compared on
//! later runs to decide whether a container has diverged from its declared
//! configuration.

use crate::error::Result;
use crate::service::ServiceConfig;
use sha2::{Digest, Sha256};

/// Computes the deterministic digest of a service's effective configuration.
///
/// The digest is the SHA-256 of the canonical JSON form of the service.
/// `scale` is masked to its default before hashing: changing the replica
/// count alone scales containers up or down, it must not force the
/// surviving ones to be recreated.
pub fn service_hash(service: &ServiceConfig) -> Result<String> {
    let mut masked = service.clone();
    masked.scale = None;

    let bytes = serde_json::to_vec(&masked)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(hex::encode(hasher.finalize()))
}
