//! Labels identifying Convoy-managed containers.
//!
//! Every container the convergence engine creates carries these labels; they
//! are the only state Convoy persists between runs.

/// Project the container belongs to.
pub const PROJECT: &str = "com.convoy.project";

/// Service the container belongs to.
pub const SERVICE: &str = "com.convoy.service";

/// 1-based replica index within the service, decimal ASCII.
pub const CONTAINER_NUMBER: &str = "com.convoy.container-number";

/// Digest of the service's effective configuration at create time.
pub const CONFIG_HASH: &str = "com.convoy.config-hash";

/// Content digest of the image the container was created from.
pub const IMAGE_DIGEST: &str = "com.convoy.image-digest";

/// `"True"` on containers launched for ad-hoc commands; such containers are
/// excluded from convergence.
pub const ONE_OFF: &str = "com.convoy.oneoff";

/// Set on the transient container created during a recreate; holds the name
/// of the container being replaced.
pub const REPLACE: &str = "com.convoy.replace";

/// Convoy version that created the container.
pub const VERSION: &str = "com.convoy.version";

/// Label value marking a one-off container.
pub const ONE_OFF_TRUE: &str = "True";

/// Label value on managed (non-one-off) containers.
pub const ONE_OFF_FALSE: &str = "False";
