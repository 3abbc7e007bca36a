//! Configuration for the session refresh controller

use rk_shared::config::{RevocationConfig, ReusePolicy};

/// Configuration for refresh and logout handling
#[derive(Debug, Clone, Default)]
pub struct RefreshControllerConfig {
    /// What to revoke when a consumed refresh token comes back
    pub reuse_policy: ReusePolicy,
}

impl RefreshControllerConfig {
    pub fn from_shared(revocation: &RevocationConfig) -> Self {
        Self {
            reuse_policy: revocation.reuse_policy,
        }
    }
}
