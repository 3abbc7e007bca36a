//! Periodic key rotation for the signing key ring
//!
//! Runs independently of request handling: rotates the active key once it
//! reaches the configured age and purges retiring keys past their grace
//! period.

use std::sync::Arc;

use chrono::Duration;
use rk_shared::config::{KeyRotationConfig, TokenConfig};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::domain::entities::key_pair::PublicKeyInfo;

use super::ring::KeyRing;

/// Configuration for the key rotation service
#[derive(Debug, Clone)]
pub struct KeyRotationServiceConfig {
    /// Whether the background task runs at all
    pub enabled: bool,
    /// Active key age that triggers a rotation
    pub rotation_interval: Duration,
    /// Grace period for the key being rotated out
    pub grace_period: Duration,
    /// How often to check (in seconds)
    pub check_interval_secs: u64,
}

impl Default for KeyRotationServiceConfig {
    fn default() -> Self {
        Self::from_shared(&KeyRotationConfig::default(), &TokenConfig::default())
    }
}

impl KeyRotationServiceConfig {
    pub fn from_shared(rotation: &KeyRotationConfig, token: &TokenConfig) -> Self {
        Self {
            enabled: rotation.enabled,
            rotation_interval: Duration::seconds(rotation.rotation_interval_secs),
            grace_period: Duration::seconds(rotation.effective_grace_secs(token)),
            check_interval_secs: rotation.check_interval_secs.max(1),
        }
    }
}

/// Service that keeps the key ring rotated and swept
pub struct KeyRotationService {
    key_ring: Arc<KeyRing>,
    config: KeyRotationServiceConfig,
}

impl KeyRotationService {
    pub fn new(key_ring: Arc<KeyRing>, config: KeyRotationServiceConfig) -> Self {
        Self { key_ring, config }
    }

    /// Run a single rotation cycle
    ///
    /// 1. Rotate if the active key is at least `rotation_interval` old
    /// 2. Sweep retiring keys past their `retire_at`
    pub fn run_cycle(&self) -> RotationCycleResult {
        let mut result = RotationCycleResult::default();

        let due = self
            .key_ring
            .active_key_age()
            .map_or(true, |age| age >= self.config.rotation_interval);

        if due {
            match self.key_ring.rotate(self.config.grace_period) {
                Ok(pair) => {
                    info!(key_id = %pair.key_id, "Scheduled key rotation completed");
                    result.rotated_to = Some(pair.key_id.clone());
                }
                Err(e) => {
                    error!("Scheduled key rotation failed: {}", e);
                    result.errors.push(format!("Rotation error: {}", e));
                }
            }
        }

        result.expired = self.key_ring.sweep();

        if result.rotated_to.is_some() || !result.expired.is_empty() {
            info!(
                "Key rotation cycle completed - Rotated: {}, Expired: {}",
                result.rotated_to.is_some(),
                result.expired.len()
            );
        }

        result
    }

    /// Start the rotation service as a background task
    ///
    /// Returns `None` when the service is disabled.
    pub fn start_background_task(self: Arc<Self>) -> Option<JoinHandle<()>> {
        if !self.config.enabled {
            warn!("Key rotation service is disabled");
            return None;
        }

        let period = std::time::Duration::from_secs(self.config.check_interval_secs);

        Some(tokio::spawn(async move {
            info!(
                "Key rotation service started - will check every {} seconds",
                self.config.check_interval_secs
            );

            let mut interval_timer = tokio::time::interval(period);

            loop {
                interval_timer.tick().await;

                let result = self.run_cycle();
                if !result.is_success() {
                    warn!("Key rotation cycle completed with errors: {:?}", result.errors);
                }
            }
        }))
    }
}

/// Result of a rotation cycle
#[derive(Debug, Default)]
pub struct RotationCycleResult {
    /// Id of the newly active key, when a rotation happened
    pub rotated_to: Option<String>,
    /// Keys purged by the sweep
    pub expired: Vec<PublicKeyInfo>,
    /// Any errors encountered during the cycle
    pub errors: Vec<String>,
}

impl RotationCycleResult {
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn rotated(&self) -> bool {
        self.rotated_to.is_some()
    }
}
