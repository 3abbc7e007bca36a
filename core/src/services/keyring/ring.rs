//! Signing key ring.
//!
//! Readers (`current`, `lookup`) clone an `Arc` to an immutable snapshot
//! under a read lock held only for that clone. Writers (`rotate`, `sweep`)
//! are serialized by a separate rotation lock, build the next snapshot
//! off to the side and swap it in, so validation never waits on key
//! generation.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::Algorithm;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::domain::entities::key_pair::{
    generate_key_id, KeyMaterial, KeyPair, KeyStatus, PublicKeyInfo,
};
use crate::errors::{DomainError, DomainResult, TokenError};
use crate::services::clock::Clock;

use super::config::KeyRingConfig;
use super::key_source::KeyMaterialSource;

/// Immutable view of the ring at one version
#[derive(Debug, Default)]
struct KeySnapshot {
    version: u64,
    active: Option<Arc<KeyPair>>,
    /// Oldest first
    retiring: Vec<Arc<KeyPair>>,
}

impl KeySnapshot {
    fn pairs(&self) -> impl Iterator<Item = &Arc<KeyPair>> {
        self.active.iter().chain(self.retiring.iter())
    }

    fn contains(&self, key_id: &str) -> bool {
        self.pairs().any(|pair| pair.key_id == key_id)
    }
}

/// Owner of every signing key pair and its lifecycle
pub struct KeyRing {
    snapshot: RwLock<Arc<KeySnapshot>>,
    rotation_lock: Mutex<()>,
    source: Arc<dyn KeyMaterialSource>,
    clock: Arc<dyn Clock>,
    config: KeyRingConfig,
}

impl std::fmt::Debug for KeyRing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let snapshot = self.load();
        f.debug_struct("KeyRing")
            .field("version", &snapshot.version)
            .field("active", &snapshot.active.as_ref().map(|pair| &pair.key_id))
            .field("retiring", &snapshot.retiring.len())
            .field("algorithm", &self.config.algorithm)
            .finish()
    }
}

impl KeyRing {
    /// Creates a ring with one freshly generated active key
    ///
    /// # Returns
    ///
    /// * `Ok(KeyRing)` - Ring ready to sign
    /// * `Err(DomainError)` - Invalid configuration or key generation failure
    pub fn new(
        config: KeyRingConfig,
        source: Arc<dyn KeyMaterialSource>,
        clock: Arc<dyn Clock>,
    ) -> DomainResult<Self> {
        Self::check_source(&config, source.as_ref())?;
        let material = source.generate()?;
        Self::with_initial_material(config, source, clock, material)
    }

    /// Creates a ring whose first active key is pre-provisioned material,
    /// e.g. imported with [`KeyMaterial::from_pem_file`]
    pub fn with_initial_material(
        config: KeyRingConfig,
        source: Arc<dyn KeyMaterialSource>,
        clock: Arc<dyn Clock>,
        material: KeyMaterial,
    ) -> DomainResult<Self> {
        config.validate()?;
        Self::check_source(&config, source.as_ref())?;

        let now = clock.now();
        let pair = KeyPair::new_active(generate_key_id(now), config.algorithm, material, now);
        info!(key_id = %pair.key_id, algorithm = ?config.algorithm, "Key ring initialized");

        let snapshot = KeySnapshot {
            version: 1,
            active: Some(Arc::new(pair)),
            retiring: Vec::new(),
        };

        Ok(Self {
            snapshot: RwLock::new(Arc::new(snapshot)),
            rotation_lock: Mutex::new(()),
            source,
            clock,
            config,
        })
    }

    /// Ring without any key, for exercising the no-active-key path
    #[cfg(test)]
    pub(crate) fn empty(
        config: KeyRingConfig,
        source: Arc<dyn KeyMaterialSource>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            snapshot: RwLock::new(Arc::new(KeySnapshot::default())),
            rotation_lock: Mutex::new(()),
            source,
            clock,
            config,
        }
    }

    fn check_source(config: &KeyRingConfig, source: &dyn KeyMaterialSource) -> DomainResult<()> {
        if source.algorithm() != config.algorithm {
            return Err(DomainError::Configuration {
                message: format!(
                    "key source produces {:?} keys but the ring is configured for {:?}",
                    source.algorithm(),
                    config.algorithm
                ),
            });
        }
        Ok(())
    }

    fn load(&self) -> Arc<KeySnapshot> {
        Arc::clone(&self.snapshot.read())
    }

    fn publish(&self, snapshot: KeySnapshot) {
        *self.snapshot.write() = Arc::new(snapshot);
    }

    pub fn algorithm(&self) -> Algorithm {
        self.config.algorithm
    }

    pub fn config(&self) -> &KeyRingConfig {
        &self.config
    }

    /// Snapshot version, bumped by every rotation and every effective sweep
    pub fn version(&self) -> u64 {
        self.load().version
    }

    /// The active signing pair
    pub fn current(&self) -> Result<Arc<KeyPair>, TokenError> {
        self.load().active.clone().ok_or(TokenError::NoActiveKey)
    }

    /// A pair usable for verification: active, or retiring with
    /// `retire_at` still in the future
    pub fn lookup(&self, key_id: &str) -> Result<Arc<KeyPair>, TokenError> {
        let now = self.clock.now();
        self.load()
            .pairs()
            .find(|pair| pair.key_id == key_id)
            .filter(|pair| pair.is_usable_at(now))
            .cloned()
            .ok_or_else(|| TokenError::KeyNotFound {
                key_id: key_id.to_string(),
            })
    }

    /// Rotates to a fresh key, keeping the previous one for verification
    /// for `grace`. The grace period must cover the longest token TTL.
    pub fn rotate(&self, grace: Duration) -> DomainResult<Arc<KeyPair>> {
        self.config.check_grace(grace)?;
        self.rotate_with_grace(grace)
    }

    /// Rotates with the configured default grace period
    pub fn rotate_default(&self) -> DomainResult<Arc<KeyPair>> {
        self.rotate(self.config.default_grace())
    }

    /// Rotates with no grace period and purges the previous key at once.
    ///
    /// Every outstanding token signed by the previous key stops verifying.
    /// Intended for suspected key compromise.
    pub fn emergency_rotate(&self) -> DomainResult<Arc<KeyPair>> {
        let previous = self.load().active.as_ref().map(|pair| pair.key_id.clone());
        let pair = self.rotate_with_grace(Duration::zero())?;
        let purged = self.sweep();

        warn!(
            target: "security",
            key_id = %pair.key_id,
            previous_key_id = ?previous,
            purged = purged.len(),
            "Emergency key rotation, tokens signed by the previous key are no longer accepted"
        );
        Ok(pair)
    }

    fn rotate_with_grace(&self, grace: Duration) -> DomainResult<Arc<KeyPair>> {
        let _rotation = self.rotation_lock.lock();

        let material = self.source.generate()?;
        let now = self.clock.now();
        let current = self.load();

        let mut key_id = generate_key_id(now);
        while current.contains(&key_id) {
            key_id = generate_key_id(now);
        }

        let pair = Arc::new(KeyPair::new_active(key_id, self.config.algorithm, material, now));
        let mut retiring = current.retiring.clone();

        if let Some(previous) = &current.active {
            let retire_at = retire_at(now, grace);
            retiring.push(Arc::new(previous.retiring(retire_at)));
            info!(
                key_id = %pair.key_id,
                previous_key_id = %previous.key_id,
                retire_at = %retire_at,
                "Signing key rotated"
            );
        } else {
            info!(key_id = %pair.key_id, "Signing key installed");
        }

        self.publish(KeySnapshot {
            version: current.version + 1,
            active: Some(Arc::clone(&pair)),
            retiring,
        });

        Ok(pair)
    }

    /// Purges retiring pairs whose `retire_at` has passed and returns
    /// their expired descriptions
    pub fn sweep(&self) -> Vec<PublicKeyInfo> {
        let _rotation = self.rotation_lock.lock();

        let now = self.clock.now();
        let current = self.load();
        let (expired, kept): (Vec<_>, Vec<_>) = current
            .retiring
            .iter()
            .cloned()
            .partition(|pair| pair.is_due_for_expiry(now));

        if expired.is_empty() {
            debug!("Key sweep found nothing to expire");
            return Vec::new();
        }

        self.publish(KeySnapshot {
            version: current.version + 1,
            active: current.active.clone(),
            retiring: kept,
        });

        expired
            .iter()
            .map(|pair| {
                info!(key_id = %pair.key_id, "Signing key expired and purged");
                pair.expired_info()
            })
            .collect()
    }

    /// Public keys currently accepted for verification, active first
    pub fn verification_keys(&self) -> Vec<PublicKeyInfo> {
        let now = self.clock.now();
        self.load()
            .pairs()
            .filter(|pair| pair.is_usable_at(now))
            .map(|pair| pair.info())
            .collect()
    }

    /// Every pair still held by the ring, including retiring pairs past
    /// `retire_at` that the next sweep will purge
    pub fn keys(&self) -> Vec<PublicKeyInfo> {
        self.load().pairs().map(|pair| pair.info()).collect()
    }

    /// Number of retiring pairs held
    pub fn retiring_count(&self) -> usize {
        self.load()
            .retiring
            .iter()
            .filter(|pair| pair.status == KeyStatus::Retiring)
            .count()
    }

    /// How long the active key has been signing
    pub fn active_key_age(&self) -> Option<Duration> {
        let now = self.clock.now();
        self.load().active.as_ref().map(|pair| now - pair.created_at)
    }
}

fn retire_at(now: DateTime<Utc>, grace: Duration) -> DateTime<Utc> {
    now.checked_add_signed(grace).unwrap_or(DateTime::<Utc>::MAX_UTC)
}
