//! Wiring of the credential core from an [`AppConfig`]
//!
//! Builds, in order: the revocation store for the configured backend, the
//! key ring (seeded from a PEM file when one is configured), the token
//! service, the refresh controller and the key rotation scheduler.

use std::sync::Arc;

use rk_core::domain::KeyMaterial;
use rk_core::repositories::{InMemoryRevocationStore, RevocationStore};
use rk_core::services::{
    Clock, Ed25519KeySource, KeyMaterialSource, KeyRing, KeyRingConfig, KeyRotationService,
    KeyRotationServiceConfig, RefreshControllerConfig, SessionRefreshController, SystemClock,
    TokenService, TokenServiceConfig,
};
use rk_shared::config::{AppConfig, RevocationBackend};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::cache::{RedisClient, RedisRevocationStore};
use crate::config::InfrastructureConfig;
use crate::InfrastructureError;

/// Revocation store shared by every service instance
pub type SharedRevocationStore = Arc<dyn RevocationStore>;

/// Build the revocation store selected by `config.revocation_backend`
pub async fn build_revocation_store(
    config: &InfrastructureConfig,
    clock: Arc<dyn Clock>,
) -> Result<SharedRevocationStore, InfrastructureError> {
    match config.revocation_backend {
        RevocationBackend::Redis => {
            let client = RedisClient::new(config.cache.clone()).await?;
            if !client.health_check().await? {
                return Err(InfrastructureError::General(
                    "Redis health check failed".to_string(),
                ));
            }
            Ok(Arc::new(RedisRevocationStore::new(client)))
        }
        RevocationBackend::Memory => {
            warn!("Using the in-memory revocation store; revocations are not shared between instances");
            Ok(Arc::new(InMemoryRevocationStore::with_clock(clock)))
        }
    }
}

/// The assembled credential core
pub struct CredentialServices {
    pub config: AppConfig,
    pub revocation_store: SharedRevocationStore,
    pub key_ring: Arc<KeyRing>,
    pub tokens: Arc<TokenService<dyn RevocationStore>>,
    pub sessions: Arc<SessionRefreshController<dyn RevocationStore>>,
    pub rotation: Arc<KeyRotationService>,
}

impl CredentialServices {
    /// Build every service against the wall clock
    pub async fn build(config: AppConfig) -> Result<Self, InfrastructureError> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let store = build_revocation_store(&InfrastructureConfig::from(&config), clock.clone()).await?;
        Self::with_store(config, store, clock)
    }

    /// Build every service on top of an existing store and clock
    pub fn with_store(
        config: AppConfig,
        revocation_store: SharedRevocationStore,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, InfrastructureError> {
        let auth = &config.auth;
        let ring_config = KeyRingConfig::from_shared(&auth.token, &auth.rotation)?;
        let source: Arc<dyn KeyMaterialSource> = Arc::new(Ed25519KeySource);

        let key_ring = match &auth.rotation.initial_key_path {
            Some(path) => {
                info!(path = %path, "Loading initial signing key");
                let material = KeyMaterial::from_pem_file(path)?;
                KeyRing::with_initial_material(ring_config, source, clock.clone(), material)?
            }
            None => KeyRing::new(ring_config, source, clock.clone())?,
        };
        let key_ring = Arc::new(key_ring);

        let token_config = TokenServiceConfig::from_shared(&auth.token, &auth.revocation)?;
        let tokens = Arc::new(TokenService::new(
            revocation_store.clone(),
            key_ring.clone(),
            clock,
            token_config,
        )?);

        let sessions = Arc::new(SessionRefreshController::new(
            tokens.clone(),
            RefreshControllerConfig::from_shared(&auth.revocation),
        ));

        let rotation = Arc::new(KeyRotationService::new(
            key_ring.clone(),
            KeyRotationServiceConfig::from_shared(&auth.rotation, &auth.token),
        ));

        Ok(Self {
            config,
            revocation_store,
            key_ring,
            tokens,
            sessions,
            rotation,
        })
    }

    /// Spawn the rotation scheduler; `None` when rotation is disabled
    pub fn start_key_rotation(&self) -> Option<JoinHandle<()>> {
        self.rotation.clone().start_background_task()
    }
}
