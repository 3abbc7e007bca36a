//! Shared wiring for service unit tests

use std::sync::Arc;

use crate::domain::value_objects::SubjectIdentity;
use crate::repositories::MockRevocationStore;
use crate::services::clock::ManualClock;
use crate::services::keyring::{Ed25519KeySource, KeyRing, KeyRingConfig};
use crate::services::session::{RefreshControllerConfig, SessionRefreshController};
use crate::services::token::{TokenService, TokenServiceConfig};

/// Issuance instant used by every fixture
pub(crate) const T0: i64 = 1_700_000_000;

pub(crate) const ACCESS_TTL: i64 = 900;
pub(crate) const REFRESH_TTL: i64 = 2_592_000;

pub(crate) struct Fixture {
    pub clock: ManualClock,
    pub store: Arc<MockRevocationStore>,
    pub ring: Arc<KeyRing>,
    pub tokens: Arc<TokenService<MockRevocationStore>>,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_config(token_config())
    }

    pub fn with_config(config: TokenServiceConfig) -> Self {
        let clock = ManualClock::at_timestamp(T0);
        let ring_config = KeyRingConfig {
            algorithm: config.algorithm,
            max_token_ttl_secs: config.max_token_ttl_secs(),
            default_grace_secs: config.max_token_ttl_secs(),
        };
        let ring = Arc::new(
            KeyRing::new(ring_config, Arc::new(Ed25519KeySource), Arc::new(clock.clone())).unwrap(),
        );
        let store = Arc::new(MockRevocationStore::new(Arc::new(clock.clone())));
        let tokens = Arc::new(
            TokenService::new(Arc::clone(&store), Arc::clone(&ring), Arc::new(clock.clone()), config)
                .unwrap(),
        );

        Self {
            clock,
            store,
            ring,
            tokens,
        }
    }

    pub fn controller(&self) -> SessionRefreshController<MockRevocationStore> {
        self.controller_with(RefreshControllerConfig::default())
    }

    pub fn controller_with(
        &self,
        config: RefreshControllerConfig,
    ) -> SessionRefreshController<MockRevocationStore> {
        SessionRefreshController::new(Arc::clone(&self.tokens), config)
    }
}

pub(crate) fn token_config() -> TokenServiceConfig {
    TokenServiceConfig {
        access_token_ttl_secs: ACCESS_TTL,
        refresh_token_ttl_secs: REFRESH_TTL,
        ..Default::default()
    }
}

pub(crate) fn identity() -> SubjectIdentity {
    SubjectIdentity::new("user_1")
        .with_org("org_A")
        .with_roles(["user"])
        .with_permissions(["orders:read", "orders:write"])
}
