//! # Infrastructure Layer
//!
//! Concrete adapters for the RotaKey credential core.
//!
//! ## Architecture
//!
//! The infrastructure layer contains:
//! - **Cache**: Redis client and the Redis-backed revocation store
//! - **Services**: wiring of key ring, token service, refresh controller and
//!   rotation scheduler from an [`rk_shared::AppConfig`]
//!
//! ## Features
//!
//! - `redis-cache`: Enable the tokio Redis connection (default)

use rk_core::errors::{DomainError, StoreError};
use rk_shared::logging::LoggingError;

/// Cache module - Redis client and revocation store
pub mod cache;

/// Services module - credential service wiring
pub mod services;

pub use services::CredentialServices;

/// Configuration module for infrastructure services
pub mod config {
    //! Configuration management for infrastructure services
    //!
    //! Handles:
    //! - Revocation store backend selection
    //! - Redis configuration

    use rk_shared::config::AppConfig;
    use serde::{Deserialize, Serialize};

    pub use rk_shared::config::{CacheConfig, RevocationBackend};

    /// Infrastructure configuration settings
    #[derive(Debug, Clone, Default, Serialize, Deserialize)]
    pub struct InfrastructureConfig {
        /// Which revocation store to build
        #[serde(default)]
        pub revocation_backend: RevocationBackend,
        /// Redis configuration, used by the Redis backend
        #[serde(default)]
        pub cache: CacheConfig,
    }

    impl From<&AppConfig> for InfrastructureConfig {
        fn from(config: &AppConfig) -> Self {
            Self {
                revocation_backend: config.revocation_backend,
                cache: config.cache.clone(),
            }
        }
    }
}

/// Environment files read by [`load_config`], in precedence order
pub fn env_files(environment: rk_shared::Environment) -> [&'static str; 2] {
    [environment.env_file(), ".env"]
}

/// Load the application configuration from the environment
///
/// The environment specific file (e.g. `.env.production`) is read first,
/// then `.env`. Neither overrides variables that are already set.
pub fn load_config() -> rk_shared::AppConfig {
    for file in env_files(rk_shared::Environment::from_env()) {
        if let Ok(path) = dotenvy::from_filename(file) {
            tracing::debug!(path = %path.display(), "Loaded environment file");
        }
    }
    rk_shared::AppConfig::from_env()
}

/// Load configuration, install logging and build the credential services
pub async fn initialize() -> Result<CredentialServices, InfrastructureError> {
    let config = load_config();

    match rk_shared::logging::init(&config.logging) {
        Ok(()) => {}
        // A subscriber installed by the host application takes precedence
        Err(LoggingError::Install(e)) => {
            tracing::debug!(error = %e, "Keeping the installed tracing subscriber");
        }
        Err(e) => return Err(InfrastructureError::Config(e.to_string())),
    }

    tracing::info!(environment = ?config.environment, "Initializing credential services...");
    let services = CredentialServices::build(config).await?;
    tracing::info!("Credential services initialized successfully");

    Ok(services)
}

/// Infrastructure-specific error types
#[derive(Debug, thiserror::Error)]
pub enum InfrastructureError {
    /// Redis cache error
    #[error("Cache error: {0}")]
    Cache(#[from] redis::RedisError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Core service construction failed
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    /// General infrastructure error
    #[error("Infrastructure error: {0}")]
    General(String),
}

impl From<InfrastructureError> for StoreError {
    fn from(err: InfrastructureError) -> Self {
        match err {
            InfrastructureError::Cache(e) if cache::redis_client::is_retriable_error(&e) => {
                StoreError::Unavailable(e.to_string())
            }
            InfrastructureError::Cache(e) => StoreError::Backend(e.to_string()),
            other => StoreError::Backend(other.to_string()),
        }
    }
}
