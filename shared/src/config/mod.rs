//! Configuration module with sub-modules per concern
//!
//! - `auth` - Token issuance, key rotation and revocation policy
//! - `cache` - Revocation store backend and Redis connection
//! - `environment` - Environment detection and logging configuration

pub mod auth;
pub mod cache;
pub mod environment;

use serde::{Deserialize, Serialize};

// Re-export commonly used types
pub use auth::{AuthConfig, FailurePolicy, KeyRotationConfig, ReusePolicy, RevocationConfig, TokenConfig};
pub use cache::{CacheConfig, RevocationBackend};
pub use environment::{Environment, LogFormat, LoggingConfig};

/// Complete configuration combining all sub-configurations
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Environment configuration
    pub environment: Environment,

    /// Token, rotation and revocation configuration
    #[serde(default)]
    pub auth: AuthConfig,

    /// Revocation store backend selection
    #[serde(default)]
    pub revocation_backend: RevocationBackend,

    /// Redis configuration (used when the backend is Redis)
    #[serde(default)]
    pub cache: CacheConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        let env = Environment::default();
        Self {
            environment: env,
            auth: AuthConfig::default(),
            revocation_backend: RevocationBackend::default(),
            cache: CacheConfig::default(),
            logging: LoggingConfig::for_environment(env),
        }
    }
}

impl AppConfig {
    /// Create configuration for development environment
    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            auth: AuthConfig::default(),
            revocation_backend: RevocationBackend::Memory,
            cache: CacheConfig::default(),
            logging: LoggingConfig::for_environment(Environment::Development),
        }
    }

    /// Create configuration for production environment
    pub fn production() -> Self {
        Self {
            environment: Environment::Production,
            auth: AuthConfig::default(),
            revocation_backend: RevocationBackend::Redis,
            cache: CacheConfig::new("redis://redis:6379").with_prefix("rotakey"),
            logging: LoggingConfig::for_environment(Environment::Production),
        }
    }

    /// Load configuration from environment
    pub fn from_env() -> Self {
        let env = Environment::from_env();
        let mut config = match env {
            Environment::Development => Self::development(),
            Environment::Production => Self::production(),
            Environment::Staging => {
                let mut config = Self::production();
                config.environment = Environment::Staging;
                config.logging = LoggingConfig::for_environment(Environment::Staging);
                config
            }
        };

        config.auth = AuthConfig::from_env();
        if let Some(backend) = std::env::var("RK_REVOCATION_BACKEND")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            config.revocation_backend = backend;
        }
        if std::env::var("REDIS_URL").is_ok() {
            config.cache = CacheConfig::from_env();
        }
        if let Ok(level) = std::env::var("RUST_LOG") {
            config.logging.level = level;
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_development_uses_memory_backend() {
        let config = AppConfig::development();
        assert_eq!(config.revocation_backend, RevocationBackend::Memory);
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_production_uses_redis_backend() {
        let config = AppConfig::production();
        assert_eq!(config.revocation_backend, RevocationBackend::Redis);
        assert_eq!(config.cache.make_key("revocation:x"), "rotakey:revocation:x");
        assert_eq!(config.auth.revocation.access_failure_policy, FailurePolicy::FailClosed);
    }
}
