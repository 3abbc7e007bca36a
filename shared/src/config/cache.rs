//! Revocation store backend configuration

use serde::{Deserialize, Serialize};

use super::auth::env_parse;

/// Redis connection configuration for the revocation store
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    /// Redis connection URL
    pub url: String,

    /// Connection timeout in seconds
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout: u64,

    /// Number of connection attempts at startup
    #[serde(default = "default_connect_attempts")]
    pub connect_attempts: u32,

    /// Base delay between connection attempts in milliseconds (doubles each attempt)
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,

    /// Prefix prepended to every key, e.g. one per deployment
    #[serde(default)]
    pub key_prefix: Option<String>,

    /// Redis database number (0-15)
    #[serde(default)]
    pub database: u8,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            url: String::from("redis://localhost:6379"),
            connection_timeout: default_connection_timeout(),
            connect_attempts: default_connect_attempts(),
            retry_delay_ms: default_retry_delay(),
            key_prefix: None,
            database: 0,
        }
    }
}

impl CacheConfig {
    /// Create from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            url: std::env::var("REDIS_URL").unwrap_or(defaults.url),
            connection_timeout: env_parse("REDIS_CONNECTION_TIMEOUT", defaults.connection_timeout),
            connect_attempts: env_parse("REDIS_CONNECT_ATTEMPTS", defaults.connect_attempts),
            retry_delay_ms: env_parse("REDIS_RETRY_DELAY_MS", defaults.retry_delay_ms),
            key_prefix: std::env::var("REDIS_KEY_PREFIX").ok().filter(|p| !p.is_empty()),
            database: env_parse("REDIS_DATABASE", defaults.database).min(15),
        }
    }

    /// Create a new cache configuration with URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Set the key prefix for all cache keys
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    /// Set the database number
    pub fn with_database(mut self, db: u8) -> Self {
        self.database = db.min(15);
        self
    }

    /// Generate a cache key with prefix
    pub fn make_key(&self, key: &str) -> String {
        match &self.key_prefix {
            Some(prefix) => format!("{}:{}", prefix, key),
            None => key.to_string(),
        }
    }
}

/// Which revocation store implementation to construct
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RevocationBackend {
    /// Shared Redis instance (required for multi-instance deployments)
    #[default]
    Redis,
    /// Process-local map (single instance, development, tests)
    Memory,
}

impl std::str::FromStr for RevocationBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "redis" => Ok(RevocationBackend::Redis),
            "memory" | "in-memory" => Ok(RevocationBackend::Memory),
            _ => Err(format!("Invalid revocation backend: {}", s)),
        }
    }
}

fn default_connection_timeout() -> u64 {
    5
}

fn default_connect_attempts() -> u32 {
    3
}

fn default_retry_delay() -> u64 {
    100
}
