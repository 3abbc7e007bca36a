//! Shared configuration and logging setup for the RotaKey workspace
//!
//! - Configuration types (token TTLs, rotation schedule, revocation policy,
//!   Redis connection, environment, logging)
//! - Tracing subscriber installation

pub mod config;
pub mod logging;

// Re-export commonly used items at crate root
pub use config::{
    AppConfig, AuthConfig, CacheConfig, Environment, FailurePolicy, KeyRotationConfig,
    LogFormat, LoggingConfig, ReusePolicy, RevocationBackend, RevocationConfig, TokenConfig,
};
