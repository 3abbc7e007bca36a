//! Cache module for the Redis-backed revocation store
//!
//! This module provides the Redis client (connection retry, masked URL
//! logging, health check) and the [`RevocationStore`](rk_core::repositories::RevocationStore)
//! adapter built on it.

pub mod redis_client;
pub mod revocation_store;


pub use redis_client::RedisClient;
pub use revocation_store::RedisRevocationStore;

// Re-export commonly used types
pub use rk_shared::config::cache::CacheConfig;
