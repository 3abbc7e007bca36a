//! Redis-backed revocation store
//!
//! Shared by every instance of the service, so a token revoked through one
//! instance is rejected by all of them. Key layout (before the optional
//! deployment prefix from [`CacheConfig::key_prefix`](crate::cache::CacheConfig)):
//! - `revocation:{jti}` - revoked token id
//! - `revocation:session:{session_id}` - revoked session family
//! - `refresh-used:{jti}` - consumed refresh token marker

use async_trait::async_trait;
use rk_core::errors::StoreError;
use rk_core::repositories::RevocationStore;
use tracing::debug;

use crate::cache::RedisClient;

/// [`RevocationStore`] on top of [`RedisClient`]
///
/// Expiry is delegated to Redis (`EX`), so entries vanish on their own once
/// the token they guard has expired.
#[derive(Debug, Clone)]
pub struct RedisRevocationStore {
    redis_client: RedisClient,
}

impl RedisRevocationStore {
    pub fn new(redis_client: RedisClient) -> Self {
        Self { redis_client }
    }

    /// Full Redis key, including the deployment prefix
    pub fn storage_key(&self, key: &str) -> String {
        self.redis_client.config().make_key(key)
    }

    /// PING the backing Redis
    pub async fn health_check(&self) -> bool {
        self.redis_client.health_check().await.unwrap_or(false)
    }
}

#[async_trait]
impl RevocationStore for RedisRevocationStore {
    async fn put(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<(), StoreError> {
        if ttl_seconds == 0 {
            debug!(key, "Skipping revocation write with zero TTL");
            return Ok(());
        }

        let key = self.storage_key(key);
        self.redis_client
            .set_with_expiry(&key, value, ttl_seconds)
            .await
            .map_err(StoreError::from)
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let key = self.storage_key(key);
        self.redis_client.exists(&key).await.map_err(StoreError::from)
    }

    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl_seconds: u64,
    ) -> Result<bool, StoreError> {
        // Redis rejects EX 0; such an entry would expire at once, so only
        // report whether a live one is in the way
        if ttl_seconds == 0 {
            return self.exists(key).await.map(|exists| !exists);
        }

        let key = self.storage_key(key);
        self.redis_client
            .set_if_absent_with_expiry(&key, value, ttl_seconds)
            .await
            .map_err(StoreError::from)
    }
}
