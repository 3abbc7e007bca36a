//! Revocation store trait: the shared key/value store holding revocation
//! entries and single-use refresh markers.

use async_trait::async_trait;

use crate::errors::StoreError;

/// Key/value store with per-entry expiry
///
/// Every instance of the service must talk to the same store; an
/// in-process implementation is only correct for a single instance.
/// Implementations report failures as [`StoreError`] and never decide
/// the fail-open/fail-closed policy themselves.
#[async_trait]
pub trait RevocationStore: Send + Sync {
    /// Write `key` with the given value, expiring after `ttl_seconds`.
    /// Overwrites any existing entry.
    async fn put(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<(), StoreError>;

    /// Whether an unexpired entry exists under `key`
    async fn exists(&self, key: &str) -> Result<bool, StoreError>;

    /// Atomically write `key` only if no unexpired entry exists.
    ///
    /// # Returns
    /// * `Ok(true)` - The entry was written by this call
    /// * `Ok(false)` - An entry already existed; nothing was written
    /// * `Err(StoreError)` - The store could not be reached
    async fn set_if_absent(&self, key: &str, value: &str, ttl_seconds: u64)
        -> Result<bool, StoreError>;
}
