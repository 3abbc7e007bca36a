//! Process-local revocation store.
//!
//! Expiry is evaluated against an injected [`Clock`], so an entry exists
//! exactly while `now < expires_at`. Expired entries are dropped by the
//! next write after the earliest of them lapses, so the map only holds
//! entries that are still live plus those expired since the last write.
//! Only correct for a single instance.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use crate::errors::StoreError;
use crate::services::clock::{Clock, SystemClock};

use super::r#trait::RevocationStore;

#[derive(Debug, Clone)]
struct StoredEntry {
    value: String,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Entries {
    map: HashMap<String, StoredEntry>,
    /// Earliest `expires_at` held; nothing is due for purging before it
    next_expiry: Option<DateTime<Utc>>,
}

impl Entries {
    fn live(&self, key: &str, now: DateTime<Utc>) -> Option<&StoredEntry> {
        self.map.get(key).filter(|entry| now < entry.expires_at)
    }

    fn insert(&mut self, key: &str, entry: StoredEntry) {
        self.next_expiry = Some(match self.next_expiry {
            Some(next) => next.min(entry.expires_at),
            None => entry.expires_at,
        });
        self.map.insert(key.to_string(), entry);
    }

    /// Drops every expired entry once the earliest one has lapsed
    fn purge_due(&mut self, now: DateTime<Utc>) -> usize {
        match self.next_expiry {
            Some(next) if next <= now => self.purge(now),
            _ => 0,
        }
    }

    fn purge(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.map.len();
        self.map.retain(|_, entry| now < entry.expires_at);
        self.next_expiry = self.map.values().map(|entry| entry.expires_at).min();
        before - self.map.len()
    }
}

/// In-memory [`RevocationStore`]
#[derive(Debug)]
pub struct InMemoryRevocationStore {
    entries: RwLock<Entries>,
    clock: Arc<dyn Clock>,
}

impl Default for InMemoryRevocationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRevocationStore {
    /// Store driven by the wall clock
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(Entries::default()),
            clock,
        }
    }

    /// Value of an unexpired entry
    pub async fn get(&self, key: &str) -> Option<String> {
        let now = self.clock.now();
        let entries = self.entries.read().await;
        entries.live(key, now).map(|entry| entry.value.clone())
    }

    /// Number of unexpired entries
    pub async fn len(&self) -> usize {
        let now = self.clock.now();
        let entries = self.entries.read().await;
        entries.map.values().filter(|entry| now < entry.expires_at).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Number of entries held in memory, expired ones included
    pub async fn held(&self) -> usize {
        self.entries.read().await.map.len()
    }

    /// Drop expired entries, returning how many were removed
    pub async fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        self.entries.write().await.purge(now)
    }

    fn expiry(&self, now: DateTime<Utc>, ttl_seconds: u64) -> DateTime<Utc> {
        let ttl = i64::try_from(ttl_seconds).unwrap_or(i64::MAX);
        now.checked_add_signed(Duration::seconds(ttl.min(i64::MAX / 1_000)))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

#[async_trait]
impl RevocationStore for InMemoryRevocationStore {
    async fn put(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<(), StoreError> {
        let now = self.clock.now();
        let entry = StoredEntry {
            value: value.to_string(),
            expires_at: self.expiry(now, ttl_seconds),
        };

        let mut entries = self.entries.write().await;
        let purged = entries.purge_due(now);
        if purged > 0 {
            debug!(purged, "Dropped expired revocation entries");
        }
        entries.insert(key, entry);
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.get(key).await.is_some())
    }

    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl_seconds: u64,
    ) -> Result<bool, StoreError> {
        let now = self.clock.now();
        let expires_at = self.expiry(now, ttl_seconds);
        let mut entries = self.entries.write().await;

        if entries.live(key, now).is_some() {
            return Ok(false);
        }

        let purged = entries.purge_due(now);
        if purged > 0 {
            debug!(purged, "Dropped expired revocation entries");
        }
        entries.insert(
            key,
            StoredEntry {
                value: value.to_string(),
                expires_at,
            },
        );
        Ok(true)
    }
}
