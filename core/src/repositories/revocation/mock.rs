//! Mock implementation of RevocationStore for testing
//!
//! Wraps the in-memory store and adds failure injection, an artificial
//! delay and per-operation call counters.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::errors::StoreError;
use crate::services::clock::Clock;

use super::memory::InMemoryRevocationStore;
use super::r#trait::RevocationStore;

#[derive(Debug, Clone, Default)]
enum Failure {
    #[default]
    Healthy,
    Next(usize, StoreError),
    Always(StoreError),
}

impl Failure {
    fn take(&mut self) -> Option<StoreError> {
        match self {
            Failure::Healthy => None,
            Failure::Always(err) => Some(err.clone()),
            Failure::Next(remaining, err) => {
                let err = err.clone();
                *remaining -= 1;
                if *remaining == 0 {
                    *self = Failure::Healthy;
                }
                Some(err)
            }
        }
    }
}

/// Mock revocation store for testing
#[derive(Debug)]
pub struct MockRevocationStore {
    inner: InMemoryRevocationStore,
    read_failure: Mutex<Failure>,
    write_failure: Mutex<Failure>,
    delay: Mutex<Option<Duration>>,
    exists_calls: AtomicUsize,
    put_calls: AtomicUsize,
    set_if_absent_calls: AtomicUsize,
}

impl MockRevocationStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: InMemoryRevocationStore::with_clock(clock),
            read_failure: Mutex::new(Failure::Healthy),
            write_failure: Mutex::new(Failure::Healthy),
            delay: Mutex::new(None),
            exists_calls: AtomicUsize::new(0),
            put_calls: AtomicUsize::new(0),
            set_if_absent_calls: AtomicUsize::new(0),
        }
    }

    /// Fail the next `count` reads with `err`, then recover
    pub fn fail_next_reads(&self, count: usize, err: StoreError) {
        if count > 0 {
            *self.read_failure.lock() = Failure::Next(count, err);
        }
    }

    /// Fail every read until [`heal`](Self::heal)
    pub fn fail_reads(&self, err: StoreError) {
        *self.read_failure.lock() = Failure::Always(err);
    }

    /// Fail every write (`put` and `set_if_absent`) until [`heal`](Self::heal)
    pub fn fail_writes(&self, err: StoreError) {
        *self.write_failure.lock() = Failure::Always(err);
    }

    /// Sleep before answering every call
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }

    pub fn heal(&self) {
        *self.read_failure.lock() = Failure::Healthy;
        *self.write_failure.lock() = Failure::Healthy;
        *self.delay.lock() = None;
    }

    pub fn exists_calls(&self) -> usize {
        self.exists_calls.load(Ordering::SeqCst)
    }

    pub fn put_calls(&self) -> usize {
        self.put_calls.load(Ordering::SeqCst)
    }

    pub fn set_if_absent_calls(&self) -> usize {
        self.set_if_absent_calls.load(Ordering::SeqCst)
    }

    /// Direct access to the stored value, bypassing failure injection
    pub async fn value(&self, key: &str) -> Option<String> {
        self.inner.get(key).await
    }

    async fn pause(&self) {
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl RevocationStore for MockRevocationStore {
    async fn put(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<(), StoreError> {
        self.put_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        if let Some(err) = self.write_failure.lock().take() {
            return Err(err);
        }
        self.inner.put(key, value, ttl_seconds).await
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        self.exists_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        if let Some(err) = self.read_failure.lock().take() {
            return Err(err);
        }
        self.inner.exists(key).await
    }

    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl_seconds: u64,
    ) -> Result<bool, StoreError> {
        self.set_if_absent_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        if let Some(err) = self.write_failure.lock().take() {
            return Err(err);
        }
        self.inner.set_if_absent(key, value, ttl_seconds).await
    }
}
