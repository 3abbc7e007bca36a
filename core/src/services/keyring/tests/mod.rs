
use std::sync::Arc;

use crate::services::clock::ManualClock;

use super::{Ed25519KeySource, KeyRing, KeyRingConfig};

/// Longest token TTL the test rings are configured for
pub(super) const MAX_TTL: i64 = 1_000;

pub(super) fn test_config() -> KeyRingConfig {
    KeyRingConfig {
        max_token_ttl_secs: MAX_TTL,
        default_grace_secs: MAX_TTL,
        ..Default::default()
    }
}

pub(super) fn test_ring() -> (KeyRing, ManualClock) {
    let clock = ManualClock::at_timestamp(1_700_000_000);
    let ring = KeyRing::new(test_config(), Arc::new(Ed25519KeySource), Arc::new(clock.clone()))
        .unwrap();
    (ring, clock)
}
