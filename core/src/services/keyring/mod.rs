//! Signing key ring module
//!
//! This module owns the asymmetric signing keys:
//! - Key material sourcing (in-process Ed25519 generation, PEM import)
//! - The key ring with its `ACTIVE -> RETIRING -> EXPIRED` lifecycle
//! - Scheduled rotation and sweeping

mod config;
mod key_source;
mod ring;
mod rotation;

#[cfg(test)]
mod tests;

pub use config::{is_asymmetric, parse_algorithm, KeyRingConfig};
pub use key_source::{Ed25519KeySource, KeyMaterialSource};
pub use ring::KeyRing;
pub use rotation::{KeyRotationService, KeyRotationServiceConfig, RotationCycleResult};
