//! Business services containing the credential lifecycle logic.

pub mod clock;
pub mod keyring;
pub mod session;
pub mod token;

#[cfg(test)]
pub(crate) mod fixtures;

// Re-export commonly used types
pub use clock::{Clock, ManualClock, SystemClock};
pub use keyring::{
    Ed25519KeySource, KeyMaterialSource, KeyRing, KeyRingConfig, KeyRotationService,
    KeyRotationServiceConfig, RotationCycleResult,
};
pub use session::{RefreshControllerConfig, SessionRefreshController};
pub use token::{TokenService, TokenServiceConfig};
