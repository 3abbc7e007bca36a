//! # RotaKey Core
//!
//! Credential lifecycle core: issues, validates, refreshes and revokes
//! signed access/refresh token pairs against a rotating set of
//! asymmetric signing keys.
//!
//! - [`services::KeyRing`] owns the signing keys and their
//!   `ACTIVE -> RETIRING -> EXPIRED` lifecycle
//! - [`services::TokenService`] mints and verifies tokens
//! - [`services::SessionRefreshController`] implements single-use refresh,
//!   reuse detection and logout
//! - [`repositories::RevocationStore`] is the shared revocation store seam

pub mod domain;
pub mod errors;
pub mod repositories;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::{
    ClientContext, KeyMaterial, KeyPair, KeyStatus, PublicKeyInfo, RevocationEntry,
    RevocationReason, SubjectIdentity, TokenClaims, TokenPair, TokenType,
};
pub use errors::{DomainError, DomainResult, StoreError, TokenError, TokenErrorKind};
pub use repositories::{InMemoryRevocationStore, RevocationStore};
pub use services::{
    Clock, Ed25519KeySource, KeyRing, KeyRingConfig, KeyRotationService,
    KeyRotationServiceConfig, ManualClock, RefreshControllerConfig, SessionRefreshController,
    SystemClock, TokenService, TokenServiceConfig,
};
