//! Domain entities representing issued credentials and signing keys.

pub mod key_pair;
pub mod token;

// Re-export commonly used types
pub use key_pair::{generate_key_id, KeyMaterial, KeyPair, KeyStatus, PublicKeyInfo};
pub use token::{
    refresh_consumed_key, revocation_key, session_revocation_key, RevocationEntry,
    RevocationReason, TokenClaims, TokenPair, TokenType, DEFAULT_ACCESS_TOKEN_TTL_SECS,
    DEFAULT_REFRESH_TOKEN_TTL_SECS,
};
