//! Credential lifecycle error taxonomy
//!
//! Every validation, refresh and revocation failure is one of the kinds below.
//! They are returned as values, never used for control flow by panicking, so
//! every call site has to decide what to do with each kind.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Message shown to untrusted clients for every credential failure
pub const UNAUTHENTICATED_MESSAGE: &str = "unauthenticated";

/// Token lifecycle errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("Token is malformed: {reason}")]
    TokenMalformed { reason: String },

    #[error("Token algorithm '{found}' does not match the configured algorithm")]
    AlgorithmMismatch { found: String },

    #[error("Token signature verification failed")]
    SignatureInvalid,

    #[error("Signing key not found: {key_id}")]
    KeyNotFound { key_id: String },

    #[error("Token expired")]
    TokenExpired,

    #[error("Token not yet valid")]
    TokenNotYetValid,

    #[error("Token audience mismatch")]
    AudienceMismatch,

    #[error("Token issuer mismatch")]
    IssuerMismatch,

    #[error("Token type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    #[error("Token revoked")]
    TokenRevoked,

    #[error("Refresh token reuse detected")]
    RefreshReuseDetected,

    #[error("Revocation store unavailable")]
    RevocationStoreUnavailable,

    #[error("No active signing key")]
    NoActiveKey,

    #[error("Token generation failed")]
    TokenGenerationFailed,
}

/// Field-less discriminant of [`TokenError`], for logs and metrics labels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TokenErrorKind {
    TokenMalformed,
    AlgorithmMismatch,
    SignatureInvalid,
    KeyNotFound,
    TokenExpired,
    TokenNotYetValid,
    AudienceMismatch,
    IssuerMismatch,
    TypeMismatch,
    TokenRevoked,
    RefreshReuseDetected,
    RevocationStoreUnavailable,
    NoActiveKey,
    TokenGenerationFailed,
}

impl TokenError {
    /// Shorthand for a malformed-token error
    pub fn malformed(reason: impl Into<String>) -> Self {
        TokenError::TokenMalformed { reason: reason.into() }
    }

    /// The kind of this error
    pub fn kind(&self) -> TokenErrorKind {
        match self {
            TokenError::TokenMalformed { .. } => TokenErrorKind::TokenMalformed,
            TokenError::AlgorithmMismatch { .. } => TokenErrorKind::AlgorithmMismatch,
            TokenError::SignatureInvalid => TokenErrorKind::SignatureInvalid,
            TokenError::KeyNotFound { .. } => TokenErrorKind::KeyNotFound,
            TokenError::TokenExpired => TokenErrorKind::TokenExpired,
            TokenError::TokenNotYetValid => TokenErrorKind::TokenNotYetValid,
            TokenError::AudienceMismatch => TokenErrorKind::AudienceMismatch,
            TokenError::IssuerMismatch => TokenErrorKind::IssuerMismatch,
            TokenError::TypeMismatch { .. } => TokenErrorKind::TypeMismatch,
            TokenError::TokenRevoked => TokenErrorKind::TokenRevoked,
            TokenError::RefreshReuseDetected => TokenErrorKind::RefreshReuseDetected,
            TokenError::RevocationStoreUnavailable => TokenErrorKind::RevocationStoreUnavailable,
            TokenError::NoActiveKey => TokenErrorKind::NoActiveKey,
            TokenError::TokenGenerationFailed => TokenErrorKind::TokenGenerationFailed,
        }
    }

    /// Message safe to return to an untrusted client.
    ///
    /// Always the same text so that clients cannot tell an expired token
    /// from a revoked one.
    pub fn public_message(&self) -> &'static str {
        UNAUTHENTICATED_MESSAGE
    }

    /// Whether this failure is a security event that warrants alerting
    pub fn is_security_event(&self) -> bool {
        matches!(
            self,
            TokenError::AlgorithmMismatch { .. }
                | TokenError::SignatureInvalid
                | TokenError::RefreshReuseDetected
        )
    }
}

impl TokenErrorKind {
    /// Stable code for logs and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenErrorKind::TokenMalformed => "TOKEN_MALFORMED",
            TokenErrorKind::AlgorithmMismatch => "ALGORITHM_MISMATCH",
            TokenErrorKind::SignatureInvalid => "SIGNATURE_INVALID",
            TokenErrorKind::KeyNotFound => "KEY_NOT_FOUND",
            TokenErrorKind::TokenExpired => "TOKEN_EXPIRED",
            TokenErrorKind::TokenNotYetValid => "TOKEN_NOT_YET_VALID",
            TokenErrorKind::AudienceMismatch => "AUDIENCE_MISMATCH",
            TokenErrorKind::IssuerMismatch => "ISSUER_MISMATCH",
            TokenErrorKind::TypeMismatch => "TYPE_MISMATCH",
            TokenErrorKind::TokenRevoked => "TOKEN_REVOKED",
            TokenErrorKind::RefreshReuseDetected => "REFRESH_REUSE_DETECTED",
            TokenErrorKind::RevocationStoreUnavailable => "REVOCATION_STORE_UNAVAILABLE",
            TokenErrorKind::NoActiveKey => "NO_ACTIVE_KEY",
            TokenErrorKind::TokenGenerationFailed => "TOKEN_GENERATION_FAILED",
        }
    }
}

impl std::fmt::Display for TokenErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors reported by a revocation store implementation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Store could not be reached (connection refused, reset, loading)
    #[error("Revocation store unavailable: {0}")]
    Unavailable(String),

    /// Call did not complete within the configured bound
    #[error("Revocation store call timed out")]
    Timeout,

    /// Store answered with an error that retrying will not fix
    #[error("Revocation store error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Whether a retry of the same call may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unavailable(_) | StoreError::Timeout)
    }
}
