//! Domain-specific error types and error handling.

mod types;

// Re-export all error types and utilities
pub use types::{StoreError, TokenError, TokenErrorKind, UNAUTHENTICATED_MESSAGE};

use thiserror::Error;

/// Core domain errors (general purpose)
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Key material error: {message}")]
    KeyMaterial { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },

    // Bridge to specific error types
    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl DomainError {
    /// Token error kind, when this error carries one
    pub fn token_kind(&self) -> Option<TokenErrorKind> {
        match self {
            DomainError::Token(err) => Some(err.kind()),
            _ => None,
        }
    }
}

pub type DomainResult<T> = Result<T, DomainError>;
