//! Token service module
//!
//! This module handles all token-related operations including:
//! - Access/refresh pair generation signed by the key ring's active key
//! - Validation in a fixed check order, algorithm pinned before key use
//! - Revocation of single tokens and whole session families
//! - Bounded, policy-driven access to the revocation store

mod codec;
mod config;
mod service;

#[cfg(test)]
mod tests;

pub use config::{TokenServiceConfig, DEFAULT_STORE_TIMEOUT};
pub(crate) use service::TimeCheck;
pub use service::TokenService;
