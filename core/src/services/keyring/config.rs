//! Key ring configuration

use std::str::FromStr;

use chrono::Duration;
use jsonwebtoken::Algorithm;
use rk_shared::config::{KeyRotationConfig, TokenConfig};

use crate::domain::entities::token::DEFAULT_REFRESH_TOKEN_TTL_SECS;
use crate::errors::{DomainError, DomainResult};

/// Configuration for the signing key ring
#[derive(Debug, Clone)]
pub struct KeyRingConfig {
    /// The one asymmetric algorithm every key in the ring uses
    pub algorithm: Algorithm,
    /// Longest lifetime of any token signed by a ring key, in seconds.
    /// Scheduled rotations must keep the previous key at least this long.
    pub max_token_ttl_secs: i64,
    /// Grace period applied when a rotation does not specify one, in seconds
    pub default_grace_secs: i64,
}

impl Default for KeyRingConfig {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::EdDSA,
            max_token_ttl_secs: DEFAULT_REFRESH_TOKEN_TTL_SECS,
            default_grace_secs: DEFAULT_REFRESH_TOKEN_TTL_SECS,
        }
    }
}

impl KeyRingConfig {
    /// Builds the ring configuration from the shared token and rotation settings
    pub fn from_shared(token: &TokenConfig, rotation: &KeyRotationConfig) -> DomainResult<Self> {
        let config = Self {
            algorithm: parse_algorithm(&token.algorithm)?,
            max_token_ttl_secs: token.max_token_ttl_secs(),
            default_grace_secs: rotation.effective_grace_secs(token),
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks the configured default grace against the longest token TTL
    pub fn validate(&self) -> DomainResult<()> {
        ensure_asymmetric(self.algorithm)?;
        if self.max_token_ttl_secs <= 0 {
            return Err(DomainError::Configuration {
                message: "max token TTL must be positive".to_string(),
            });
        }
        self.check_grace(self.default_grace())
    }

    /// Rejects a grace period that would orphan outstanding tokens
    pub fn check_grace(&self, grace: Duration) -> DomainResult<()> {
        if grace.num_seconds() < self.max_token_ttl_secs {
            return Err(DomainError::Validation {
                message: format!(
                    "grace period of {}s is shorter than the longest token TTL ({}s)",
                    grace.num_seconds(),
                    self.max_token_ttl_secs
                ),
            });
        }
        Ok(())
    }

    pub fn default_grace(&self) -> Duration {
        Duration::seconds(self.default_grace_secs)
    }
}

/// Parses a JWS algorithm name, accepting asymmetric algorithms only
pub fn parse_algorithm(name: &str) -> DomainResult<Algorithm> {
    let algorithm = Algorithm::from_str(name).map_err(|_| DomainError::Configuration {
        message: format!("unknown signing algorithm: {}", name),
    })?;
    ensure_asymmetric(algorithm)?;
    Ok(algorithm)
}

/// Whether `algorithm` signs with a private key and verifies with a public one
pub fn is_asymmetric(algorithm: Algorithm) -> bool {
    !matches!(algorithm, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512)
}

fn ensure_asymmetric(algorithm: Algorithm) -> DomainResult<()> {
    if is_asymmetric(algorithm) {
        Ok(())
    } else {
        Err(DomainError::Configuration {
            message: format!("symmetric algorithm {:?} is not allowed", algorithm),
        })
    }
}
