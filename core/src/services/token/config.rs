//! Configuration for the token service

use std::time::Duration;

use jsonwebtoken::Algorithm;
use rk_shared::config::{FailurePolicy, RevocationConfig, TokenConfig};

use crate::domain::entities::token::{
    TokenType, DEFAULT_ACCESS_TOKEN_TTL_SECS, DEFAULT_REFRESH_TOKEN_TTL_SECS,
};
use crate::errors::{DomainError, DomainResult};
use crate::services::keyring::{is_asymmetric, parse_algorithm};

/// Default upper bound for one revocation store call
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_millis(250);

/// Configuration for the token service
#[derive(Debug, Clone)]
pub struct TokenServiceConfig {
    /// `iss` claim written and required
    pub issuer: String,
    /// `aud` claim written and required
    pub audience: String,
    /// Access token lifetime in seconds
    pub access_token_ttl_secs: i64,
    /// Refresh token lifetime in seconds
    pub refresh_token_ttl_secs: i64,
    /// The only algorithm accepted in token headers
    pub algorithm: Algorithm,
    /// Bound for each revocation store call
    pub store_timeout: Duration,
    /// Store outage behaviour when validating access tokens
    pub access_failure_policy: FailurePolicy,
    /// Store outage behaviour when validating or consuming refresh tokens
    pub refresh_failure_policy: FailurePolicy,
}

impl Default for TokenServiceConfig {
    fn default() -> Self {
        Self {
            issuer: "rotakey".to_string(),
            audience: "rotakey-api".to_string(),
            access_token_ttl_secs: DEFAULT_ACCESS_TOKEN_TTL_SECS,
            refresh_token_ttl_secs: DEFAULT_REFRESH_TOKEN_TTL_SECS,
            algorithm: Algorithm::EdDSA,
            store_timeout: DEFAULT_STORE_TIMEOUT,
            access_failure_policy: FailurePolicy::FailClosed,
            refresh_failure_policy: FailurePolicy::FailClosed,
        }
    }
}

impl TokenServiceConfig {
    /// Builds the service configuration from the shared settings
    pub fn from_shared(token: &TokenConfig, revocation: &RevocationConfig) -> DomainResult<Self> {
        let config = Self {
            issuer: token.issuer.clone(),
            audience: token.audience.clone(),
            access_token_ttl_secs: token.access_token_ttl_secs,
            refresh_token_ttl_secs: token.refresh_token_ttl_secs,
            algorithm: parse_algorithm(&token.algorithm)?,
            store_timeout: Duration::from_millis(revocation.store_timeout_ms),
            access_failure_policy: revocation.access_failure_policy,
            refresh_failure_policy: revocation.refresh_failure_policy,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> DomainResult<()> {
        if !is_asymmetric(self.algorithm) {
            return Err(DomainError::Configuration {
                message: format!("symmetric algorithm {:?} is not allowed", self.algorithm),
            });
        }
        if self.access_token_ttl_secs <= 0 || self.refresh_token_ttl_secs <= 0 {
            return Err(DomainError::Configuration {
                message: "token lifetimes must be positive".to_string(),
            });
        }
        if self.store_timeout.is_zero() {
            return Err(DomainError::Configuration {
                message: "store timeout must be positive".to_string(),
            });
        }
        Ok(())
    }

    /// Lifetime of tokens of the given type, in seconds
    pub fn ttl_for(&self, typ: TokenType) -> i64 {
        match typ {
            TokenType::Access => self.access_token_ttl_secs,
            TokenType::Refresh => self.refresh_token_ttl_secs,
        }
    }

    /// Store outage policy for tokens of the given type
    pub fn failure_policy_for(&self, typ: TokenType) -> FailurePolicy {
        match typ {
            TokenType::Access => self.access_failure_policy,
            TokenType::Refresh => self.refresh_failure_policy,
        }
    }

    /// Longest lifetime of any issued token
    pub fn max_token_ttl_secs(&self) -> i64 {
        self.access_token_ttl_secs.max(self.refresh_token_ttl_secs)
    }
}
