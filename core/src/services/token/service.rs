//! Main token service implementation

use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;

use jsonwebtoken::{crypto, Algorithm};
use rk_shared::config::FailurePolicy;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::entities::token::{
    revocation_key, session_revocation_key, RevocationEntry, RevocationReason, TokenClaims,
    TokenPair, TokenType,
};
use crate::domain::value_objects::{ClientContext, SubjectIdentity};
use crate::errors::{DomainError, DomainResult, StoreError, TokenError};
use crate::repositories::RevocationStore;
use crate::services::clock::Clock;
use crate::services::keyring::KeyRing;

use super::codec::{self, RawToken};
use super::config::TokenServiceConfig;

/// Which temporal claims a decode enforces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TimeCheck {
    Enforce,
    /// Logout accepts expired tokens
    Skip,
}

/// Service for issuing, validating and revoking signed tokens
pub struct TokenService<S: RevocationStore + ?Sized> {
    store: Arc<S>,
    key_ring: Arc<KeyRing>,
    clock: Arc<dyn Clock>,
    config: TokenServiceConfig,
}

impl<S: RevocationStore + ?Sized> TokenService<S> {
    /// Creates a new token service instance
    ///
    /// # Arguments
    ///
    /// * `store` - Shared revocation store
    /// * `key_ring` - Signing key ring; must use the configured algorithm
    /// * `clock` - Time source for every temporal check
    /// * `config` - Token service configuration
    ///
    /// # Returns
    ///
    /// * `Ok(TokenService)` - Service ready to issue
    /// * `Err(DomainError)` - Invalid configuration or a ring without an active key
    pub fn new(
        store: Arc<S>,
        key_ring: Arc<KeyRing>,
        clock: Arc<dyn Clock>,
        config: TokenServiceConfig,
    ) -> DomainResult<Self> {
        config.validate()?;

        if key_ring.algorithm() != config.algorithm {
            return Err(DomainError::Configuration {
                message: format!(
                    "key ring signs with {:?} but tokens are configured for {:?}",
                    key_ring.algorithm(),
                    config.algorithm
                ),
            });
        }

        if key_ring.config().max_token_ttl_secs < config.max_token_ttl_secs() {
            return Err(DomainError::Configuration {
                message: "key ring grace bound is shorter than the longest token TTL".to_string(),
            });
        }

        // Serving without a signer is a startup failure
        key_ring.current()?;

        Ok(Self {
            store,
            key_ring,
            clock,
            config,
        })
    }

    pub fn config(&self) -> &TokenServiceConfig {
        &self.config
    }

    pub fn key_ring(&self) -> &Arc<KeyRing> {
        &self.key_ring
    }

    pub(crate) fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Generates a new access/refresh pair for an already-authenticated subject
    ///
    /// Mints a session id when none is supplied. Never touches the
    /// revocation store.
    ///
    /// # Returns
    ///
    /// * `Ok(TokenPair)` - Both tokens, signed by the active key
    /// * `Err(TokenError)` - `NoActiveKey` or `TokenGenerationFailed`
    pub fn generate_pair(
        &self,
        identity: &SubjectIdentity,
        session_id: Option<&str>,
        client: Option<&ClientContext>,
    ) -> Result<TokenPair, TokenError> {
        let key = self.key_ring.current()?;
        let now = self.clock.timestamp();
        let session_id = session_id
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let client = client.cloned().unwrap_or_default();

        let access = self.build_claims(identity, &session_id, &client, &key.key_id, TokenType::Access, now);
        let refresh = self.build_claims(identity, &session_id, &client, &key.key_id, TokenType::Refresh, now);

        let pair = TokenPair {
            access_token: codec::sign(&access, &key)?,
            refresh_token: codec::sign(&refresh, &key)?,
            expires_in: self.config.access_token_ttl_secs,
            refresh_expires_in: self.config.refresh_token_ttl_secs,
            session_id,
        };

        debug!(
            sub = %identity.subject,
            session_id = %pair.session_id,
            key_id = %key.key_id,
            access_jti = %access.jti,
            refresh_jti = %refresh.jti,
            "Token pair issued"
        );

        Ok(pair)
    }

    fn build_claims(
        &self,
        identity: &SubjectIdentity,
        session_id: &str,
        client: &ClientContext,
        key_id: &str,
        typ: TokenType,
        now: i64,
    ) -> TokenClaims {
        TokenClaims {
            jti: Uuid::new_v4().to_string(),
            sub: identity.subject.clone(),
            typ,
            iat: now,
            exp: now + self.config.ttl_for(typ),
            nbf: now,
            iss: self.config.issuer.clone(),
            aud: self.config.audience.clone(),
            org_id: identity.org_id.clone(),
            roles: identity.roles.clone(),
            permissions: identity.permissions.clone(),
            session_id: session_id.to_string(),
            key_id: key_id.to_string(),
            ip: client.ip.clone(),
            user_agent: client.user_agent.clone(),
        }
    }

    /// Validates a token and returns its claims
    ///
    /// Checks run in a fixed order so the most specific reason is
    /// reported: structure, algorithm, key, signature, time window,
    /// issuer/audience/type, then revocation.
    pub async fn validate(
        &self,
        token: &str,
        expected: Option<TokenType>,
    ) -> Result<TokenClaims, TokenError> {
        let result = self.validate_inner(token, expected).await;

        if let Err(err) = &result {
            if err.is_security_event() {
                warn!(target: "security", kind = %err.kind(), "Token rejected");
            } else {
                debug!(kind = %err.kind(), "Token rejected");
            }
        }

        result
    }

    async fn validate_inner(
        &self,
        token: &str,
        expected: Option<TokenType>,
    ) -> Result<TokenClaims, TokenError> {
        let claims = self.decode_verified(token, expected, TimeCheck::Enforce)?;

        match self.check_revoked(&claims).await {
            Ok(false) => Ok(claims),
            Ok(true) => Err(TokenError::TokenRevoked),
            Err(e) => self.apply_failure_policy(claims, e),
        }
    }

    fn apply_failure_policy(
        &self,
        claims: TokenClaims,
        err: StoreError,
    ) -> Result<TokenClaims, TokenError> {
        match self.config.failure_policy_for(claims.typ) {
            FailurePolicy::FailClosed => {
                warn!(jti = %claims.jti, typ = %claims.typ, error = %err, "Revocation check failed, rejecting token");
                Err(TokenError::RevocationStoreUnavailable)
            }
            FailurePolicy::FailOpen => {
                warn!(
                    target: "security",
                    jti = %claims.jti,
                    typ = %claims.typ,
                    error = %err,
                    "Revocation check failed, accepting token under fail-open policy"
                );
                Ok(claims)
            }
        }
    }

    /// Every check except revocation
    pub(crate) fn decode_verified(
        &self,
        token: &str,
        expected: Option<TokenType>,
        time: TimeCheck,
    ) -> Result<TokenClaims, TokenError> {
        let raw = RawToken::parse(token)?;

        // Decided on the header alone: no key is touched for a foreign alg
        match Algorithm::from_str(&raw.header.alg) {
            Ok(alg) if alg == self.config.algorithm => {}
            _ => {
                return Err(TokenError::AlgorithmMismatch {
                    found: raw.header.alg.clone(),
                })
            }
        }

        let claims = raw.claims()?;
        let key_id = raw
            .header
            .kid
            .as_deref()
            .ok_or_else(|| TokenError::malformed("missing kid header"))?;

        let key = self.key_ring.lookup(key_id)?;

        let verified = crypto::verify(
            raw.signature,
            raw.signing_input.as_bytes(),
            key.decoding_key(),
            self.config.algorithm,
        )
        .unwrap_or(false);
        if !verified {
            return Err(TokenError::SignatureInvalid);
        }

        if claims.key_id != key_id {
            return Err(TokenError::malformed("key_id claim does not match kid header"));
        }

        if time == TimeCheck::Enforce {
            let now = self.clock.timestamp();
            if claims.is_expired_at(now) {
                return Err(TokenError::TokenExpired);
            }
            if now < claims.nbf {
                return Err(TokenError::TokenNotYetValid);
            }
        }

        if claims.iss != self.config.issuer {
            return Err(TokenError::IssuerMismatch);
        }
        if claims.aud != self.config.audience {
            return Err(TokenError::AudienceMismatch);
        }
        if let Some(expected) = expected {
            if claims.typ != expected {
                return Err(TokenError::TypeMismatch {
                    expected: expected.to_string(),
                    found: claims.typ.to_string(),
                });
            }
        }

        Ok(claims)
    }

    /// Whether the token or its session family has been revoked
    async fn check_revoked(&self, claims: &TokenClaims) -> Result<bool, StoreError> {
        if self.store_exists(&revocation_key(&claims.jti)).await? {
            return Ok(true);
        }
        self.store_exists(&session_revocation_key(&claims.session_id)).await
    }

    /// Revokes one token id until `exp`. A no-op for an already expired token.
    pub async fn revoke(
        &self,
        jti: &str,
        exp: i64,
        reason: &RevocationReason,
    ) -> Result<(), TokenError> {
        self.revoke_entry(&RevocationEntry::new(jti, reason.clone(), exp))
            .await
    }

    /// Writes a revocation entry that expires together with its token
    pub async fn revoke_entry(&self, entry: &RevocationEntry) -> Result<(), TokenError> {
        let Some(ttl) = entry.ttl_secs(self.clock.timestamp()) else {
            debug!(jti = %entry.jti, "Token already expired, nothing to revoke");
            return Ok(());
        };

        self.store_put(&entry.storage_key(), entry.reason.as_str(), ttl)
            .await
            .map_err(|e| {
                warn!(jti = %entry.jti, error = %e, "Failed to write revocation entry");
                TokenError::RevocationStoreUnavailable
            })?;

        debug!(jti = %entry.jti, reason = %entry.reason, ttl, "Token revoked");
        Ok(())
    }

    /// Revokes every token of a session family.
    ///
    /// One entry covers the family. The store keeps no record of the
    /// family's members, so the entry lives for the longest token TTL: a
    /// member minted at this instant carries `exp = now + max TTL`. The
    /// entry can therefore outlive the family's last token by up to that
    /// TTL. Tokens later minted into the same `session_id` through
    /// [`TokenService::generate_pair`] are rejected until it lapses.
    pub async fn revoke_session(
        &self,
        session_id: &str,
        reason: &RevocationReason,
    ) -> Result<(), TokenError> {
        let ttl = self.config.max_token_ttl_secs().max(1) as u64;

        self.store_put(&session_revocation_key(session_id), reason.as_str(), ttl)
            .await
            .map_err(|e| {
                warn!(session_id = %session_id, error = %e, "Failed to write session revocation entry");
                TokenError::RevocationStoreUnavailable
            })?;

        debug!(session_id = %session_id, reason = %reason, "Session family revoked");
        Ok(())
    }

    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        match tokio::time::timeout(self.config.store_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout),
        }
    }

    /// Bounded read, retried once on a transient failure
    pub(crate) async fn store_exists(&self, key: &str) -> Result<bool, StoreError> {
        match self.bounded(self.store.exists(key)).await {
            Err(e) if e.is_transient() => {
                debug!(key = %key, error = %e, "Revocation store read failed, retrying once");
                self.bounded(self.store.exists(key)).await
            }
            result => result,
        }
    }

    /// Bounded write, never retried
    pub(crate) async fn store_put(&self, key: &str, value: &str, ttl: u64) -> Result<(), StoreError> {
        self.bounded(self.store.put(key, value, ttl)).await
    }

    /// Bounded set-if-absent, never retried
    pub(crate) async fn store_set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: u64,
    ) -> Result<bool, StoreError> {
        self.bounded(self.store.set_if_absent(key, value, ttl)).await
    }
}
