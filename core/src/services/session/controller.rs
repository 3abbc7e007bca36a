//! Refresh and logout protocols on top of the token service

use std::sync::Arc;

use chrono::Duration;
use rk_shared::config::{FailurePolicy, ReusePolicy};
use tracing::{debug, error, info, warn};

use crate::domain::entities::key_pair::KeyPair;
use crate::domain::entities::token::{
    refresh_consumed_key, RevocationEntry, RevocationReason, TokenClaims, TokenPair, TokenType,
};
use crate::domain::value_objects::ClientContext;
use crate::errors::{DomainResult, TokenError};
use crate::repositories::RevocationStore;
use crate::services::token::{TimeCheck, TokenService};

use super::config::RefreshControllerConfig;

/// Stored under `refresh-used:{jti}`
const CONSUMED_MARKER: &str = "1";

/// Single-use refresh, reuse detection and logout
pub struct SessionRefreshController<S: RevocationStore + ?Sized> {
    tokens: Arc<TokenService<S>>,
    config: RefreshControllerConfig,
}

impl<S: RevocationStore + ?Sized> SessionRefreshController<S> {
    pub fn new(tokens: Arc<TokenService<S>>, config: RefreshControllerConfig) -> Self {
        Self { tokens, config }
    }

    pub fn token_service(&self) -> &Arc<TokenService<S>> {
        &self.tokens
    }

    /// Exchanges a refresh token for a new pair in the same session
    ///
    /// The refresh token is consumed: presenting it again is treated as
    /// theft and answered per the reuse policy.
    ///
    /// # Arguments
    ///
    /// * `refresh_token` - The refresh token to consume
    /// * `client` - Context for the new pair; the old token's when absent
    ///
    /// # Returns
    ///
    /// * `Ok(TokenPair)` - New pair sharing the old session id
    /// * `Err(TokenError)` - Validation failure, `RefreshReuseDetected`,
    ///   or `RevocationStoreUnavailable` under the fail-closed policy
    pub async fn refresh(
        &self,
        refresh_token: &str,
        client: Option<&ClientContext>,
    ) -> Result<TokenPair, TokenError> {
        let claims = match self.tokens.validate(refresh_token, Some(TokenType::Refresh)).await {
            Ok(claims) => claims,
            Err(TokenError::TokenRevoked) => return Err(self.classify_revoked(refresh_token).await),
            Err(e) => return Err(e),
        };

        self.consume(&claims).await?;

        let client = client.cloned().unwrap_or_else(|| claims.client_context());
        let pair = self
            .tokens
            .generate_pair(&claims.identity(), Some(&claims.session_id), Some(&client))?;

        if let Err(e) = self
            .tokens
            .revoke_entry(&RevocationEntry::for_claims(&claims, RevocationReason::RefreshConsumed))
            .await
        {
            // The consumed marker alone still blocks a second exchange
            warn!(jti = %claims.jti, error = %e, "Failed to revoke consumed refresh token");
        }

        info!(sub = %claims.sub, session_id = %claims.session_id, "Session refreshed");
        Ok(pair)
    }

    /// Marks the refresh token as consumed; fails on a second use
    async fn consume(&self, claims: &TokenClaims) -> Result<(), TokenError> {
        let now = self.tokens.clock().timestamp();
        let ttl = claims.remaining_ttl_secs(now).max(1) as u64;

        match self
            .tokens
            .store_set_if_absent(&refresh_consumed_key(&claims.jti), CONSUMED_MARKER, ttl)
            .await
        {
            Ok(true) => Ok(()),
            Ok(false) => {
                self.handle_reuse(claims).await;
                Err(TokenError::RefreshReuseDetected)
            }
            Err(e) => match self.tokens.config().refresh_failure_policy {
                FailurePolicy::FailClosed => {
                    warn!(jti = %claims.jti, error = %e, "Could not mark refresh token consumed, rejecting");
                    Err(TokenError::RevocationStoreUnavailable)
                }
                FailurePolicy::FailOpen => {
                    warn!(
                        target: "security",
                        jti = %claims.jti,
                        error = %e,
                        "Could not mark refresh token consumed, refreshing under fail-open policy"
                    );
                    Ok(())
                }
            },
        }
    }

    /// A revoked refresh token that was consumed earlier is a replay
    async fn classify_revoked(&self, refresh_token: &str) -> TokenError {
        let claims = match self.tokens.decode_verified(refresh_token, Some(TokenType::Refresh), TimeCheck::Enforce) {
            Ok(claims) => claims,
            Err(e) => return e,
        };

        match self.tokens.store_exists(&refresh_consumed_key(&claims.jti)).await {
            Ok(true) => {
                self.handle_reuse(&claims).await;
                TokenError::RefreshReuseDetected
            }
            Ok(false) => TokenError::TokenRevoked,
            Err(e) => {
                debug!(jti = %claims.jti, error = %e, "Could not read consumed marker");
                TokenError::TokenRevoked
            }
        }
    }

    async fn handle_reuse(&self, claims: &TokenClaims) {
        warn!(
            target: "security",
            sub = %claims.sub,
            session_id = %claims.session_id,
            jti = %claims.jti,
            policy = ?self.config.reuse_policy,
            "Refresh token reuse detected"
        );

        let reason = RevocationReason::ReuseDetected;
        let result = match self.config.reuse_policy {
            ReusePolicy::RevokeFamily => self.tokens.revoke_session(&claims.session_id, &reason).await,
            ReusePolicy::RevokeTokenOnly => {
                self.tokens
                    .revoke_entry(&RevocationEntry::for_claims(claims, reason.clone()))
                    .await
            }
        };

        if let Err(e) = result {
            error!(session_id = %claims.session_id, error = %e, "Failed to revoke after refresh token reuse");
        }
    }

    /// Revokes a token, and with `everywhere` its whole session family
    ///
    /// Expired tokens are accepted so a client can always log out. A token
    /// whose signing key is gone can no longer be verified and is already
    /// unusable, so only its own revocation is skipped; family revocation
    /// still needs a verifiable token and reports `KeyNotFound`.
    pub async fn revoke(
        &self,
        token: &str,
        reason: RevocationReason,
        everywhere: bool,
    ) -> Result<(), TokenError> {
        let claims = match self.tokens.decode_verified(token, None, TimeCheck::Skip) {
            Ok(claims) => claims,
            Err(TokenError::KeyNotFound { key_id }) if !everywhere => {
                debug!(key_id = %key_id, "Signing key gone, token already unusable");
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        self.tokens
            .revoke_entry(&RevocationEntry::for_claims(&claims, reason.clone()))
            .await?;
        if everywhere {
            self.tokens.revoke_session(&claims.session_id, &reason).await?;
        }

        info!(
            sub = %claims.sub,
            session_id = %claims.session_id,
            reason = %reason,
            everywhere,
            "Token revoked"
        );
        Ok(())
    }

    pub async fn logout(&self, token: &str) -> Result<(), TokenError> {
        self.revoke(token, RevocationReason::Logout, false).await
    }

    pub async fn logout_everywhere(&self, token: &str) -> Result<(), TokenError> {
        self.revoke(token, RevocationReason::Logout, true).await
    }

    /// Rotates the signing key; `None` uses the configured grace period
    pub fn rotate_keys(&self, grace: Option<Duration>) -> DomainResult<Arc<KeyPair>> {
        let ring = self.tokens.key_ring();
        match grace {
            Some(grace) => ring.rotate(grace),
            None => ring.rotate_default(),
        }
    }

    /// Rotates without grace, invalidating every token of the previous key
    pub fn emergency_rotate_keys(&self) -> DomainResult<Arc<KeyPair>> {
        self.tokens.key_ring().emergency_rotate()
    }
}
