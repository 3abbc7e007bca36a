//! Unit tests for revocation store bounding, retry and failure policies

use std::time::Duration;

use rk_shared::config::FailurePolicy;

use crate::domain::entities::token::{RevocationReason, TokenType};
use crate::errors::{StoreError, TokenError};
use crate::services::fixtures::{identity, token_config, Fixture};
use crate::services::token::TokenServiceConfig;

fn fail_open() -> TokenServiceConfig {
    TokenServiceConfig {
        access_failure_policy: FailurePolicy::FailOpen,
        refresh_failure_policy: FailurePolicy::FailOpen,
        ..token_config()
    }
}

#[tokio::test]
async fn test_transient_read_failure_is_retried_once() {
    let fx = Fixture::new();
    let pair = fx.tokens.generate_pair(&identity(), None, None).unwrap();

    fx.store.fail_next_reads(1, StoreError::Unavailable("connection reset".into()));

    assert!(fx.tokens.validate(&pair.access_token, None).await.is_ok());
    // jti check (failed + retry) and session check
    assert_eq!(fx.store.exists_calls(), 3);
}

#[tokio::test]
async fn test_second_transient_failure_fails_closed() {
    let fx = Fixture::new();
    let pair = fx.tokens.generate_pair(&identity(), None, None).unwrap();

    fx.store.fail_next_reads(2, StoreError::Unavailable("connection reset".into()));

    assert_eq!(
        fx.tokens.validate(&pair.access_token, None).await,
        Err(TokenError::RevocationStoreUnavailable)
    );
    assert_eq!(fx.store.exists_calls(), 2);
}

#[tokio::test]
async fn test_backend_error_is_not_retried() {
    let fx = Fixture::new();
    let pair = fx.tokens.generate_pair(&identity(), None, None).unwrap();

    fx.store.fail_next_reads(1, StoreError::Backend("WRONGTYPE".into()));

    assert_eq!(
        fx.tokens.validate(&pair.access_token, None).await,
        Err(TokenError::RevocationStoreUnavailable)
    );
    assert_eq!(fx.store.exists_calls(), 1);
}

#[tokio::test]
async fn test_fail_open_accepts_during_outage() {
    let fx = Fixture::with_config(fail_open());
    let pair = fx.tokens.generate_pair(&identity(), None, None).unwrap();

    fx.store.fail_reads(StoreError::Unavailable("down".into()));

    let claims = fx.tokens.validate(&pair.access_token, None).await.unwrap();
    assert_eq!(claims.sub, "user_1");
}

#[tokio::test]
async fn test_fail_open_never_masks_earlier_failures() {
    let fx = Fixture::with_config(fail_open());
    let pair = fx.tokens.generate_pair(&identity(), None, None).unwrap();
    fx.store.fail_reads(StoreError::Unavailable("down".into()));

    fx.clock.advance_secs(10_000);
    assert_eq!(fx.tokens.validate(&pair.access_token, None).await, Err(TokenError::TokenExpired));
}

#[tokio::test]
async fn test_policy_follows_token_type() {
    let fx = Fixture::with_config(TokenServiceConfig {
        access_failure_policy: FailurePolicy::FailOpen,
        refresh_failure_policy: FailurePolicy::FailClosed,
        ..token_config()
    });
    let pair = fx.tokens.generate_pair(&identity(), None, None).unwrap();
    fx.store.fail_reads(StoreError::Timeout);

    assert!(fx.tokens.validate(&pair.access_token, Some(TokenType::Access)).await.is_ok());
    assert_eq!(
        fx.tokens.validate(&pair.refresh_token, Some(TokenType::Refresh)).await,
        Err(TokenError::RevocationStoreUnavailable)
    );
}

#[tokio::test(start_paused = true)]
async fn test_slow_store_is_bounded_by_timeout() {
    let fx = Fixture::with_config(TokenServiceConfig {
        store_timeout: Duration::from_millis(50),
        ..token_config()
    });
    let pair = fx.tokens.generate_pair(&identity(), None, None).unwrap();
    fx.store.set_delay(Duration::from_secs(5));

    let started = tokio::time::Instant::now();
    assert_eq!(
        fx.tokens.validate(&pair.access_token, None).await,
        Err(TokenError::RevocationStoreUnavailable)
    );

    // One timed-out attempt plus one retry
    assert_eq!(fx.store.exists_calls(), 2);
    assert!(started.elapsed() < Duration::from_secs(1));
}

#[tokio::test]
async fn test_revocation_write_failure_is_reported() {
    let fx = Fixture::new();
    fx.store.fail_writes(StoreError::Unavailable("down".into()));
    let reason = RevocationReason::Logout;

    assert_eq!(
        fx.tokens.revoke("jti-1", crate::services::fixtures::T0 + 60, &reason).await,
        Err(TokenError::RevocationStoreUnavailable)
    );
    assert_eq!(
        fx.tokens.revoke_session("sess-1", &reason).await,
        Err(TokenError::RevocationStoreUnavailable)
    );
    // Writes are never retried
    assert_eq!(fx.store.put_calls(), 2);
}
