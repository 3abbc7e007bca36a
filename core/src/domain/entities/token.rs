//! Token entities for signed session credentials.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{ClientContext, SubjectIdentity};

/// Default access token lifetime (15 minutes)
pub const DEFAULT_ACCESS_TOKEN_TTL_SECS: i64 = 900;

/// Default refresh token lifetime (30 days)
pub const DEFAULT_REFRESH_TOKEN_TTL_SECS: i64 = 2_592_000;

/// Store key prefix for per-token revocation entries
pub const REVOCATION_KEY_PREFIX: &str = "revocation";

/// Store key prefix for session family revocation entries
pub const SESSION_REVOCATION_KEY_PREFIX: &str = "revocation:session";

/// Store key prefix for single-use refresh markers
pub const REFRESH_CONSUMED_KEY_PREFIX: &str = "refresh-used";

/// Store key of the revocation entry for a token id
pub fn revocation_key(jti: &str) -> String {
    format!("{}:{}", REVOCATION_KEY_PREFIX, jti)
}

/// Store key of the revocation entry for a whole session family
pub fn session_revocation_key(session_id: &str) -> String {
    format!("{}:{}", SESSION_REVOCATION_KEY_PREFIX, session_id)
}

/// Store key marking a refresh token id as consumed
pub fn refresh_consumed_key(jti: &str) -> String {
    format!("{}:{}", REFRESH_CONSUMED_KEY_PREFIX, jti)
}

/// Token type carried in the `typ` claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

impl TokenType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Access => "access",
            TokenType::Refresh => "refresh",
        }
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Claims structure for the token payload. Immutable once issued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Unique token id, the revocation store key
    pub jti: String,

    /// Subject (user id)
    pub sub: String,

    /// Access or refresh
    pub typ: TokenType,

    /// Issued at (unix seconds)
    pub iat: i64,

    /// Expiration (unix seconds)
    pub exp: i64,

    /// Not before (unix seconds)
    pub nbf: i64,

    /// Issuer
    pub iss: String,

    /// Audience
    pub aud: String,

    /// Tenant the subject acts for
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org_id: Option<String>,

    #[serde(default)]
    pub roles: BTreeSet<String>,

    #[serde(default)]
    pub permissions: BTreeSet<String>,

    /// Session family shared by every token minted from one sign-in
    pub session_id: String,

    /// Id of the key that signed this token
    pub key_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl TokenClaims {
    /// Whether the token is expired at `now` (unix seconds)
    pub fn is_expired_at(&self, now: i64) -> bool {
        now >= self.exp
    }

    /// Whether the token is inside its `nbf..exp` window at `now`
    pub fn is_active_at(&self, now: i64) -> bool {
        now >= self.nbf && now < self.exp
    }

    /// Seconds of validity left at `now`, zero once expired
    pub fn remaining_ttl_secs(&self, now: i64) -> i64 {
        (self.exp - now).max(0)
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.contains(permission)
    }

    /// The identity this token was minted for
    pub fn identity(&self) -> SubjectIdentity {
        SubjectIdentity {
            subject: self.sub.clone(),
            org_id: self.org_id.clone(),
            roles: self.roles.clone(),
            permissions: self.permissions.clone(),
        }
    }

    /// Client context recorded at issuance
    pub fn client_context(&self) -> ClientContext {
        ClientContext {
            ip: self.ip.clone(),
            user_agent: self.user_agent.clone(),
        }
    }
}

/// Token pair returned to the client. Never stored server-side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    /// Signed access token
    pub access_token: String,

    /// Signed refresh token
    pub refresh_token: String,

    /// Access token lifetime in seconds
    pub expires_in: i64,

    /// Refresh token lifetime in seconds
    pub refresh_expires_in: i64,

    /// Session family both tokens belong to
    pub session_id: String,
}

/// Why a token id was written to the revocation store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevocationReason {
    /// Explicit logout
    Logout,
    /// Refresh token exchanged for a new pair
    RefreshConsumed,
    /// Consumed refresh token presented again
    ReuseDetected,
    /// Operator action
    Administrative,
    /// Caller supplied reason
    Other(String),
}

impl RevocationReason {
    pub fn as_str(&self) -> &str {
        match self {
            RevocationReason::Logout => "logout",
            RevocationReason::RefreshConsumed => "refresh_consumed",
            RevocationReason::ReuseDetected => "reuse_detected",
            RevocationReason::Administrative => "administrative",
            RevocationReason::Other(reason) => reason,
        }
    }
}

impl fmt::Display for RevocationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for RevocationReason {
    fn from(value: &str) -> Self {
        match value {
            "logout" => RevocationReason::Logout,
            "refresh_consumed" => RevocationReason::RefreshConsumed,
            "reuse_detected" => RevocationReason::ReuseDetected,
            "administrative" => RevocationReason::Administrative,
            other => RevocationReason::Other(other.to_string()),
        }
    }
}

/// A revocation store entry. It lives exactly as long as the token it
/// revokes, so the store only ever holds currently-valid-but-revoked ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevocationEntry {
    pub jti: String,
    pub reason: RevocationReason,
    /// Equal to the token's own `exp`, never later
    pub expires_at: i64,
}

impl RevocationEntry {
    pub fn new(jti: impl Into<String>, reason: RevocationReason, expires_at: i64) -> Self {
        Self {
            jti: jti.into(),
            reason,
            expires_at,
        }
    }

    /// Entry for the given claims
    pub fn for_claims(claims: &TokenClaims, reason: RevocationReason) -> Self {
        Self {
            jti: claims.jti.clone(),
            reason,
            expires_at: claims.exp,
        }
    }

    /// Store key (`revocation:{jti}`)
    pub fn storage_key(&self) -> String {
        revocation_key(&self.jti)
    }

    /// Remaining TTL at `now`; `None` when the token has already expired
    /// and writing the entry would be pointless.
    pub fn ttl_secs(&self, now: i64) -> Option<u64> {
        let remaining = self.expires_at - now;
        (remaining > 0).then_some(remaining as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_claims() -> TokenClaims {
        TokenClaims {
            jti: "jti-1".to_string(),
            sub: "user_1".to_string(),
            typ: TokenType::Access,
            iat: 1_000,
            exp: 1_900,
            nbf: 1_000,
            iss: "rotakey".to_string(),
            aud: "rotakey-api".to_string(),
            org_id: Some("org_A".to_string()),
            roles: ["user".to_string()].into_iter().collect(),
            permissions: ["orders:read".to_string()].into_iter().collect(),
            session_id: "sess-1".to_string(),
            key_id: "k-1".to_string(),
            ip: Some("10.0.0.1".to_string()),
            user_agent: None,
        }
    }

    #[test]
    fn test_temporal_helpers() {
        let claims = sample_claims();

        assert!(claims.is_active_at(1_000));
        assert!(claims.is_active_at(1_899));
        assert!(!claims.is_active_at(999));
        assert!(claims.is_expired_at(1_900));
        assert_eq!(claims.remaining_ttl_secs(1_500), 400);
        assert_eq!(claims.remaining_ttl_secs(5_000), 0);
    }

    #[test]
    fn test_role_and_permission_helpers() {
        let claims = sample_claims();

        assert!(claims.has_role("user"));
        assert!(!claims.has_role("admin"));
        assert!(claims.has_permission("orders:read"));
        assert_eq!(claims.identity().org_id.as_deref(), Some("org_A"));
        assert_eq!(claims.client_context().ip.as_deref(), Some("10.0.0.1"));
    }

    #[test]
    fn test_claims_wire_format() {
        let claims = sample_claims();
        let json = serde_json::to_value(&claims).unwrap();

        assert_eq!(json["typ"], "access");
        assert_eq!(json["roles"][0], "user");
        assert!(json.get("user_agent").is_none());

        let decoded: TokenClaims = serde_json::from_value(json).unwrap();
        assert_eq!(decoded, claims);
    }

    #[test]
    fn test_store_keys() {
        assert_eq!(revocation_key("abc"), "revocation:abc");
        assert_eq!(session_revocation_key("s1"), "revocation:session:s1");
        assert_eq!(refresh_consumed_key("abc"), "refresh-used:abc");
    }

    #[test]
    fn test_revocation_entry_ttl_is_bounded_by_token() {
        let entry = RevocationEntry::for_claims(&sample_claims(), RevocationReason::Logout);

        assert_eq!(entry.storage_key(), "revocation:jti-1");
        assert_eq!(entry.ttl_secs(1_000), Some(900));
        assert_eq!(entry.ttl_secs(1_899), Some(1));
        assert_eq!(entry.ttl_secs(1_900), None);
    }

    #[test]
    fn test_reason_round_trip() {
        for reason in [
            RevocationReason::Logout,
            RevocationReason::RefreshConsumed,
            RevocationReason::ReuseDetected,
            RevocationReason::Administrative,
            RevocationReason::Other("password_changed".into()),
        ] {
            assert_eq!(RevocationReason::from(reason.as_str()), reason);
        }
    }
}
