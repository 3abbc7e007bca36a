//! Token, key rotation and revocation configuration

use serde::{Deserialize, Serialize};

/// Seconds in one day
const DAY_SECS: i64 = 86_400;

/// Token issuance configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TokenConfig {
    /// `iss` claim written into and required from every token
    pub issuer: String,

    /// `aud` claim written into and required from every token
    pub audience: String,

    /// Access token lifetime in seconds
    #[serde(default = "default_access_ttl")]
    pub access_token_ttl_secs: i64,

    /// Refresh token lifetime in seconds
    #[serde(default = "default_refresh_ttl")]
    pub refresh_token_ttl_secs: i64,

    /// Asymmetric signing algorithm (JWS `alg` header value)
    #[serde(default = "default_algorithm")]
    pub algorithm: String,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            issuer: String::from("rotakey"),
            audience: String::from("rotakey-api"),
            access_token_ttl_secs: default_access_ttl(),
            refresh_token_ttl_secs: default_refresh_ttl(),
            algorithm: default_algorithm(),
        }
    }
}

impl TokenConfig {
    /// Create from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            issuer: std::env::var("RK_TOKEN_ISSUER").unwrap_or(defaults.issuer),
            audience: std::env::var("RK_TOKEN_AUDIENCE").unwrap_or(defaults.audience),
            access_token_ttl_secs: env_parse("RK_ACCESS_TOKEN_TTL_SECS", defaults.access_token_ttl_secs),
            refresh_token_ttl_secs: env_parse("RK_REFRESH_TOKEN_TTL_SECS", defaults.refresh_token_ttl_secs),
            algorithm: std::env::var("RK_TOKEN_ALGORITHM").unwrap_or(defaults.algorithm),
        }
    }

    /// Set access token lifetime in minutes
    pub fn with_access_ttl_minutes(mut self, minutes: i64) -> Self {
        self.access_token_ttl_secs = minutes * 60;
        self
    }

    /// Set refresh token lifetime in days
    pub fn with_refresh_ttl_days(mut self, days: i64) -> Self {
        self.refresh_token_ttl_secs = days * DAY_SECS;
        self
    }

    /// Longest lifetime of any token this configuration issues
    pub fn max_token_ttl_secs(&self) -> i64 {
        self.access_token_ttl_secs.max(self.refresh_token_ttl_secs)
    }
}

/// Signing key rotation schedule
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct KeyRotationConfig {
    /// Enable the periodic rotation task
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Age of the active key after which it is rotated, in seconds
    #[serde(default = "default_rotation_interval")]
    pub rotation_interval_secs: i64,

    /// Verification-only window for the previous key, in seconds.
    /// `None` means "use the longest configured token TTL".
    #[serde(default)]
    pub grace_period_secs: Option<i64>,

    /// How often the rotation task wakes up to rotate and sweep, in seconds
    #[serde(default = "default_check_interval")]
    pub check_interval_secs: u64,

    /// PKCS#8 PEM file holding the first signing key. When unset a fresh key
    /// is generated at startup.
    #[serde(default)]
    pub initial_key_path: Option<String>,
}

impl Default for KeyRotationConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            rotation_interval_secs: default_rotation_interval(),
            grace_period_secs: None,
            check_interval_secs: default_check_interval(),
            initial_key_path: None,
        }
    }
}

impl KeyRotationConfig {
    /// Create from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            enabled: env_parse("RK_KEY_ROTATION_ENABLED", defaults.enabled),
            rotation_interval_secs: env_parse("RK_KEY_ROTATION_INTERVAL_SECS", defaults.rotation_interval_secs),
            grace_period_secs: std::env::var("RK_KEY_GRACE_PERIOD_SECS")
                .ok()
                .and_then(|v| v.parse().ok()),
            check_interval_secs: env_parse("RK_KEY_ROTATION_CHECK_SECS", defaults.check_interval_secs),
            initial_key_path: std::env::var("RK_SIGNING_KEY_PATH").ok().filter(|p| !p.is_empty()),
        }
    }

    /// Grace period to use for scheduled rotations
    pub fn effective_grace_secs(&self, token: &TokenConfig) -> i64 {
        self.grace_period_secs
            .unwrap_or_else(|| token.max_token_ttl_secs())
    }
}

/// Behaviour when the revocation store cannot be reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Reject the credential
    #[default]
    FailClosed,
    /// Accept the credential tentatively and log a warning
    FailOpen,
}

impl std::str::FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "fail_closed" | "closed" => Ok(FailurePolicy::FailClosed),
            "fail_open" | "open" => Ok(FailurePolicy::FailOpen),
            _ => Err(format!("Invalid failure policy: {}", s)),
        }
    }
}

/// What to revoke when a consumed refresh token is presented again
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReusePolicy {
    /// Revoke every token sharing the session id
    #[default]
    RevokeFamily,
    /// Revoke only the reused refresh token
    RevokeTokenOnly,
}

impl std::str::FromStr for ReusePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "revoke_family" | "family" => Ok(ReusePolicy::RevokeFamily),
            "revoke_token_only" | "token" => Ok(ReusePolicy::RevokeTokenOnly),
            _ => Err(format!("Invalid reuse policy: {}", s)),
        }
    }
}

/// Revocation store usage configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RevocationConfig {
    /// Upper bound for a single store call, in milliseconds
    #[serde(default = "default_store_timeout")]
    pub store_timeout_ms: u64,

    /// Policy for access token validation during a store outage
    #[serde(default)]
    pub access_failure_policy: FailurePolicy,

    /// Policy for refresh during a store outage
    #[serde(default)]
    pub refresh_failure_policy: FailurePolicy,

    /// Refresh token reuse response
    #[serde(default)]
    pub reuse_policy: ReusePolicy,
}

impl Default for RevocationConfig {
    fn default() -> Self {
        Self {
            store_timeout_ms: default_store_timeout(),
            access_failure_policy: FailurePolicy::FailClosed,
            refresh_failure_policy: FailurePolicy::FailClosed,
            reuse_policy: ReusePolicy::RevokeFamily,
        }
    }
}

impl RevocationConfig {
    /// Create from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            store_timeout_ms: env_parse("RK_STORE_TIMEOUT_MS", defaults.store_timeout_ms),
            access_failure_policy: env_parse("RK_ACCESS_FAILURE_POLICY", defaults.access_failure_policy),
            refresh_failure_policy: env_parse("RK_REFRESH_FAILURE_POLICY", defaults.refresh_failure_policy),
            reuse_policy: env_parse("RK_REUSE_POLICY", defaults.reuse_policy),
        }
    }
}

/// Complete credential configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AuthConfig {
    /// Token issuance
    #[serde(default)]
    pub token: TokenConfig,

    /// Key rotation schedule
    #[serde(default)]
    pub rotation: KeyRotationConfig,

    /// Revocation store usage
    #[serde(default)]
    pub revocation: RevocationConfig,
}

impl AuthConfig {
    /// Create from environment variables
    pub fn from_env() -> Self {
        Self {
            token: TokenConfig::from_env(),
            rotation: KeyRotationConfig::from_env(),
            revocation: RevocationConfig::from_env(),
        }
    }
}

/// Read and parse an environment variable, falling back to `default`
pub(crate) fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn default_access_ttl() -> i64 {
    900 // 15 minutes
}

fn default_refresh_ttl() -> i64 {
    30 * DAY_SECS
}

fn default_algorithm() -> String {
    String::from("EdDSA")
}

fn default_enabled() -> bool {
    true
}

fn default_rotation_interval() -> i64 {
    90 * DAY_SECS
}

fn default_check_interval() -> u64 {
    3600
}

fn default_store_timeout() -> u64 {
    250
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_config_default() {
        let config = TokenConfig::default();
        assert_eq!(config.access_token_ttl_secs, 900);
        assert_eq!(config.refresh_token_ttl_secs, 2_592_000);
        assert_eq!(config.algorithm, "EdDSA");
        assert_eq!(config.max_token_ttl_secs(), 2_592_000);
    }

    #[test]
    fn test_token_config_builder() {
        let config = TokenConfig::default()
            .with_access_ttl_minutes(5)
            .with_refresh_ttl_days(1);

        assert_eq!(config.access_token_ttl_secs, 300);
        assert_eq!(config.refresh_token_ttl_secs, 86_400);
    }

    #[test]
    fn test_grace_defaults_to_longest_ttl() {
        let token = TokenConfig::default();
        let mut rotation = KeyRotationConfig::default();
        assert_eq!(rotation.effective_grace_secs(&token), token.refresh_token_ttl_secs);

        rotation.grace_period_secs = Some(42);
        assert_eq!(rotation.effective_grace_secs(&token), 42);
    }

    #[test]
    fn test_revocation_defaults_fail_closed() {
        let config = RevocationConfig::default();
        assert_eq!(config.access_failure_policy, FailurePolicy::FailClosed);
        assert_eq!(config.refresh_failure_policy, FailurePolicy::FailClosed);
        assert_eq!(config.reuse_policy, ReusePolicy::RevokeFamily);
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!("fail-open".parse::<FailurePolicy>().unwrap(), FailurePolicy::FailOpen);
        assert_eq!("closed".parse::<FailurePolicy>().unwrap(), FailurePolicy::FailClosed);
        assert!("maybe".parse::<FailurePolicy>().is_err());
        assert_eq!("revoke_token_only".parse::<ReusePolicy>().unwrap(), ReusePolicy::RevokeTokenOnly);
    }

    #[test]
    fn test_auth_config_deserializes_with_defaults() {
        let json = r#"{
            "token": { "issuer": "svc", "audience": "svc-api" },
            "revocation": { "access_failure_policy": "fail_open" }
        }"#;
        let config: AuthConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.token.issuer, "svc");
        assert_eq!(config.token.access_token_ttl_secs, 900);
        assert_eq!(config.revocation.access_failure_policy, FailurePolicy::FailOpen);
        assert_eq!(config.revocation.refresh_failure_policy, FailurePolicy::FailClosed);
        assert!(config.rotation.enabled);
    }
}
