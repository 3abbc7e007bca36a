//! Signing key pair entity and its lifecycle states.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey};
use rand::RngCore;
use serde::{Deserialize, Serialize};

/// Lifecycle state of a key pair: `Active -> Retiring -> Expired`, never back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KeyStatus {
    /// Current signer
    Active,
    /// Verification only, until `retire_at`
    Retiring,
    /// Material discarded
    Expired,
}

/// Signing and verification halves of one asymmetric key
#[derive(Clone)]
pub struct KeyMaterial {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    /// Raw public key bytes, published through [`PublicKeyInfo`]
    public_key: Vec<u8>,
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("public_key", &URL_SAFE_NO_PAD.encode(&self.public_key))
            .finish_non_exhaustive()
    }
}

impl KeyMaterial {
    pub fn new(encoding_key: EncodingKey, decoding_key: DecodingKey, public_key: Vec<u8>) -> Self {
        Self {
            encoding_key,
            decoding_key,
            public_key,
        }
    }
}

/// A signing key pair tracked by the key ring
#[derive(Clone)]
pub struct KeyPair {
    /// Opaque identifier, written to the `kid` header of every token it signs
    pub key_id: String,
    pub algorithm: Algorithm,
    pub created_at: DateTime<Utc>,
    /// Set when the pair leaves the active state
    pub retire_at: Option<DateTime<Utc>>,
    pub status: KeyStatus,
    material: KeyMaterial,
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("key_id", &self.key_id)
            .field("algorithm", &self.algorithm)
            .field("created_at", &self.created_at)
            .field("retire_at", &self.retire_at)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

impl KeyPair {
    /// Creates a new active key pair
    pub fn new_active(
        key_id: String,
        algorithm: Algorithm,
        material: KeyMaterial,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            key_id,
            algorithm,
            created_at,
            retire_at: None,
            status: KeyStatus::Active,
            material,
        }
    }

    /// Copy of this pair moved to the retiring state
    pub fn retiring(&self, retire_at: DateTime<Utc>) -> Self {
        Self {
            retire_at: Some(retire_at),
            status: KeyStatus::Retiring,
            ..self.clone()
        }
    }

    /// Whether the pair may still verify tokens at `now`
    pub fn is_usable_at(&self, now: DateTime<Utc>) -> bool {
        match self.status {
            KeyStatus::Active => true,
            KeyStatus::Retiring => self.retire_at.map_or(false, |at| now < at),
            KeyStatus::Expired => false,
        }
    }

    /// Whether the sweep should purge this pair at `now`
    pub fn is_due_for_expiry(&self, now: DateTime<Utc>) -> bool {
        self.status == KeyStatus::Retiring && self.retire_at.map_or(false, |at| at <= now)
    }

    /// Private half, for signing
    pub fn encoding_key(&self) -> &EncodingKey {
        &self.material.encoding_key
    }

    /// Public half, for verification
    pub fn decoding_key(&self) -> &DecodingKey {
        &self.material.decoding_key
    }

    /// Public key encoded as unpadded base64url
    pub fn public_key_base64(&self) -> String {
        URL_SAFE_NO_PAD.encode(&self.material.public_key)
    }

    /// Publishable description of this pair
    pub fn info(&self) -> PublicKeyInfo {
        PublicKeyInfo {
            key_id: self.key_id.clone(),
            algorithm: self.algorithm,
            public_key: Some(self.public_key_base64()),
            status: self.status,
            created_at: self.created_at,
            retire_at: self.retire_at,
        }
    }

    /// Record left behind once the pair is purged; carries no key material
    pub fn expired_info(&self) -> PublicKeyInfo {
        PublicKeyInfo {
            key_id: self.key_id.clone(),
            algorithm: self.algorithm,
            public_key: None,
            status: KeyStatus::Expired,
            created_at: self.created_at,
            retire_at: self.retire_at,
        }
    }
}

/// Public view of a key pair (JWKS-style publication, admin listings)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKeyInfo {
    pub key_id: String,
    pub algorithm: Algorithm,
    /// Unpadded base64url public key, absent once expired
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
    pub status: KeyStatus,
    pub created_at: DateTime<Utc>,
    pub retire_at: Option<DateTime<Utc>>,
}

/// Generates a key id of the form `k-{yyyymmdd}-{8 hex chars}`
pub fn generate_key_id(created_at: DateTime<Utc>) -> String {
    let mut suffix = [0u8; 4];
    rand::thread_rng().fill_bytes(&mut suffix);
    format!("k-{}-{}", created_at.format("%Y%m%d"), hex::encode(suffix))
}
