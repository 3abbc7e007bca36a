//! Compact JWS encoding and the pre-verification header parse.
//!
//! Validation has to read `alg` and `kid` before any key material is
//! touched, so the header is decoded here by hand instead of through
//! `jsonwebtoken::decode`.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use jsonwebtoken::{encode, Header};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::error;

use crate::domain::entities::key_pair::KeyPair;
use crate::domain::entities::token::TokenClaims;
use crate::errors::TokenError;

/// JOSE header fields read before verification
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TokenHeader {
    pub alg: String,
    #[serde(default)]
    pub kid: Option<String>,
}

/// A token split into its segments, with the header decoded
#[derive(Debug)]
pub(crate) struct RawToken<'a> {
    pub header: TokenHeader,
    /// `header.payload`, the bytes the signature covers
    pub signing_input: &'a str,
    pub payload: &'a str,
    pub signature: &'a str,
}

impl<'a> RawToken<'a> {
    pub fn parse(token: &'a str) -> Result<Self, TokenError> {
        let mut segments = token.split('.');
        let (header, payload, signature) = match (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) {
            (Some(h), Some(p), Some(s), None) if !h.is_empty() && !p.is_empty() => (h, p, s),
            _ => return Err(TokenError::malformed("expected three segments")),
        };

        let signing_input = &token[..header.len() + 1 + payload.len()];

        Ok(Self {
            header: decode_segment(header, "header")?,
            signing_input,
            payload,
            signature,
        })
    }

    /// Decodes the claims segment. Says nothing about authenticity.
    pub fn claims(&self) -> Result<TokenClaims, TokenError> {
        decode_segment(self.payload, "payload")
    }
}

fn decode_segment<T: DeserializeOwned>(segment: &str, what: &str) -> Result<T, TokenError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| TokenError::malformed(format!("{} is not base64url", what)))?;
    serde_json::from_slice(&bytes).map_err(|_| TokenError::malformed(format!("{} is not valid JSON", what)))
}

/// Signs `claims` with `key`, stamping its id into the `kid` header
pub(crate) fn sign(claims: &TokenClaims, key: &KeyPair) -> Result<String, TokenError> {
    let mut header = Header::new(key.algorithm);
    header.kid = Some(key.key_id.clone());

    encode(&header, claims, key.encoding_key()).map_err(|e| {
        error!(key_id = %key.key_id, error = %e, "Failed to sign token");
        TokenError::TokenGenerationFailed
    })
}
