//! JSON Web Key parsing and RSA signing keys.
//!
//! The identity provider publishes a JWKS document that may mix signing and
//! encryption keys of several algorithms. Only RSA keys declared for RS256
//! signatures are kept; anything else is skipped. A kept key whose modulus or
//! exponent is not valid base64url aborts the whole parse, since a response
//! with a corrupt entry cannot be trusted.

use crate::errors::AuthError;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use ring::signature::{RsaPublicKeyComponents, RSA_PKCS1_2048_8192_SHA256};
use serde::Deserialize;
use std::collections::HashMap;

/// Required `kty` for a usable key.
pub const KEY_TYPE_RSA: &str = "RSA";

/// The one supported signature algorithm.
pub const ALGORITHM_RS256: &str = "RS256";

/// Required `use` for a usable key.
pub const KEY_USE_SIGNATURE: &str = "sig";

/// JSON Web Key as published by the key-distribution endpoint.
///
/// Missing members default to the empty string so a sparse entry is filtered
/// out rather than failing the whole document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Jwk {
    #[serde(default)]
    pub kty: String,

    #[serde(default)]
    pub alg: String,

    #[serde(default, rename = "use")]
    pub key_use: String,

    #[serde(default)]
    pub kid: String,

    /// Modulus, base64url without padding.
    #[serde(default)]
    pub n: String,

    /// Public exponent, base64url without padding.
    #[serde(default)]
    pub e: String,
}

impl Jwk {
    /// Whether this entry is an RSA key for RS256 signatures.
    pub fn is_rs256_signing_key(&self) -> bool {
        self.kty == KEY_TYPE_RSA && self.alg == ALGORITHM_RS256 && self.key_use == KEY_USE_SIGNATURE
    }
}

/// JWKS document.
#[derive(Debug, Clone, Deserialize)]
pub struct JwksResponse {
    pub keys: Vec<Jwk>,
}

/// An RSA public key usable for RS256 verification.
///
/// Immutable once built; shared read-only with verifiers through `Arc`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningKey {
    kid: String,
    modulus: Vec<u8>,
    exponent: Vec<u8>,
}

impl SigningKey {
    /// Build a key from big-endian modulus and exponent bytes.
    ///
    /// Leading zero bytes are stripped; the verifier expects minimal encodings.
    pub fn from_components(kid: impl Into<String>, modulus: &[u8], exponent: &[u8]) -> Self {
        Self {
            kid: kid.into(),
            modulus: strip_leading_zeros(modulus).to_vec(),
            exponent: strip_leading_zeros(exponent).to_vec(),
        }
    }

    /// Decode a JWK entry. Does not apply the kty/alg/use filter.
    pub fn from_jwk(jwk: &Jwk) -> Result<Self, AuthError> {
        let modulus = URL_SAFE_NO_PAD.decode(&jwk.n).map_err(|e| {
            tracing::error!(target: "idv.auth.jwk", kid = %jwk.kid, error = %e, "Invalid JWK modulus encoding");
            AuthError::KeyFetchMalformed(format!("key \"{}\" has an invalid modulus", jwk.kid))
        })?;

        let exponent = URL_SAFE_NO_PAD.decode(&jwk.e).map_err(|e| {
            tracing::error!(target: "idv.auth.jwk", kid = %jwk.kid, error = %e, "Invalid JWK exponent encoding");
            AuthError::KeyFetchMalformed(format!("key \"{}\" has an invalid exponent", jwk.kid))
        })?;

        Ok(Self::from_components(jwk.kid.clone(), &modulus, &exponent))
    }

    pub fn kid(&self) -> &str {
        &self.kid
    }

    pub fn modulus(&self) -> &[u8] {
        &self.modulus
    }

    /// Verify an RSASSA-PKCS1-v1_5 SHA-256 signature over `message`.
    ///
    /// `message` is hashed here; pass the signing input exactly as it
    /// appeared on the wire. Any failure, including a signature of the wrong
    /// length, is `SignatureInvalid`.
    ///
    /// Moduli must be 2048 to 8192 bits. A published key outside that range
    /// is kept in the key set but never verifies a signature.
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> Result<(), AuthError> {
        let public_key = RsaPublicKeyComponents {
            n: self.modulus.as_slice(),
            e: self.exponent.as_slice(),
        };

        public_key
            .verify(&RSA_PKCS1_2048_8192_SHA256, message, signature)
            .map_err(|_| {
                tracing::debug!(target: "idv.auth.jwk", kid = %self.kid, "RSA signature verification failed");
                AuthError::SignatureInvalid
            })
    }
}

/// Build the kid -> key map from a JWKS document.
///
/// Non-signing entries are skipped with a log line. A decode failure on a
/// kept entry fails the whole document.
pub fn parse_key_set(jwks: &JwksResponse) -> Result<HashMap<String, SigningKey>, AuthError> {
    let mut keys = HashMap::with_capacity(jwks.keys.len());

    for jwk in &jwks.keys {
        if !jwk.is_rs256_signing_key() {
            tracing::info!(
                target: "idv.auth.jwk",
                kid = %jwk.kid,
                kty = %jwk.kty,
                alg = %jwk.alg,
                key_use = %jwk.key_use,
                "Skipping key that is not an RS256 signing key"
            );
            continue;
        }

        let key = SigningKey::from_jwk(jwk)?;
        keys.insert(key.kid.clone(), key);
    }

    Ok(keys)
}

fn strip_leading_zeros(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    bytes.get(start..).unwrap_or_default()
}
