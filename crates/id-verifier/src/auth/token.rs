//! Structural parsing of a compact-serialized token.
//!
//! `ParsedToken::parse` splits the token, decodes all three sections and
//! checks the header algorithm. It performs no network access and trusts
//! nothing: the claims it returns are only meaningful after
//! [`ParsedToken::verify_signature`] succeeds.

use crate::auth::claims::Claims;
use crate::auth::jwk::{SigningKey, ALGORITHM_RS256};
use crate::errors::AuthError;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};

/// Maximum accepted token size in bytes (8KB).
///
/// Larger tokens are rejected before any decoding. Identity tokens from the
/// provider are around 1KB.
pub const MAX_TOKEN_SIZE_BYTES: usize = 8192;

/// Section separator in the compact serialization.
pub const TOKEN_SEPARATOR: char = '.';

/// Token header.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenHeader {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub alg: String,

    /// Key identifier, used verbatim for key lookup. Absent or `null` reads
    /// as empty.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub kid: String,
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// A token decomposed into its parts. Lives for one verification call.
#[derive(Debug)]
pub struct ParsedToken<'a> {
    pub header: TokenHeader,

    /// Untrusted until the signature is verified.
    pub claims: Claims,

    /// `header + "." + payload` exactly as received.
    pub signing_input: &'a str,

    pub signature: Vec<u8>,
}

impl<'a> ParsedToken<'a> {
    /// Parse a raw token.
    ///
    /// # Errors
    ///
    /// - `MalformedToken` for size, structure, base64 or JSON problems
    /// - `UnsupportedAlgorithm` if the header `alg` is not RS256
    pub fn parse(token: &'a str) -> Result<Self, AuthError> {
        if token.len() > MAX_TOKEN_SIZE_BYTES {
            tracing::debug!(
                target: "idv.auth.token",
                token_size = token.len(),
                max_size = MAX_TOKEN_SIZE_BYTES,
                "Token rejected: size exceeds maximum allowed"
            );
            return Err(AuthError::MalformedToken(
                "token exceeds maximum size".to_string(),
            ));
        }

        let mut sections = token.split(TOKEN_SEPARATOR);
        let (header_b64, payload_b64, signature_b64) =
            match (sections.next(), sections.next(), sections.next(), sections.next()) {
                (Some(h), Some(p), Some(s), None) if !h.is_empty() && !p.is_empty() && !s.is_empty() => {
                    (h, p, s)
                }
                _ => {
                    tracing::debug!(target: "idv.auth.token", "Token rejected: invalid section structure");
                    return Err(AuthError::MalformedToken(
                        "token does not contain header, payload, and signature".to_string(),
                    ));
                }
            };

        let header: TokenHeader = decode_json_section(header_b64, "header")?;

        if header.alg != ALGORITHM_RS256 {
            tracing::debug!(target: "idv.auth.token", alg = %header.alg, "Token rejected: unsupported algorithm");
            return Err(AuthError::UnsupportedAlgorithm(header.alg));
        }

        let claims: Claims = decode_json_section(payload_b64, "payload")?;

        let signature = URL_SAFE_NO_PAD.decode(signature_b64).map_err(|e| {
            tracing::debug!(target: "idv.auth.token", error = %e, "Failed to decode signature base64");
            AuthError::MalformedToken("signature is not valid base64url".to_string())
        })?;

        let signing_input_len = header_b64.len() + TOKEN_SEPARATOR.len_utf8() + payload_b64.len();
        let signing_input = token.get(..signing_input_len).ok_or_else(|| {
            AuthError::MalformedToken("token does not contain header, payload, and signature".to_string())
        })?;

        Ok(Self {
            header,
            claims,
            signing_input,
            signature,
        })
    }

    /// Verify the signature over the original encoded header and payload.
    pub fn verify_signature(&self, key: &SigningKey) -> Result<(), AuthError> {
        key.verify(self.signing_input.as_bytes(), &self.signature)
    }
}

fn decode_json_section<T: DeserializeOwned>(section: &str, name: &str) -> Result<T, AuthError> {
    let bytes = URL_SAFE_NO_PAD.decode(section).map_err(|e| {
        tracing::debug!(target: "idv.auth.token", section = name, error = %e, "Failed to decode token section base64");
        AuthError::MalformedToken(format!("{} is not valid base64url", name))
    })?;

    serde_json::from_slice(&bytes).map_err(|e| {
        tracing::debug!(target: "idv.auth.token", section = name, error = %e, "Failed to parse token section JSON");
        AuthError::MalformedToken(format!("{} is not valid JSON", name))
    })
}
