//! Fixed RSA keypairs for testing
//!
//! Two 2048-bit keys are checked in as PKCS#1 DER under `fixtures/`, so
//! every run signs with the same material and no key generation is needed.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use ring::rand::SystemRandom;
use ring::signature::{RsaKeyPair, RsaPublicKeyComponents, RSA_PKCS1_SHA256};
use serde_json::{json, Value};

const PRIMARY_KEY_DER: &[u8] = include_bytes!("../fixtures/rsa_2048_a.der");
const SECONDARY_KEY_DER: &[u8] = include_bytes!("../fixtures/rsa_2048_b.der");

/// Key ID of [`TestKeypair::primary`].
pub const PRIMARY_KID: &str = "test-key-a";

/// Key ID of [`TestKeypair::secondary`].
pub const SECONDARY_KID: &str = "test-key-b";

/// An RSA signing keypair with its published key ID.
pub struct TestKeypair {
    kid: String,
    der: &'static [u8],
    key_pair: RsaKeyPair,
}

impl TestKeypair {
    /// The default signing key (`test-key-a`).
    pub fn primary() -> Self {
        Self::from_der(PRIMARY_KID, PRIMARY_KEY_DER)
    }

    /// A second, unrelated key (`test-key-b`).
    pub fn secondary() -> Self {
        Self::from_der(SECONDARY_KID, SECONDARY_KEY_DER)
    }

    /// Same key material as `self`, published under a different key ID.
    pub fn with_kid(&self, kid: &str) -> Self {
        Self::from_der(kid, self.der)
    }

    fn from_der(kid: &str, der: &'static [u8]) -> Self {
        let key_pair = RsaKeyPair::from_der(der).expect("fixture key should be valid PKCS#1 DER");
        Self {
            kid: kid.to_string(),
            der,
            key_pair,
        }
    }

    pub fn kid(&self) -> &str {
        &self.kid
    }

    fn components(&self) -> RsaPublicKeyComponents<Vec<u8>> {
        self.key_pair.public().into()
    }

    /// Big-endian modulus without leading zeros.
    pub fn modulus(&self) -> Vec<u8> {
        strip_leading_zeros(self.components().n)
    }

    /// Big-endian public exponent without leading zeros.
    pub fn exponent(&self) -> Vec<u8> {
        strip_leading_zeros(self.components().e)
    }

    /// The public key as a JWK entry, as the provider publishes it.
    pub fn jwk_json(&self) -> Value {
        json!({
            "kty": "RSA",
            "alg": "RS256",
            "use": "sig",
            "kid": self.kid,
            "n": URL_SAFE_NO_PAD.encode(self.modulus()),
            "e": URL_SAFE_NO_PAD.encode(self.exponent()),
        })
    }

    /// RSASSA-PKCS1-v1_5 SHA-256 signature over `message`.
    pub fn sign_bytes(&self, message: &[u8]) -> Vec<u8> {
        let mut signature = vec![0u8; self.key_pair.public().modulus_len()];
        self.key_pair
            .sign(&RSA_PKCS1_SHA256, &SystemRandom::new(), message, &mut signature)
            .expect("signing with fixture key should succeed");
        signature
    }

    /// Sign `claims` as an RS256 token carrying this key's `kid`.
    ///
    /// Uses `jsonwebtoken`, so tokens come from an independent encoder.
    pub fn sign_claims(&self, claims: &Value) -> String {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(self.kid.clone());

        let encoding_key = EncodingKey::from_rsa_der(self.der);
        jsonwebtoken::encode(&header, claims, &encoding_key).expect("token encoding should succeed")
    }

    /// Sign a token with an arbitrary header JSON, encoded byte-for-byte.
    pub fn sign_raw(&self, header_json: &str, claims: &Value) -> String {
        let header_b64 = URL_SAFE_NO_PAD.encode(header_json.as_bytes());
        let payload_b64 = URL_SAFE_NO_PAD.encode(claims.to_string().as_bytes());
        let signing_input = format!("{}.{}", header_b64, payload_b64);

        let signature = self.sign_bytes(signing_input.as_bytes());
        format!("{}.{}", signing_input, URL_SAFE_NO_PAD.encode(signature))
    }
}

fn strip_leading_zeros(bytes: Vec<u8>) -> Vec<u8> {
    bytes.into_iter().skip_while(|b| *b == 0).collect()
}

/// A JWKS document publishing the given keys.
pub fn jwks_document(keypairs: &[&TestKeypair]) -> Value {
    let keys: Vec<Value> = keypairs.iter().map(|k| k.jwk_json()).collect();
    json!({ "keys": keys })
}
