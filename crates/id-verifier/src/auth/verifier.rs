//! Identity token verification.
//!
//! Verification is done directly with `ring` rather than through
//! `jsonwebtoken::decode`, so each failed check maps to its own `AuthError`
//! and the signature is checked over the token bytes exactly as received.
//!
//! # Security
//!
//! - Tokens are size-checked and fully decoded before the key store is
//!   consulted, so malformed input never triggers a key fetch
//! - Only RS256 (RSASSA-PKCS1-v1_5 with SHA-256) is accepted
//! - The signature is checked over the original encoded header and payload,
//!   and before any claim is looked at
//! - Claim checks run in a fixed order and the first failure wins

use crate::auth::claims::VerifiedIdentity;
use crate::auth::key_store::KeyStore;
use crate::auth::token::ParsedToken;
use crate::clock::{Clock, SystemClock};
use crate::errors::AuthError;
use crate::observability::metrics;
use std::sync::Arc;
use tracing::instrument;

/// Verifies identity tokens against the provider's published keys.
pub struct TokenVerifier {
    /// Key store for resolving signing keys.
    key_store: Arc<KeyStore>,

    /// Audience used by [`TokenVerifier::verify`].
    audience: String,

    /// Time source for iat/exp checks.
    clock: Arc<dyn Clock>,
}

impl TokenVerifier {
    /// Create a verifier for `audience` using the system clock.
    pub fn new(key_store: Arc<KeyStore>, audience: impl Into<String>) -> Self {
        Self::with_clock(key_store, audience, Arc::new(SystemClock))
    }

    /// Create a verifier with an explicit clock.
    pub fn with_clock(
        key_store: Arc<KeyStore>,
        audience: impl Into<String>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            key_store,
            audience: audience.into(),
            clock,
        }
    }

    pub fn key_store(&self) -> &Arc<KeyStore> {
        &self.key_store
    }

    /// Verify a token against the configured audience.
    pub async fn verify(&self, token: &str) -> Result<VerifiedIdentity, AuthError> {
        self.verify_token(token, &self.audience).await
    }

    /// Verify a token and return the identity it asserts.
    ///
    /// # Steps
    ///
    /// 1. Split into three non-empty sections and decode them
    /// 2. Reject any header algorithm other than RS256
    /// 3. Resolve the signing key by `kid` (may refresh the key set)
    /// 4. Verify the signature over `header.payload` as received
    /// 5. Check audience, issuer, issued-at and expiry, in that order
    ///
    /// May perform a network round trip when the key set needs refreshing.
    ///
    /// # Errors
    ///
    /// Returns the `AuthError` variant naming the first check that failed.
    #[instrument(skip_all)]
    pub async fn verify_token(
        &self,
        token: &str,
        expected_audience: &str,
    ) -> Result<VerifiedIdentity, AuthError> {
        let result = self.verify_token_inner(token, expected_audience).await;

        match &result {
            Ok(_) => {
                tracing::debug!(target: "idv.auth.verifier", "Token verified successfully");
                metrics::record_token_verification("success");
            }
            Err(e) => {
                tracing::debug!(target: "idv.auth.verifier", error = %e, kind = e.kind(), "Token verification failed");
                metrics::record_token_verification(e.kind());
            }
        }

        result
    }

    async fn verify_token_inner(
        &self,
        token: &str,
        expected_audience: &str,
    ) -> Result<VerifiedIdentity, AuthError> {
        let parsed = ParsedToken::parse(token)?;

        let key = self.key_store.resolve_key(&parsed.header.kid).await?;

        parsed.verify_signature(&key)?;

        parsed
            .claims
            .validate(expected_audience, self.clock.now())
            .map_err(AuthError::ClaimInvalid)?;

        Ok(parsed.claims.into_identity())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::errors::ClaimFailure;
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
    use id_verifier_test_utils::{http_date, mount_jwks, TestClaimsBuilder, TestKeypair};
    use std::time::Duration;
    use wiremock::MockServer;

    const NOW: i64 = 1_700_000_000;
    const AUDIENCE: &str = "client-123.apps.example.com";

    struct Fixture {
        _server: MockServer,
        verifier: TokenVerifier,
        keypair: TestKeypair,
    }

    async fn fixture_with_fetches(expected_fetches: u64) -> Fixture {
        let server = MockServer::start().await;
        let keypair = TestKeypair::primary();
        mount_jwks(
            &server,
            serde_json::json!({ "keys": [keypair.jwk_json()] }),
            &http_date(NOW + 3600),
            expected_fetches,
        )
        .await;

        let clock = Arc::new(ManualClock::at(NOW));
        let key_store = Arc::new(KeyStore::with_options(
            format!("{}/oauth2/v3/certs", server.uri()),
            Duration::from_secs(5),
            clock.clone(),
        ));
        let verifier = TokenVerifier::with_clock(key_store, AUDIENCE, clock);

        Fixture {
            _server: server,
            verifier,
            keypair,
        }
    }

    fn claims() -> TestClaimsBuilder {
        TestClaimsBuilder::new(NOW)
            .audience(AUDIENCE)
            .subject("110169484474386276334")
            .email("alice@example.com")
    }

    #[tokio::test]
    async fn test_valid_token_returns_identity() {
        let fx = fixture_with_fetches(1).await;
        let token = fx.keypair.sign_claims(&claims().build());

        let identity = fx.verifier.verify(&token).await.unwrap();

        assert_eq!(identity.subject_id, "110169484474386276334");
        assert_eq!(identity.email, "alice@example.com");
    }

    #[tokio::test]
    async fn test_explicit_audience_overrides_configured() {
        let fx = fixture_with_fetches(1).await;
        let token = fx
            .keypair
            .sign_claims(&claims().audience("other-client").build());

        assert!(fx.verifier.verify_token(&token, "other-client").await.is_ok());
    }

    #[tokio::test]
    async fn test_malformed_tokens_never_fetch_keys() {
        let fx = fixture_with_fetches(0).await;

        let valid = fx.keypair.sign_claims(&claims().build());
        let mut sections = valid.split('.');
        let (h, p, s) = (
            sections.next().unwrap(),
            sections.next().unwrap(),
            sections.next().unwrap(),
        );
        let bad_json = URL_SAFE_NO_PAD.encode(br#"{"aud":"#);

        let inputs = [
            String::new(),
            "abc".to_string(),
            format!("{}.{}", h, p),
            format!("{}.{}.{}.{}", h, p, s, s),
            format!("{}.{}.", h, p),
            format!("$$$.{}.{}", p, s),
            format!("{}.$$$.{}", h, s),
            format!("{}.{}.$$$", h, p),
            format!("{}.{}.{}", bad_json, p, s),
            format!("{}.{}.{}", h, bad_json, s),
        ];

        for input in inputs {
            let result = fx.verifier.verify(&input).await;
            assert!(
                matches!(result, Err(AuthError::MalformedToken(_))),
                "Expected MalformedToken for {:?}, got {:?}",
                input,
                result
            );
        }
        // MockServer verifies expect(0) on drop.
    }

    #[tokio::test]
    async fn test_unsupported_algorithm_never_fetches_keys() {
        let fx = fixture_with_fetches(0).await;
        let token = fx
            .keypair
            .sign_raw(r#"{"alg":"HS256","kid":"test-key-a","typ":"JWT"}"#, &claims().build());

        let result = fx.verifier.verify(&token).await;
        assert_eq!(
            result,
            Err(AuthError::UnsupportedAlgorithm("HS256".to_string()))
        );
    }

    #[tokio::test]
    async fn test_unknown_kid_is_key_not_found() {
        let fx = fixture_with_fetches(1).await;
        let token = fx
            .keypair
            .sign_raw(r#"{"alg":"RS256","kid":"rotated-away"}"#, &claims().build());

        let result = fx.verifier.verify(&token).await;
        assert_eq!(result, Err(AuthError::KeyNotFound("rotated-away".to_string())));
    }

    #[tokio::test]
    async fn test_null_kid_is_key_not_found() {
        let fx = fixture_with_fetches(1).await;
        let token = fx
            .keypair
            .sign_raw(r#"{"alg":"RS256","kid":null}"#, &claims().build());

        let result = fx.verifier.verify(&token).await;
        assert_eq!(result, Err(AuthError::KeyNotFound(String::new())));
    }

    #[tokio::test]
    async fn test_audience_mismatch_despite_valid_signature() {
        let fx = fixture_with_fetches(1).await;
        let token = fx
            .keypair
            .sign_claims(&claims().audience("another-app").build());

        let result = fx.verifier.verify(&token).await;
        assert_eq!(
            result,
            Err(AuthError::ClaimInvalid(ClaimFailure::AudienceMismatch))
        );
    }

    #[tokio::test]
    async fn test_issuer_mismatch() {
        let fx = fixture_with_fetches(1).await;
        let token = fx
            .keypair
            .sign_claims(&claims().issuer("https://evil.example.com").build());

        let result = fx.verifier.verify(&token).await;
        assert_eq!(
            result,
            Err(AuthError::ClaimInvalid(ClaimFailure::IssuerMismatch))
        );
    }

    #[tokio::test]
    async fn test_expired_one_second_ago() {
        let fx = fixture_with_fetches(1).await;
        let token = fx
            .keypair
            .sign_claims(&claims().issued_at(NOW - 3600).expires_at(NOW - 1).build());

        let result = fx.verifier.verify(&token).await;
        assert_eq!(result, Err(AuthError::ClaimInvalid(ClaimFailure::Expired)));
    }

    #[tokio::test]
    async fn test_issued_in_future() {
        let fx = fixture_with_fetches(1).await;
        let token = fx
            .keypair
            .sign_claims(&claims().issued_at(NOW + 1).expires_at(NOW + 3601).build());

        let result = fx.verifier.verify(&token).await;
        assert_eq!(
            result,
            Err(AuthError::ClaimInvalid(ClaimFailure::IssuedInFuture))
        );
    }

    #[tokio::test]
    async fn test_tampered_payload_is_signature_invalid() {
        let fx = fixture_with_fetches(1).await;
        let token = fx.keypair.sign_claims(&claims().build());

        let mut sections: Vec<String> = token.split('.').map(str::to_string).collect();
        let payload = URL_SAFE_NO_PAD.decode(&sections[1]).unwrap();
        let tampered = String::from_utf8(payload)
            .unwrap()
            .replace("alice@example.com", "alice@example.org");
        sections[1] = URL_SAFE_NO_PAD.encode(tampered.as_bytes());
        let tampered_token = sections.join(".");

        let result = fx.verifier.verify(&tampered_token).await;
        assert_eq!(result, Err(AuthError::SignatureInvalid));
    }

    #[tokio::test]
    async fn test_signature_from_unpublished_key_is_invalid() {
        let fx = fixture_with_fetches(1).await;
        // Signed by a key that is not in the JWKS but claims the published kid.
        let token = TestKeypair::secondary()
            .sign_raw(r#"{"alg":"RS256","kid":"test-key-a"}"#, &claims().build());

        let result = fx.verifier.verify(&token).await;
        assert_eq!(result, Err(AuthError::SignatureInvalid));
    }

    #[tokio::test]
    async fn test_signature_over_reserialized_header_is_invalid() {
        let fx = fixture_with_fetches(1).await;
        let token = fx
            .keypair
            .sign_raw(r#"{"alg":"RS256","kid":"test-key-a"}"#, &claims().build());

        // Same header JSON with extra whitespace: decodes identically, signed bytes differ.
        let mut sections: Vec<String> = token.split('.').map(str::to_string).collect();
        sections[0] = URL_SAFE_NO_PAD.encode(br#"{ "alg":"RS256","kid":"test-key-a"}"#);
        let respaced = sections.join(".");

        let result = fx.verifier.verify(&respaced).await;
        assert_eq!(result, Err(AuthError::SignatureInvalid));
    }

    #[tokio::test]
    async fn test_key_set_reused_across_verifications() {
        let fx = fixture_with_fetches(1).await;
        let token = fx.keypair.sign_claims(&claims().build());

        for _ in 0..3 {
            assert!(fx.verifier.verify(&token).await.is_ok());
        }
    }

    #[test]
    fn test_verifier_shares_key_store() {
        let key_store = Arc::new(KeyStore::new("http://localhost:1/certs"));
        let verifier = TokenVerifier::new(key_store.clone(), AUDIENCE);

        assert!(Arc::ptr_eq(verifier.key_store(), &key_store));
    }
}
