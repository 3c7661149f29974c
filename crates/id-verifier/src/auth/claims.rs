//! Token claims and the verified identity they produce.
//!
//! The subject and email are personal data: both are redacted in `Debug`
//! output so they never reach logs by accident.

use crate::errors::ClaimFailure;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The two issuer spellings the identity provider uses.
pub const ACCEPTED_ISSUERS: [&str; 2] = ["accounts.google.com", "https://accounts.google.com"];

/// Payload claims of an identity token.
///
/// Absent members take empty or zero defaults and then fail the matching
/// claim check (a missing `exp` reads as expired).
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct Claims {
    /// Audience (the OAuth client ID the token was minted for).
    #[serde(default)]
    pub aud: String,

    /// Email address - redacted in Debug output.
    #[serde(default)]
    pub email: String,

    /// Expiration timestamp (Unix epoch seconds).
    #[serde(default)]
    pub exp: i64,

    /// Issued-at timestamp (Unix epoch seconds).
    #[serde(default)]
    pub iat: i64,

    /// Issuer.
    #[serde(default)]
    pub iss: String,

    /// Subject (stable user identifier) - redacted in Debug output.
    #[serde(default)]
    pub sub: String,
}

impl fmt::Debug for Claims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Claims")
            .field("aud", &self.aud)
            .field("email", &"[REDACTED]")
            .field("exp", &self.exp)
            .field("iat", &self.iat)
            .field("iss", &self.iss)
            .field("sub", &"[REDACTED]")
            .finish()
    }
}

impl Claims {
    /// Check the claims in order: audience, issuer, issued-at, expiry.
    ///
    /// Only call this on claims whose signature has been verified.
    pub fn validate(&self, expected_audience: &str, now: DateTime<Utc>) -> Result<(), ClaimFailure> {
        if self.aud != expected_audience {
            return Err(ClaimFailure::AudienceMismatch);
        }

        if !ACCEPTED_ISSUERS.contains(&self.iss.as_str()) {
            return Err(ClaimFailure::IssuerMismatch);
        }

        let now_secs = now.timestamp();

        // iat is whole seconds, so comparing against the truncated reading is exact.
        if now_secs < self.iat {
            return Err(ClaimFailure::IssuedInFuture);
        }

        let past_exp = now_secs > self.exp || (now_secs == self.exp && now.timestamp_subsec_nanos() > 0);
        if past_exp {
            return Err(ClaimFailure::Expired);
        }

        Ok(())
    }

    /// Consume validated claims into the caller-facing identity.
    pub fn into_identity(self) -> VerifiedIdentity {
        VerifiedIdentity {
            subject_id: self.sub,
            email: self.email,
        }
    }
}

/// The result of a successful verification.
#[derive(Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    /// The provider's stable identifier for the user (`sub`).
    pub subject_id: String,

    /// The user's email address (`email`).
    pub email: String,
}

impl fmt::Debug for VerifiedIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerifiedIdentity")
            .field("subject_id", &"[REDACTED]")
            .field("email", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const NOW: i64 = 1_700_000_000;
    const AUDIENCE: &str = "client-123.apps.example.com";

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn valid_claims() -> Claims {
        Claims {
            aud: AUDIENCE.to_string(),
            email: "alice@example.com".to_string(),
            exp: NOW + 3600,
            iat: NOW - 10,
            iss: "https://accounts.google.com".to_string(),
            sub: "110169484474386276334".to_string(),
        }
    }

    #[test]
    fn test_valid_claims_pass() {
        assert_eq!(valid_claims().validate(AUDIENCE, at(NOW)), Ok(()));
    }

    #[test]
    fn test_both_issuer_forms_accepted() {
        for iss in ACCEPTED_ISSUERS {
            let claims = Claims {
                iss: iss.to_string(),
                ..valid_claims()
            };
            assert_eq!(claims.validate(AUDIENCE, at(NOW)), Ok(()));
        }
    }

    #[test]
    fn test_audience_mismatch() {
        let result = valid_claims().validate("someone-else", at(NOW));
        assert_eq!(result, Err(ClaimFailure::AudienceMismatch));
    }

    #[test]
    fn test_audience_is_exact_string_match() {
        let claims = Claims {
            aud: format!("{} ", AUDIENCE),
            ..valid_claims()
        };
        assert_eq!(
            claims.validate(AUDIENCE, at(NOW)),
            Err(ClaimFailure::AudienceMismatch)
        );
    }

    #[test]
    fn test_issuer_mismatch() {
        for iss in ["", "accounts.example.com", "http://accounts.google.com", "ACCOUNTS.GOOGLE.COM"] {
            let claims = Claims {
                iss: iss.to_string(),
                ..valid_claims()
            };
            assert_eq!(
                claims.validate(AUDIENCE, at(NOW)),
                Err(ClaimFailure::IssuerMismatch),
                "issuer {:?} should be rejected",
                iss
            );
        }
    }

    #[test]
    fn test_issued_in_future() {
        let claims = Claims {
            iat: NOW + 1,
            exp: NOW + 3600,
            ..valid_claims()
        };
        assert_eq!(
            claims.validate(AUDIENCE, at(NOW)),
            Err(ClaimFailure::IssuedInFuture)
        );
    }

    #[test]
    fn test_issued_now_is_accepted() {
        let claims = Claims {
            iat: NOW,
            ..valid_claims()
        };
        assert_eq!(claims.validate(AUDIENCE, at(NOW)), Ok(()));
    }

    #[test]
    fn test_expired_one_second_ago() {
        let claims = Claims {
            exp: NOW - 1,
            iat: NOW - 3600,
            ..valid_claims()
        };
        assert_eq!(claims.validate(AUDIENCE, at(NOW)), Err(ClaimFailure::Expired));
    }

    #[test]
    fn test_expiring_exactly_now_is_accepted() {
        let claims = Claims {
            exp: NOW,
            ..valid_claims()
        };
        assert_eq!(claims.validate(AUDIENCE, at(NOW)), Ok(()));
    }

    #[test]
    fn test_expired_by_subsecond() {
        let claims = Claims {
            exp: NOW,
            ..valid_claims()
        };
        let now = Utc.timestamp_opt(NOW, 500_000_000).unwrap();
        assert_eq!(claims.validate(AUDIENCE, now), Err(ClaimFailure::Expired));
    }

    #[test]
    fn test_checks_short_circuit_in_order() {
        // Every claim is wrong; the audience is reported first.
        let claims = Claims {
            aud: "wrong".to_string(),
            iss: "wrong".to_string(),
            iat: NOW + 100,
            exp: NOW - 100,
            ..valid_claims()
        };
        assert_eq!(
            claims.validate(AUDIENCE, at(NOW)),
            Err(ClaimFailure::AudienceMismatch)
        );

        let claims = Claims {
            iss: "wrong".to_string(),
            iat: NOW + 100,
            exp: NOW - 100,
            ..valid_claims()
        };
        assert_eq!(
            claims.validate(AUDIENCE, at(NOW)),
            Err(ClaimFailure::IssuerMismatch)
        );

        // iat is checked before exp.
        let claims = Claims {
            iat: NOW + 100,
            exp: NOW - 100,
            ..valid_claims()
        };
        assert_eq!(
            claims.validate(AUDIENCE, at(NOW)),
            Err(ClaimFailure::IssuedInFuture)
        );
    }

    #[test]
    fn test_missing_members_default_and_fail_claim_checks() {
        let claims: Claims = serde_json::from_str(r#"{"aud":"client-123.apps.example.com","iss":"accounts.google.com"}"#).unwrap();

        assert!(claims.sub.is_empty());
        assert_eq!(claims.exp, 0);
        assert_eq!(claims.validate(AUDIENCE, at(NOW)), Err(ClaimFailure::Expired));
    }

    #[test]
    fn test_unknown_members_are_ignored() {
        let json = r#"{
            "aud": "client-123.apps.example.com",
            "azp": "client-123.apps.example.com",
            "email": "alice@example.com",
            "email_verified": true,
            "exp": 1700003600,
            "iat": 1699999990,
            "iss": "accounts.google.com",
            "sub": "110169484474386276334"
        }"#;

        let claims: Claims = serde_json::from_str(json).unwrap();
        assert_eq!(claims.email, "alice@example.com");
        assert_eq!(claims.validate(AUDIENCE, at(NOW)), Ok(()));
    }

    #[test]
    fn test_into_identity() {
        let identity = valid_claims().into_identity();
        assert_eq!(identity.subject_id, "110169484474386276334");
        assert_eq!(identity.email, "alice@example.com");
    }

    #[test]
    fn test_claims_debug_redacts_personal_data() {
        let debug_str = format!("{:?}", valid_claims());

        assert!(!debug_str.contains("110169484474386276334"));
        assert!(!debug_str.contains("alice@example.com"));
        assert!(debug_str.contains("[REDACTED]"));
        assert!(debug_str.contains(AUDIENCE));
    }

    #[test]
    fn test_identity_debug_redacts_personal_data() {
        let debug_str = format!("{:?}", valid_claims().into_identity());

        assert!(!debug_str.contains("110169484474386276334"));
        assert!(!debug_str.contains("alice@example.com"));
    }
}
