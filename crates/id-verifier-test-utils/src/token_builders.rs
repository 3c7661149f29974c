//! Builder patterns for test data construction
//!
//! Provides a fluent API for identity token claims.

use serde_json::{json, Map, Value};

/// Default audience for built claims.
pub const TEST_AUDIENCE: &str = "test-client.apps.example.com";

/// Default issuer for built claims.
pub const TEST_ISSUER: &str = "https://accounts.google.com";

/// Builder for creating test identity token claims
///
/// Timestamps are relative to the `now` passed to [`TestClaimsBuilder::new`],
/// so tests using a manual clock stay deterministic.
///
/// # Example
/// ```rust,ignore
/// let claims = TestClaimsBuilder::new(now)
///     .audience("client-123")
///     .subject("110169484474386276334")
///     .email("alice@example.com")
///     .build();
/// ```
pub struct TestClaimsBuilder {
    aud: String,
    email: String,
    exp: i64,
    iat: i64,
    iss: String,
    sub: String,
    omitted: Vec<String>,
}

impl TestClaimsBuilder {
    /// Create a builder issued at `now` and expiring an hour later.
    pub fn new(now: i64) -> Self {
        Self {
            aud: TEST_AUDIENCE.to_string(),
            email: "test-user@example.com".to_string(),
            exp: now + 3600,
            iat: now,
            iss: TEST_ISSUER.to_string(),
            sub: "test-subject".to_string(),
            omitted: Vec::new(),
        }
    }

    pub fn audience(mut self, aud: &str) -> Self {
        self.aud = aud.to_string();
        self
    }

    pub fn email(mut self, email: &str) -> Self {
        self.email = email.to_string();
        self
    }

    /// Set expiration timestamp
    pub fn expires_at(mut self, timestamp: i64) -> Self {
        self.exp = timestamp;
        self
    }

    /// Set issued-at timestamp
    pub fn issued_at(mut self, timestamp: i64) -> Self {
        self.iat = timestamp;
        self
    }

    pub fn issuer(mut self, iss: &str) -> Self {
        self.iss = iss.to_string();
        self
    }

    pub fn subject(mut self, sub: &str) -> Self {
        self.sub = sub.to_string();
        self
    }

    /// Leave a claim out of the payload entirely
    pub fn without(mut self, claim: &str) -> Self {
        self.omitted.push(claim.to_string());
        self
    }

    /// Build the claims as a JSON object
    pub fn build(self) -> Value {
        let mut claims = Map::new();
        claims.insert("aud".to_string(), json!(self.aud));
        claims.insert("email".to_string(), json!(self.email));
        claims.insert("exp".to_string(), json!(self.exp));
        claims.insert("iat".to_string(), json!(self.iat));
        claims.insert("iss".to_string(), json!(self.iss));
        claims.insert("sub".to_string(), json!(self.sub));

        for claim in &self.omitted {
            claims.remove(claim);
        }

        Value::Object(claims)
    }
}
