//! Error types for token verification and the HTTP surface.
//!
//! `AuthError` is the verification taxonomy: every failure is distinguishable
//! by variant so callers and tests can match on the kind, not the message.
//! `ApiError` is what the HTTP layer returns to clients. Its messages are
//! generic; the specific `AuthError` is logged server-side.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Reason a signature-verified token was rejected on its claims.
///
/// Claim checks run in declaration order and stop at the first failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimFailure {
    /// `aud` does not equal the expected audience.
    AudienceMismatch,

    /// `iss` is not one of the accepted issuer literals.
    IssuerMismatch,

    /// `iat` is after the verification time.
    IssuedInFuture,

    /// `exp` is before the verification time.
    Expired,
}

impl ClaimFailure {
    /// Stable label for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimFailure::AudienceMismatch => "audience_mismatch",
            ClaimFailure::IssuerMismatch => "issuer_mismatch",
            ClaimFailure::IssuedInFuture => "issued_in_future",
            ClaimFailure::Expired => "expired",
        }
    }
}

impl fmt::Display for ClaimFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            ClaimFailure::AudienceMismatch => "audience mismatch",
            ClaimFailure::IssuerMismatch => "issuer mismatch",
            ClaimFailure::IssuedInFuture => "issued in the future",
            ClaimFailure::Expired => "expired",
        };
        f.write_str(reason)
    }
}

/// Token verification error.
///
/// Every variant is terminal for the verification call. Nothing is retried.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Wrong section count, empty section, undecodable base64 or unparsable
    /// header/payload JSON.
    #[error("Malformed token: {0}")]
    MalformedToken(String),

    /// Header `alg` is not RS256. Carries the offending value.
    #[error("Algorithm \"{0}\" is not supported")]
    UnsupportedAlgorithm(String),

    /// The key-distribution endpoint could not be reached or answered with
    /// a non-success status.
    #[error("Key fetch failed: {0}")]
    KeyFetchFailed(String),

    /// The key-distribution response body or its `Expires` header could not
    /// be parsed.
    #[error("Key fetch response malformed: {0}")]
    KeyFetchMalformed(String),

    /// The key identifier is absent from the current key set.
    #[error("Key \"{0}\" not found")]
    KeyNotFound(String),

    /// RSA signature verification failed.
    #[error("Signature invalid")]
    SignatureInvalid,

    /// The token is authentic but one of its claims is unacceptable.
    #[error("Claim invalid: {0}")]
    ClaimInvalid(ClaimFailure),
}

impl AuthError {
    /// Stable snake_case label for the error kind, used as a log field and
    /// metric label.
    pub fn kind(&self) -> &'static str {
        match self {
            AuthError::MalformedToken(_) => "malformed_token",
            AuthError::UnsupportedAlgorithm(_) => "unsupported_algorithm",
            AuthError::KeyFetchFailed(_) => "key_fetch_failed",
            AuthError::KeyFetchMalformed(_) => "key_fetch_malformed",
            AuthError::KeyNotFound(_) => "key_not_found",
            AuthError::SignatureInvalid => "signature_invalid",
            AuthError::ClaimInvalid(reason) => reason.as_str(),
        }
    }
}

/// HTTP-facing error type.
///
/// Every authentication failure is a 403 with a fixed client message.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Forbidden: {0}")]
    Forbidden(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::Forbidden(reason) => (StatusCode::FORBIDDEN, "FORBIDDEN", reason),
        };

        let error_response = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };

        (status, Json(error_response)).into_response()
    }
}
