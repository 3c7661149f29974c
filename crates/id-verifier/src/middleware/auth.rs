//! Authentication middleware for protected routes.
//!
//! Reads the identity token from the Authorization header, verifies it with
//! the token verifier, and injects the verified identity into request
//! extensions.

use crate::auth::{TokenVerifier, VerifiedIdentity};
use crate::errors::ApiError;
use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::instrument;

/// Response message when no token is presented.
pub const NO_AUTH_TOKEN: &str = "No Auth Token";

/// Response message when the presented token fails verification.
pub const INVALID_AUTH_TOKEN: &str = "Invalid Auth Token";

/// State for the authentication middleware.
#[derive(Clone)]
pub struct AuthState {
    /// Token verifier with its key store.
    pub verifier: Arc<TokenVerifier>,
}

/// Authentication middleware that verifies identity tokens.
///
/// # Authorization Header Format
///
/// ```text
/// Authorization: Bearer <token>
/// Authorization: <token>
/// ```
///
/// # Response
///
/// - 403 `No Auth Token` if the header is absent or carries no token; the
///   verifier is not called
/// - 403 `Invalid Auth Token` if verification fails for any reason
/// - Otherwise continues with the `VerifiedIdentity` in extensions
#[instrument(skip(state, req, next), name = "idv.middleware.auth")]
pub async fn require_auth(
    State(state): State<Arc<AuthState>>,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, ApiError> {
    let token = extract_token(req.headers()).ok_or_else(|| {
        tracing::debug!(target: "idv.middleware.auth", "Missing Authorization header");
        ApiError::Forbidden(NO_AUTH_TOKEN.to_string())
    })?;

    let identity = state.verifier.verify(token).await.map_err(|e| {
        tracing::warn!(
            target: "idv.middleware.auth",
            error = %e,
            kind = e.kind(),
            "Rejected identity token"
        );
        ApiError::Forbidden(INVALID_AUTH_TOKEN.to_string())
    })?;

    req.extensions_mut().insert(identity);

    Ok(next.run(req).await)
}

/// The token carried by the Authorization header, without a `Bearer ` prefix.
///
/// Returns `None` if the header is absent, not valid UTF-8, or empty once
/// the prefix is removed.
pub fn extract_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())?;

    let token = value.strip_prefix("Bearer ").unwrap_or(value);
    if token.is_empty() {
        return None;
    }
    Some(token)
}

/// Extension trait for extracting the verified identity from a request.
pub trait IdentityExt {
    /// Returns `None` if the auth middleware was not applied to this request.
    fn identity(&self) -> Option<&VerifiedIdentity>;
}

impl<B> IdentityExt for axum::extract::Request<B> {
    fn identity(&self) -> Option<&VerifiedIdentity> {
        self.extensions().get::<VerifiedIdentity>()
    }
}
