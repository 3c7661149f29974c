//! Current user handler.
//!
//! Returns the identity established by the auth middleware.

use crate::errors::ApiError;
use crate::middleware::auth::{IdentityExt, NO_AUTH_TOKEN};
use axum::{extract::Request, Json};
use serde::Serialize;
use tracing::instrument;

/// Response for `/v1/me` endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct MeResponse {
    /// The provider's stable user identifier.
    pub id: String,

    pub email: String,
}

/// Handler for GET /v1/me
///
/// Requires valid authentication via the auth middleware. A request that
/// reaches this handler without an identity is answered 403 `No Auth Token`.
///
/// ## Response
///
/// ```json
/// {
///   "id": "110169484474386276334",
///   "email": "alice@example.com"
/// }
/// ```
#[instrument(skip_all, name = "idv.handlers.me")]
pub async fn get_me(req: Request) -> Result<Json<MeResponse>, ApiError> {
    let identity = req.identity().ok_or_else(|| {
        tracing::warn!(target: "idv.handlers.me", "Request reached handler without an identity");
        ApiError::Forbidden(NO_AUTH_TOKEN.to_string())
    })?;

    tracing::debug!(target: "idv.handlers.me", "Returning verified identity");

    Ok(Json(MeResponse {
        id: identity.subject_id.clone(),
        email: identity.email.clone(),
    }))
}
