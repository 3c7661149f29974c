//! Health check handler.

use crate::routes::AppState;
use axum::extract::State;
use axum::Json;
use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;

/// Health check response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,

    /// Number of signing keys currently cached (0 before the first refresh).
    pub cached_keys: usize,

    /// RFC 3339 expiry of the cached key set, `null` before the first refresh.
    pub keys_expire_at: Option<String>,
}

/// Handler for GET /v1/health
///
/// Does not contact the identity provider; the key count only reflects what
/// earlier verifications fetched.
///
/// ## Example Response
///
/// ```json
/// {
///   "status": "healthy",
///   "cached_keys": 2,
///   "keys_expire_at": "2026-10-18T12:00:00+00:00"
/// }
/// ```
#[instrument(skip_all, name = "idv.health.check")]
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let key_store = state.verifier.key_store();
    let cached_keys = key_store.cached_key_count().await;
    let keys_expire_at = key_store.expires_at().await.map(|t| t.to_rfc3339());

    Json(HealthResponse {
        status: "healthy".to_string(),
        cached_keys,
        keys_expire_at,
    })
}
