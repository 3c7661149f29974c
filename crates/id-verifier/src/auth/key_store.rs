//! Cached, time-bounded copy of the identity provider's signing keys.
//!
//! The key set is fetched lazily on first use and refetched once the expiry
//! advertised by the endpoint's `Expires` header has passed. A single async
//! mutex covers the staleness check, the refresh and the lookup, so at most
//! one refresh is in flight and no caller ever sees a half-replaced set.
//!
//! A failed refresh leaves the previous key set in place and returns the
//! error to the caller.

use crate::auth::jwk::{parse_key_set, JwksResponse, SigningKey};
use crate::clock::{Clock, SystemClock};
use crate::errors::AuthError;
use crate::observability::metrics;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::instrument;

/// Default HTTP timeout for fetching the key set.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// A complete key set and the instant it stops being trusted.
struct KeySet {
    keys: HashMap<String, Arc<SigningKey>>,
    expires_at: DateTime<Utc>,
}

impl KeySet {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        !self.keys.is_empty() && self.expires_at > now
    }
}

/// Owner of the provider's current signing keys.
///
/// Instantiate one per provider and hold it for the process lifetime.
pub struct KeyStore {
    /// URL of the JWKS endpoint.
    jwks_url: String,

    /// HTTP client for fetching the key set.
    http_client: reqwest::Client,

    /// Time source for expiry checks.
    clock: Arc<dyn Clock>,

    /// `None` until the first successful refresh.
    cache: Mutex<Option<KeySet>>,
}

impl KeyStore {
    /// Create a key store for the given JWKS endpoint using the system clock.
    pub fn new(jwks_url: impl Into<String>) -> Self {
        Self::with_options(jwks_url, DEFAULT_FETCH_TIMEOUT, Arc::new(SystemClock))
    }

    /// Create a key store with an explicit fetch timeout and clock.
    pub fn with_options(
        jwks_url: impl Into<String>,
        fetch_timeout: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(fetch_timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(target: "idv.auth.keys", error = %e, "Failed to build HTTP client with custom config, using defaults");
                reqwest::Client::new()
            });

        Self {
            jwks_url: jwks_url.into(),
            http_client,
            clock,
            cache: Mutex::new(None),
        }
    }

    pub fn jwks_url(&self) -> &str {
        &self.jwks_url
    }

    /// Resolve the signing key for `kid`, refreshing the key set first if
    /// it is empty or expired.
    ///
    /// # Errors
    ///
    /// - `KeyFetchFailed` / `KeyFetchMalformed` if a needed refresh fails
    /// - `KeyNotFound` if `kid` is absent from the (possibly refreshed) set
    #[instrument(skip(self))]
    pub async fn resolve_key(&self, kid: &str) -> Result<Arc<SigningKey>, AuthError> {
        let mut cache = self.cache.lock().await;

        let now = self.clock.now();
        let fresh = cache.as_ref().is_some_and(|set| set.is_fresh(now));

        if fresh {
            tracing::debug!(target: "idv.auth.keys", "Key set still valid");
        } else {
            *cache = Some(self.fetch_key_set().await?);
        }

        cache
            .as_ref()
            .and_then(|set| set.keys.get(kid))
            .cloned()
            .ok_or_else(|| {
                tracing::debug!(target: "idv.auth.keys", kid = %kid, "Key not found in key set");
                AuthError::KeyNotFound(kid.to_string())
            })
    }

    /// Refresh the key set regardless of its expiry.
    ///
    /// On failure the current key set is kept.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<(), AuthError> {
        let mut cache = self.cache.lock().await;
        *cache = Some(self.fetch_key_set().await?);
        Ok(())
    }

    /// Number of keys currently cached.
    pub async fn cached_key_count(&self) -> usize {
        self.cache.lock().await.as_ref().map_or(0, |set| set.keys.len())
    }

    /// Expiry of the current key set, if one has been fetched.
    pub async fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.cache.lock().await.as_ref().map(|set| set.expires_at)
    }

    /// Fetch and parse a complete key set. Does not touch the cache.
    async fn fetch_key_set(&self) -> Result<KeySet, AuthError> {
        let start = Instant::now();
        let result = self.fetch_key_set_inner().await;

        let status = match &result {
            Ok(_) => "success",
            Err(e) => e.kind(),
        };
        metrics::record_jwks_refresh(status, start.elapsed());

        result
    }

    async fn fetch_key_set_inner(&self) -> Result<KeySet, AuthError> {
        tracing::debug!(target: "idv.auth.keys", url = %self.jwks_url, "Fetching key set");

        let response = self
            .http_client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(target: "idv.auth.keys", error = %e, "Failed to fetch key set");
                AuthError::KeyFetchFailed(e.to_string())
            })?;

        if !response.status().is_success() {
            tracing::error!(
                target: "idv.auth.keys",
                status = %response.status(),
                "Key endpoint returned error"
            );
            return Err(AuthError::KeyFetchFailed(format!(
                "key endpoint returned {}",
                response.status()
            )));
        }

        let expires_header = response
            .headers()
            .get(reqwest::header::EXPIRES)
            .map(|value| value.to_str().map(str::to_string));

        let expires_at = match expires_header {
            Some(Ok(value)) => parse_expires(&value)?,
            Some(Err(_)) => {
                return Err(AuthError::KeyFetchMalformed(
                    "Expires header is not valid text".to_string(),
                ))
            }
            None => {
                tracing::error!(target: "idv.auth.keys", "Key endpoint response has no Expires header");
                return Err(AuthError::KeyFetchMalformed(
                    "missing Expires header".to_string(),
                ));
            }
        };

        let body = response.bytes().await.map_err(|e| {
            tracing::error!(target: "idv.auth.keys", error = %e, "Failed to read key set body");
            AuthError::KeyFetchFailed(e.to_string())
        })?;

        let jwks: JwksResponse = serde_json::from_slice(&body).map_err(|e| {
            tracing::error!(target: "idv.auth.keys", error = %e, "Failed to parse key set response");
            AuthError::KeyFetchMalformed(format!("invalid key set document: {}", e))
        })?;

        let keys: HashMap<String, Arc<SigningKey>> = parse_key_set(&jwks)?
            .into_iter()
            .map(|(kid, key)| (kid, Arc::new(key)))
            .collect();

        tracing::info!(
            target: "idv.auth.keys",
            key_count = keys.len(),
            expires_at = %expires_at,
            "Key set refreshed"
        );

        Ok(KeySet { keys, expires_at })
    }
}

/// Parse an HTTP `Expires` value (RFC 1123, e.g. `Wed, 21 Oct 2015 07:28:00 GMT`).
pub fn parse_expires(value: &str) -> Result<DateTime<Utc>, AuthError> {
    DateTime::parse_from_rfc2822(value.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            tracing::error!(target: "idv.auth.keys", value = %value, error = %e, "Unparsable Expires header");
            AuthError::KeyFetchMalformed(format!("invalid Expires header \"{}\"", value))
        })
}
