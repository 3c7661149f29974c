//! Metrics definitions for the identity verifier.
//!
//! All metrics follow Prometheus naming conventions:
//! - `idv_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded by code:
//! - `outcome`: `success` or one of the `AuthError::kind()` labels (10 values)
//! - `status`: `success` or a key-fetch error kind (3 values)

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize the Prometheus recorder and return the handle for `/metrics`.
///
/// Must be called before any metrics are recorded.
///
/// # Errors
///
/// Returns error if the recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        // Key set refresh is an outbound HTTPS call to the provider
        .set_buckets_for_metric(
            Matcher::Prefix("idv_jwks_refresh".to_string()),
            &[0.010, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500, 5.000, 10.000],
        )
        .map_err(|e| format!("Failed to set JWKS refresh buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus metrics recorder: {e}"))
}

/// Record the outcome of one token verification.
///
/// Metric: `idv_token_verifications_total`
/// Labels: `outcome`
pub fn record_token_verification(outcome: &'static str) {
    counter!("idv_token_verifications_total", "outcome" => outcome).increment(1);
}

/// Record a key set refresh attempt.
///
/// Metric: `idv_jwks_refresh_total`, `idv_jwks_refresh_duration_seconds`
/// Labels: `status`
pub fn record_jwks_refresh(status: &'static str, duration: Duration) {
    counter!("idv_jwks_refresh_total", "status" => status).increment(1);
    histogram!("idv_jwks_refresh_duration_seconds", "status" => status)
        .record(duration.as_secs_f64());
}
