//! Metrics definitions for the JWKS issuer
//!
//! All metrics follow Prometheus naming conventions:
//! - `jwks_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded:
//! - `key`: 2 values (active, expired)
//! - `status`: 2 values (success, error)
//! - `error_category`: 3 values (key_generation, signing, internal)
//! - `operation`: bounded by handlers (issue_token, get_jwks)
//! - `path`: normalized to the four served routes plus `other`

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize the Prometheus recorder and return the handle used by the
/// `/metrics` endpoint.
///
/// Token issuance buckets are wide enough to cover a lazy RSA rotation,
/// which can take over a second.
///
/// # Errors
///
/// Returns error if the recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("jwks_token_issuance_duration_seconds".to_string()),
            &[
                0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500, 5.000,
            ],
        )
        .map_err(|e| format!("Failed to set token issuance buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus metrics recorder: {e}"))
}

// ============================================================================
// HTTP Metrics
// ============================================================================

/// Record one HTTP request, including framework-level rejections (404, 405)
///
/// Metric: `jwks_http_requests_total`, `jwks_http_request_duration_seconds`
/// Labels: `method`, `path`, `status_code`
pub fn record_http_request(method: &str, path: &str, status_code: u16, duration: Duration) {
    let path = normalize_path(path);

    histogram!("jwks_http_request_duration_seconds",
        "method" => method.to_string(),
        "path" => path,
        "status_code" => status_code.to_string()
    )
    .record(duration.as_secs_f64());

    counter!("jwks_http_requests_total",
        "method" => method.to_string(),
        "path" => path,
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

/// Collapse request paths onto the served routes.
fn normalize_path(path: &str) -> &'static str {
    match path {
        "/auth" => "/auth",
        "/.well-known/jwks.json" => "/.well-known/jwks.json",
        "/healthz" => "/healthz",
        "/metrics" => "/metrics",
        _ => "other",
    }
}

// ============================================================================
// Token Metrics
// ============================================================================

/// Record token issuance duration and outcome
///
/// Metric: `jwks_token_issuance_duration_seconds`, `jwks_token_issuance_total`
/// Labels: `key`, `status`
pub fn record_token_issuance(key: &str, status: &str, duration: Duration) {
    histogram!("jwks_token_issuance_duration_seconds", "key" => key.to_string(), "status" => status.to_string())
        .record(duration.as_secs_f64());

    counter!("jwks_token_issuance_total", "key" => key.to_string(), "status" => status.to_string())
        .increment(1);
}

// ============================================================================
// Key Management Metrics
// ============================================================================

/// Record key rotation event
///
/// Metric: `jwks_key_rotation_total`
/// Labels: `status`
pub fn record_key_rotation(status: &str) {
    counter!("jwks_key_rotation_total", "status" => status.to_string()).increment(1);
}

/// Record key rotation last success timestamp
///
/// Metric: `jwks_key_rotation_last_success_timestamp`
pub fn set_key_rotation_last_success(timestamp_secs: i64) {
    // Epoch seconds fit an f64 mantissa exactly
    #[allow(clippy::cast_precision_loss)]
    gauge!("jwks_key_rotation_last_success_timestamp").set(timestamp_secs as f64);
}

/// Update the number of keys in the published JWKS
///
/// Metric: `jwks_published_keys`
pub fn set_published_keys(count: usize) {
    #[allow(clippy::cast_precision_loss)]
    gauge!("jwks_published_keys").set(count as f64);
}

// ============================================================================
// JWKS Metrics
// ============================================================================

/// Record JWKS document request
///
/// Metric: `jwks_requests_total`
pub fn record_jwks_request() {
    counter!("jwks_requests_total").increment(1);
}

// ============================================================================
// Error Metrics
// ============================================================================

/// Record error by category
///
/// Metric: `jwks_errors_total`
/// Labels: `operation`, `error_category`, `status_code`
pub fn record_error(operation: &str, error_category: &str, status_code: u16) {
    counter!("jwks_errors_total",
        "operation" => operation.to_string(),
        "error_category" => error_category.to_string(),
        "status_code" => status_code.to_string()
    )
    .increment(1);
}
