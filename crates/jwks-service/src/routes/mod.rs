//! HTTP routes for the JWKS issuer.
//!
//! Defines the Axum router and application state.

use crate::config::Config;
use crate::handlers;
use crate::middleware::http_metrics_middleware;
use crate::services::key_store::KeyStore;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Request timeout. Generous enough to cover a lazy rotation at 4096 bits.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Signing and verification keys. Shared by every request.
    pub key_store: Arc<KeyStore>,

    /// Service configuration.
    pub config: Config,
}

/// Build the application routes.
///
/// - `POST /auth` - issue a token (`?expired` for the deliberately-expired key)
/// - `GET /.well-known/jwks.json` - currently valid public keys
/// - `GET /healthz` - liveness check
/// - `GET /metrics` - Prometheus scrape endpoint
///
/// Any other method on a known path gets axum's 405.
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let api_routes = Router::new()
        .route("/auth", post(handlers::handle_issue_token))
        .route("/.well-known/jwks.json", get(handlers::handle_get_jwks))
        .route("/healthz", get(handlers::health_check))
        .with_state(state);

    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    // Layers run bottom-to-top: metrics outermost so 404/405/408 are counted
    api_routes
        .merge(metrics_routes)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(middleware::from_fn(http_metrics_middleware))
}
