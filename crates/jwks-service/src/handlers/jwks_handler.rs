use crate::errors::JwksError;
use crate::models::Jwks;
use crate::observability::metrics::{record_error, record_jwks_request, set_published_keys};
use crate::routes::AppState;
use axum::{
    extract::State,
    http::header::{HeaderMap, HeaderValue, CACHE_CONTROL},
    Json,
};
use chrono::Utc;
use std::sync::Arc;
use tracing::{error, instrument};

/// Handle JWKS request
///
/// GET /.well-known/jwks.json
///
/// Returns every public key whose expiry is still in the future, in JWKS
/// format (RFC 7517). Never rotates; a stale active key is simply omitted
/// until the next token request replaces it.
#[instrument(name = "jwks.keys.get", skip_all, fields(key_count, status))]
pub async fn handle_get_jwks(
    State(state): State<Arc<AppState>>,
) -> Result<(HeaderMap, Json<Jwks>), JwksError> {
    record_jwks_request();

    // The store lock can be held by an in-progress rotation
    let store = Arc::clone(&state.key_store);
    let keys = tokio::task::spawn_blocking(move || store.verification_keys(Utc::now()))
        .await
        .map_err(|e| {
            error!(error = %e, "JWKS snapshot task failed");
            tracing::Span::current().record("status", "error");
            let err = JwksError::Internal;
            record_error("get_jwks", err.category(), err.status_code().as_u16());
            err
        })?;

    let jwks = Jwks {
        keys: keys.iter().map(|key| key.to_jwk()).collect(),
    };

    set_published_keys(jwks.keys.len());
    tracing::Span::current().record("key_count", jwks.keys.len());
    tracing::Span::current().record("status", "success");

    let mut headers = HeaderMap::new();
    let cache_control = format!("max-age={}", state.config.jwks_max_age_seconds);
    if let Ok(value) = HeaderValue::from_str(&cache_control) {
        headers.insert(CACHE_CONTROL, value);
    }

    Ok((headers, Json(jwks)))
}
