use crate::errors::JwksError;
use crate::models::{KeySelection, TokenResponse};
use crate::observability::metrics::record_error;
use crate::routes::AppState;
use crate::services::token_service;
use axum::{
    extract::{Query, State},
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, instrument};

#[derive(Debug, Default, Deserialize)]
pub struct TokenQuery {
    /// Presence (any value, including empty) selects the expired demo key.
    #[serde(default)]
    pub expired: Option<String>,
}

impl TokenQuery {
    pub fn key_selection(&self) -> KeySelection {
        if self.expired.is_some() {
            KeySelection::Expired
        } else {
            KeySelection::Active
        }
    }
}

/// Handle token request
///
/// POST /auth
/// POST /auth?expired
///
/// Signing and any lazy key rotation run on the blocking pool; RSA key
/// generation is CPU-bound.
#[instrument(name = "jwks.auth.token", skip_all, fields(key, status))]
pub async fn handle_issue_token(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TokenQuery>,
) -> Result<Json<TokenResponse>, JwksError> {
    let selection = query.key_selection();
    tracing::Span::current().record("key", selection.as_str());

    let store = Arc::clone(&state.key_store);
    let subject = state.config.token_subject.clone();
    let lifetime = state.config.token_lifetime();

    let result = tokio::task::spawn_blocking(move || {
        token_service::issue_for_request(&store, selection, &subject, lifetime, Utc::now())
    })
    .await
    .map_err(|e| {
        error!(error = %e, "Token issuance task failed");
        JwksError::Internal
    })
    .and_then(|inner| inner);

    let status = if result.is_ok() { "success" } else { "error" };
    tracing::Span::current().record("status", status);

    result.map(Json).map_err(|e| {
        error!(error = %e, "Token issuance failed");
        record_error("issue_token", e.category(), e.status_code().as_u16());
        e
    })
}
