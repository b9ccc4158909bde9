use crate::crypto::{self, Claims};
use crate::errors::JwksError;
use crate::models::{KeySelection, TokenResponse};
use crate::observability::hash_for_correlation;
use crate::observability::metrics::record_token_issuance;
use crate::services::key_store::{KeyPair, KeyStore};
use chrono::{DateTime, Duration, Utc};
use std::time::Instant;
use tracing::instrument;

/// Sign a token for `subject` with the supplied key pair.
///
/// Does not check that the pair or the resulting token is unexpired; callers
/// decide which key to use.
#[instrument(skip_all, fields(key_id = %key_pair.id()))]
pub fn issue(
    key_pair: &KeyPair,
    subject: &str,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
) -> Result<String, JwksError> {
    let claims = Claims {
        sub: subject.to_string(),
        iat: issued_at.timestamp(),
        exp: expires_at.timestamp(),
    };

    crypto::sign_jwt(&claims, key_pair.encoding_key(), key_pair.id())
}

/// Issue a token the way `POST /auth` does.
///
/// `Active` signs with the store's active key (rotating if needed) and expires
/// `token_lifetime` after `now`. `Expired` signs with the deliberately-expired
/// key and expires `token_lifetime` before `now`.
#[instrument(skip_all, fields(key = selection.as_str(), subject_hash = %hash_for_correlation(subject), status))]
pub fn issue_for_request(
    store: &KeyStore,
    selection: KeySelection,
    subject: &str,
    token_lifetime: Duration,
    now: DateTime<Utc>,
) -> Result<TokenResponse, JwksError> {
    let start = Instant::now();

    let result = select_key(store, selection, now).and_then(|key_pair| {
        let expires_at = match selection {
            KeySelection::Active => now.checked_add_signed(token_lifetime),
            KeySelection::Expired => now.checked_sub_signed(token_lifetime),
        }
        .ok_or_else(|| {
            tracing::error!("Token expiry is outside the representable time range");
            JwksError::Internal
        })?;
        tracing::debug!(key_id = %key_pair.id(), exp = expires_at.timestamp(), "Signing token");
        issue(&key_pair, subject, now, expires_at)
    });

    let status = if result.is_ok() { "success" } else { "error" };
    tracing::Span::current().record("status", status);
    record_token_issuance(selection.as_str(), status, start.elapsed());

    result.map(|token| TokenResponse { token })
}

fn select_key(
    store: &KeyStore,
    selection: KeySelection,
    now: DateTime<Utc>,
) -> Result<std::sync::Arc<KeyPair>, JwksError> {
    match selection {
        KeySelection::Active => store.active_signing_key(now),
        KeySelection::Expired => Ok(store.deliberately_expired_key()),
    }
}
