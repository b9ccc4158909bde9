//! Observability for the JWKS issuer
//!
//! # Privacy by Default
//!
//! Handlers use `#[instrument(skip_all)]` and record only safe fields:
//! - **SAFE**: key IDs, key selection, status, error category
//! - **HASHED**: token subjects (see [`hash_for_correlation`])
//! - **NEVER**: private key material, issued tokens

pub mod metrics;

use sha2::{Digest, Sha256};

/// Hash a field value for correlation in logs (SHA-256, first 8 hex chars)
///
/// This is a one-way hash for correlating log lines, not protection for
/// secrets.
pub fn hash_for_correlation(value: &str) -> String {
    let digest = Sha256::digest(value.as_bytes());
    hex::encode(digest.get(..4).unwrap_or_default())
}
