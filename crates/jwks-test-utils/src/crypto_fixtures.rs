//! Fixed RSA key fixtures for testing
//!
//! Generating a 2048-bit RSA key takes long enough to dominate a test run,
//! so tests load pre-generated PKCS#1 PEM keys from `fixtures/` instead.
//! The fixtures are test-only material and must never be deployed.

use jwks_service::errors::JwksError;
use jwks_service::services::key_store::KeyGenerator;
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::RsaPrivateKey;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use thiserror::Error;

/// Number of fixture keys shipped in `fixtures/`.
pub const FIXTURE_KEY_COUNT: usize = 3;

const FIXTURE_PEMS: [&str; FIXTURE_KEY_COUNT] = [
    include_str!("../fixtures/signing_key_1.pem"),
    include_str!("../fixtures/signing_key_2.pem"),
    include_str!("../fixtures/signing_key_3.pem"),
];

/// Test fixture error type
#[derive(Error, Debug)]
pub enum FixtureError {
    #[error("No fixture key with index {0}")]
    UnknownKey(usize),

    #[error("Fixture key failed to parse: {0}")]
    Parse(String),
}

/// Load fixture key `index` (1-based, matching the file names).
///
/// # Example
/// ```rust,ignore
/// let key = test_signing_key(1)?;
/// assert_eq!(key, test_signing_key(1)?);
/// ```
pub fn test_signing_key(index: usize) -> Result<RsaPrivateKey, FixtureError> {
    let pem = index
        .checked_sub(1)
        .and_then(|i| FIXTURE_PEMS.get(i))
        .ok_or(FixtureError::UnknownKey(index))?;

    RsaPrivateKey::from_pkcs1_pem(pem).map_err(|e| FixtureError::Parse(e.to_string()))
}

/// [`KeyGenerator`] that hands out the fixture keys round-robin.
///
/// Counts calls so tests can assert how many rotations happened, and can be
/// flipped into a failing mode to simulate an unavailable entropy source.
#[derive(Debug, Default)]
pub struct FixtureKeyGenerator {
    calls: AtomicUsize,
    failing: AtomicBool,
}

impl FixtureKeyGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful `generate` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl KeyGenerator for FixtureKeyGenerator {
    fn generate(&self) -> Result<RsaPrivateKey, JwksError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(JwksError::KeyGeneration(
                "fixture generator set to fail".to_string(),
            ));
        }

        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        test_signing_key(call % FIXTURE_KEY_COUNT + 1)
            .map_err(|e| JwksError::KeyGeneration(e.to_string()))
    }
}
