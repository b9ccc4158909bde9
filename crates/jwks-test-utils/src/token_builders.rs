//! Builder for forged test tokens
//!
//! Signs arbitrary claims with an arbitrary key, so tests can produce tokens
//! the service never issued (unknown `kid`, wrong key, odd timestamps).

use crate::crypto_fixtures::test_signing_key;
use chrono::{Duration, Utc};
use jwks_service::crypto::{encoding_key, sign_jwt, Claims};
use rsa::RsaPrivateKey;

/// Builder for test JWTs
///
/// # Example
/// ```rust,ignore
/// let token = TestTokenBuilder::new()
///     .for_subject("alice")
///     .with_kid("not-a-published-kid")
///     .expires_in(3600)
///     .sign_with_fixture(2)?;
/// ```
#[derive(Debug, Clone)]
pub struct TestTokenBuilder {
    sub: String,
    kid: String,
    iat: i64,
    exp: i64,
}

impl TestTokenBuilder {
    /// Create a new token builder with defaults
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            sub: "test-subject".to_string(),
            kid: "test-kid".to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::seconds(3600)).timestamp(),
        }
    }

    pub fn for_subject(mut self, subject: &str) -> Self {
        self.sub = subject.to_string();
        self
    }

    pub fn with_kid(mut self, kid: &str) -> Self {
        self.kid = kid.to_string();
        self
    }

    /// Set expiration in seconds from now (negative for already expired)
    pub fn expires_in(mut self, seconds: i64) -> Self {
        self.exp = (Utc::now() + Duration::seconds(seconds)).timestamp();
        self
    }

    pub fn issued_at(mut self, timestamp: i64) -> Self {
        self.iat = timestamp;
        self
    }

    pub fn claims(&self) -> Claims {
        Claims {
            sub: self.sub.clone(),
            iat: self.iat,
            exp: self.exp,
        }
    }

    /// Sign with `key`, RS256.
    pub fn sign_with(&self, key: &RsaPrivateKey) -> Result<String, anyhow::Error> {
        Ok(sign_jwt(&self.claims(), &encoding_key(key)?, &self.kid)?)
    }

    /// Sign with fixture key `index`.
    pub fn sign_with_fixture(&self, index: usize) -> Result<String, anyhow::Error> {
        let key = test_signing_key(index)?;
        self.sign_with(&key)
    }
}

impl Default for TestTokenBuilder {
    fn default() -> Self {
        Self::new()
    }
}
