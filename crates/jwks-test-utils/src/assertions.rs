//! Custom test assertions for expressive tests
//!
//! Structural checks on issued tokens. These decode without verifying the
//! signature; use [`crate::jwks_verifier`] for signature checks.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::Deserialize;

/// JWT header structure
#[derive(Debug, Deserialize)]
struct JwtHeader {
    pub alg: String,
    pub typ: String,
    #[serde(default)]
    pub kid: Option<String>,
}

/// JWT claims structure
#[derive(Debug, Deserialize)]
struct JwtClaims {
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
}

/// Custom assertions for issued tokens
///
/// # Example
/// ```rust,ignore
/// token
///     .assert_valid_jwt()
///     .assert_signed_by(&jwks.keys[0].kid)
///     .assert_for_subject("fake-user")
///     .assert_expires_in(900);
/// ```
pub trait TokenAssertions {
    /// Assert three-part structure, `alg: RS256`, `typ: JWT`, a `kid`, and
    /// `sub`/`iat`/`exp` claims
    fn assert_valid_jwt(&self) -> &Self;

    /// Assert that the token header names the specified key
    fn assert_signed_by(&self, key_id: &str) -> &Self;

    /// Assert that the token expires `seconds` from now (5 s tolerance)
    fn assert_expires_in(&self, seconds: i64) -> &Self;

    /// Assert that the token expired `seconds` ago (5 s tolerance)
    fn assert_expired_by(&self, seconds: i64) -> &Self;

    /// Assert that the token is for the specified subject
    fn assert_for_subject(&self, subject: &str) -> &Self;
}

fn segment(token: &str, index: usize) -> Vec<u8> {
    let part = token
        .split('.')
        .nth(index)
        .unwrap_or_else(|| panic!("JWT has no segment {}", index));
    URL_SAFE_NO_PAD
        .decode(part)
        .unwrap_or_else(|e| panic!("Failed to base64 decode JWT segment {}: {}", index, e))
}

fn header(token: &str) -> JwtHeader {
    serde_json::from_slice(&segment(token, 0)).expect("Failed to parse JWT header")
}

fn claims(token: &str) -> JwtClaims {
    serde_json::from_slice(&segment(token, 1)).expect("Failed to parse JWT claims")
}

fn seconds_until_expiry(token: &str) -> i64 {
    claims(token).exp - chrono::Utc::now().timestamp()
}

impl TokenAssertions for String {
    fn assert_valid_jwt(&self) -> &Self {
        let parts: Vec<_> = self.split('.').collect();
        assert_eq!(
            parts.len(),
            3,
            "JWT must have 3 parts (header.payload.signature), got {}",
            parts.len()
        );

        let header = header(self);
        assert_eq!(header.alg, "RS256", "Expected RS256 algorithm");
        assert_eq!(header.typ, "JWT", "Expected JWT type");
        assert!(header.kid.is_some(), "Expected a kid in the JWT header");

        let claims = claims(self);
        assert!(
            claims.iat > 0,
            "Expected a positive iat, got {}",
            claims.iat
        );

        self
    }

    fn assert_signed_by(&self, key_id: &str) -> &Self {
        let header = header(self);
        assert_eq!(
            header.kid.as_deref(),
            Some(key_id),
            "Expected key_id '{}', got {:?}",
            key_id,
            header.kid
        );

        self
    }

    fn assert_expires_in(&self, seconds: i64) -> &Self {
        let expires_in = seconds_until_expiry(self);

        // Allow 5-second tolerance for slow test machines
        assert!(
            (expires_in - seconds).abs() <= 5,
            "Expected token to expire in {} seconds, but expires in {} seconds",
            seconds,
            expires_in
        );

        self
    }

    fn assert_expired_by(&self, seconds: i64) -> &Self {
        let expired_by = -seconds_until_expiry(self);

        assert!(
            (expired_by - seconds).abs() <= 5,
            "Expected token to have expired {} seconds ago, but expired {} seconds ago",
            seconds,
            expired_by
        );

        self
    }

    fn assert_for_subject(&self, subject: &str) -> &Self {
        let claims = claims(self);
        assert_eq!(
            claims.sub, subject,
            "Expected subject '{}', got '{}'",
            subject, claims.sub
        );

        self
    }
}
