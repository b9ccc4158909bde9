//! Integration tests for `POST /auth`
//!
//! Tokens are checked the way a relying party would check them: fetch the
//! JWKS, pick the key by `kid`, verify the RS256 signature and expiry.

use jwks_service::config::Config;
use jwks_test_utils::{
    verify_signature_with_jwks, verify_with_jwks, TestJwksServer, TokenAssertions, VerifyError,
};
use reqwest::StatusCode;

// ============================================================================
// Active key
// ============================================================================

/// A freshly issued token verifies against the published JWKS.
#[tokio::test]
async fn test_issued_token_verifies_against_jwks() -> Result<(), anyhow::Error> {
    // Arrange
    let server = TestJwksServer::spawn().await?;

    // Act
    let token = server.request_token().await?;
    let jwks = server.fetch_jwks().await?;

    // Assert
    assert_eq!(jwks.keys.len(), 1, "only the active key is published");
    token
        .assert_valid_jwt()
        .assert_signed_by(&jwks.keys[0].kid)
        .assert_for_subject("fake-user")
        .assert_expires_in(server.config().token_lifetime_seconds);

    let claims = verify_with_jwks(&token, &jwks)?;
    assert_eq!(claims.sub, "fake-user");
    assert_eq!(
        claims.exp - claims.iat,
        server.config().token_lifetime_seconds
    );

    Ok(())
}

/// Subject and lifetime follow configuration.
#[tokio::test]
async fn test_token_uses_configured_subject_and_lifetime() -> Result<(), anyhow::Error> {
    let config = Config {
        token_subject: "svc-demo".to_string(),
        token_lifetime_seconds: 120,
        ..Config::default()
    };
    let server = TestJwksServer::spawn_with_config(config).await?;

    let token = server.request_token().await?;

    token
        .assert_valid_jwt()
        .assert_for_subject("svc-demo")
        .assert_expires_in(120);

    Ok(())
}

/// Within one rotation window every token carries the same `kid`.
#[tokio::test]
async fn test_consecutive_tokens_share_active_key() -> Result<(), anyhow::Error> {
    let server = TestJwksServer::spawn().await?;

    let first = server.request_token().await?;
    let second = server.request_token().await?;
    let active_kid = server.key_store().verification_keys(chrono::Utc::now())[0]
        .kid
        .clone();

    first.assert_signed_by(&active_kid);
    second.assert_signed_by(&active_kid);
    assert_eq!(server.generator().calls(), 2, "no rotation: active + expired only");

    Ok(())
}

// ============================================================================
// Deliberately-expired key
// ============================================================================

/// `?expired` signs with the expired key, whose public half is not published,
/// and the token itself is already past `exp`.
#[tokio::test]
async fn test_expired_flag_issues_unverifiable_token() -> Result<(), anyhow::Error> {
    // Arrange
    let server = TestJwksServer::spawn().await?;
    let expired_kid = server.key_store().deliberately_expired_key().id().to_string();

    // Act
    let token = server.request_expired_token().await?;
    let jwks = server.fetch_jwks().await?;

    // Assert
    token
        .assert_valid_jwt()
        .assert_signed_by(&expired_kid)
        .assert_for_subject("fake-user")
        .assert_expired_by(server.config().token_lifetime_seconds);

    assert!(
        jwks.keys.iter().all(|key| key.kid != expired_kid),
        "expired key must not be published"
    );
    assert!(matches!(
        verify_with_jwks(&token, &jwks),
        Err(VerifyError::UnknownKid(kid)) if kid == expired_kid
    ));

    Ok(())
}

/// The flag only needs to be present; any value selects the expired key.
#[tokio::test]
async fn test_expired_flag_with_value() -> Result<(), anyhow::Error> {
    let server = TestJwksServer::spawn().await?;
    let expired_kid = server.key_store().deliberately_expired_key().id().to_string();

    let response = server
        .client()
        .post(format!("{}/auth?expired=false", server.url()))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json().await?;
    let token = body["token"].as_str().unwrap_or_default().to_string();
    token.assert_signed_by(&expired_kid);

    Ok(())
}

/// Every expired-flag request reuses the same expired key.
#[tokio::test]
async fn test_expired_key_is_stable() -> Result<(), anyhow::Error> {
    let server = TestJwksServer::spawn().await?;
    let expired_kid = server.key_store().deliberately_expired_key().id().to_string();

    for _ in 0..3 {
        server.request_expired_token().await?.assert_signed_by(&expired_kid);
    }

    Ok(())
}

/// A forged JWKS containing the expired key shows the token fails only on
/// `exp`, not on signature.
#[tokio::test]
async fn test_expired_token_signature_is_valid() -> Result<(), anyhow::Error> {
    let server = TestJwksServer::spawn().await?;
    let expired = server.key_store().deliberately_expired_key();
    let jwks = jwks_service::models::Jwks {
        keys: vec![expired.verification_key().to_jwk()],
    };

    let token = server.request_expired_token().await?;

    assert!(verify_with_jwks(&token, &jwks)
        .err()
        .is_some_and(|e| e.is_expired()));
    verify_signature_with_jwks(&token, &jwks)?;

    Ok(())
}

// ============================================================================
// Method handling
// ============================================================================

#[tokio::test]
async fn test_get_auth_is_method_not_allowed() -> Result<(), anyhow::Error> {
    let server = TestJwksServer::spawn().await?;

    let response = server
        .client()
        .get(format!("{}/auth", server.url()))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);

    Ok(())
}
