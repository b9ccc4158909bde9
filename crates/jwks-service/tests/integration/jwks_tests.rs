//! Integration tests for `GET /.well-known/jwks.json`

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use jwks_service::config::Config;
use jwks_test_utils::{TestJwksServer, TestTokenBuilder, VerifyError, verify_with_jwks};
use reqwest::{header::CACHE_CONTROL, StatusCode};
use rsa::traits::PublicKeyParts;

/// The document has the RFC 7517 shape and publishes exactly the active key.
#[tokio::test]
async fn test_jwks_document_shape() -> Result<(), anyhow::Error> {
    // Arrange
    let server = TestJwksServer::spawn().await?;

    // Act
    let response = server
        .client()
        .get(format!("{}/.well-known/jwks.json", server.url()))
        .send()
        .await?;

    // Assert
    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json().await?;
    let keys = body["keys"].as_array().expect("keys array");
    assert_eq!(keys.len(), 1);

    let key = &keys[0];
    assert_eq!(key["kty"], "RSA");
    assert_eq!(key["alg"], "RS256");
    assert_eq!(key["use"], "sig");
    assert_eq!(key["e"], "AQAB", "exponent 65537");
    assert!(key["kid"].as_str().is_some_and(|kid| !kid.is_empty()));
    assert!(key.get("d").is_none(), "private exponent must never be published");

    Ok(())
}

/// `n` is the unpadded base64url encoding of the big-endian modulus.
#[tokio::test]
async fn test_jwks_modulus_matches_active_key() -> Result<(), anyhow::Error> {
    let server = TestJwksServer::spawn().await?;
    let active = server.key_store().active_signing_key(chrono::Utc::now())?;

    let jwks = server.fetch_jwks().await?;

    let jwk = &jwks.keys[0];
    assert_eq!(jwk.kid, active.id());
    assert!(!jwk.n.contains('='), "no padding");
    assert_eq!(
        URL_SAFE_NO_PAD.decode(&jwk.n)?,
        active.public_key().n().to_bytes_be()
    );

    Ok(())
}

/// Fetching the JWKS never rotates and never changes the document.
#[tokio::test]
async fn test_jwks_is_stable_across_fetches() -> Result<(), anyhow::Error> {
    let server = TestJwksServer::spawn().await?;

    let first = server.fetch_jwks().await?;
    let second = server.fetch_jwks().await?;

    assert_eq!(first.keys, second.keys);
    assert_eq!(server.generator().calls(), 2);

    Ok(())
}

#[tokio::test]
async fn test_jwks_cache_control_follows_config() -> Result<(), anyhow::Error> {
    let config = Config {
        jwks_max_age_seconds: 60,
        ..Config::default()
    };
    let server = TestJwksServer::spawn_with_config(config).await?;

    let response = server
        .client()
        .get(format!("{}/.well-known/jwks.json", server.url()))
        .send()
        .await?;

    assert_eq!(
        response.headers().get(CACHE_CONTROL).map(|v| v.as_bytes()),
        Some(&b"max-age=60"[..])
    );

    Ok(())
}

/// A token signed by a key the service never held is rejected even when it
/// claims a published `kid`.
#[tokio::test]
async fn test_forged_token_with_published_kid_is_rejected() -> Result<(), anyhow::Error> {
    let server = TestJwksServer::spawn().await?;
    let jwks = server.fetch_jwks().await?;

    // Fixture 3 is never handed out before the third generation
    let forged = TestTokenBuilder::new()
        .for_subject("fake-user")
        .with_kid(&jwks.keys[0].kid)
        .sign_with_fixture(3)?;

    let err = verify_with_jwks(&forged, &jwks).unwrap_err();
    assert!(matches!(err, VerifyError::Rejected(_)));

    Ok(())
}

#[tokio::test]
async fn test_post_jwks_is_method_not_allowed() -> Result<(), anyhow::Error> {
    let server = TestJwksServer::spawn().await?;

    let response = server
        .client()
        .post(format!("{}/.well-known/jwks.json", server.url()))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);

    Ok(())
}
