//! Integration tests for lazy key rotation over HTTP
//!
//! Uses a one-second rotation window and real sleeps; the store reads the
//! wall clock on every request.

use jwks_service::config::Config;
use jwks_test_utils::{verify_with_jwks, TestJwksServer, TokenAssertions, VerifyError};
use std::time::Duration;

fn short_window_config() -> Config {
    Config {
        rotation_window_seconds: 1,
        ..Config::default()
    }
}

/// Once the active key expires, the JWKS stops publishing it before anyone
/// asks for a token, and the next token request rotates.
#[tokio::test]
async fn test_token_request_rotates_expired_key() -> Result<(), anyhow::Error> {
    // Arrange
    let server = TestJwksServer::spawn_with_config(short_window_config()).await?;
    let token_before = server.request_token().await?;
    let jwks_before = server.fetch_jwks().await?;
    let old_kid = jwks_before.keys[0].kid.clone();
    token_before.assert_signed_by(&old_kid);

    // Act: let the active key expire
    tokio::time::sleep(Duration::from_millis(1200)).await;

    // Assert: the stale key drops out of the JWKS without rotating
    let jwks_stale = server.fetch_jwks().await?;
    assert!(jwks_stale.keys.is_empty(), "expired active key must not be published");
    assert_eq!(server.generator().calls(), 2, "JWKS fetch must not rotate");

    // Assert: the next token request rotates to a fresh key
    let token_after = server.request_token().await?;
    let jwks_after = server.fetch_jwks().await?;
    assert_eq!(jwks_after.keys.len(), 1);
    let new_kid = jwks_after.keys[0].kid.clone();
    assert_ne!(new_kid, old_kid);

    token_after.assert_valid_jwt().assert_signed_by(&new_kid);
    verify_with_jwks(&token_after, &jwks_after)?;
    assert_eq!(server.generator().calls(), 3);
    assert_eq!(server.key_store().retired_key_count(), 1);

    Ok(())
}

/// A token signed before rotation can no longer be verified afterwards;
/// its key is retired and not published.
#[tokio::test]
async fn test_pre_rotation_token_has_no_published_key() -> Result<(), anyhow::Error> {
    let server = TestJwksServer::spawn_with_config(short_window_config()).await?;
    let token_before = server.request_token().await?;

    tokio::time::sleep(Duration::from_millis(1200)).await;
    server.request_token().await?;

    let jwks = server.fetch_jwks().await?;
    assert!(matches!(
        verify_with_jwks(&token_before, &jwks),
        Err(VerifyError::UnknownKid(_))
    ));

    Ok(())
}

/// The deliberately-expired key is unaffected by rotation.
#[tokio::test]
async fn test_rotation_keeps_expired_key() -> Result<(), anyhow::Error> {
    let server = TestJwksServer::spawn_with_config(short_window_config()).await?;
    let expired_kid = server.key_store().deliberately_expired_key().id().to_string();

    tokio::time::sleep(Duration::from_millis(1200)).await;
    server.request_token().await?;

    server
        .request_expired_token()
        .await?
        .assert_signed_by(&expired_kid);

    Ok(())
}
