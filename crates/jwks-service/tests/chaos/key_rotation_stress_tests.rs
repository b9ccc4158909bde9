//! Chaos tests for concurrent requests across a rotation boundary
//!
//! Many clients hit `POST /auth` at once right after the active key expires.
//! Exactly one replacement must be generated and every token must carry it.

use jwks_service::config::Config;
use jwks_test_utils::{verify_with_jwks, TestJwksServer, TokenAssertions};
use std::collections::HashSet;
use std::time::Duration;

const CONCURRENT_REQUESTS: usize = 32;

/// Long enough that the freshly rotated key cannot also expire while the
/// burst is still in flight.
const ROTATION_WINDOW_SECONDS: i64 = 2;
const PAST_FIRST_EXPIRY: Duration = Duration::from_millis(2200);

fn rotating_config() -> Config {
    Config {
        rotation_window_seconds: ROTATION_WINDOW_SECONDS,
        ..Config::default()
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_trigger_single_rotation() -> Result<(), anyhow::Error> {
    // Arrange
    let server = TestJwksServer::spawn_with_config(rotating_config()).await?;
    tokio::time::sleep(PAST_FIRST_EXPIRY).await;

    // Act
    let mut tasks = tokio::task::JoinSet::new();
    for _ in 0..CONCURRENT_REQUESTS {
        let client = server.client().clone();
        let url = format!("{}/auth", server.url());
        tasks.spawn(async move {
            let response = client.post(url).send().await?.error_for_status()?;
            let body: serde_json::Value = response.json().await?;
            Ok::<_, anyhow::Error>(body["token"].as_str().unwrap_or_default().to_string())
        });
    }

    let mut tokens = Vec::with_capacity(CONCURRENT_REQUESTS);
    while let Some(joined) = tasks.join_next().await {
        tokens.push(joined??);
    }

    // Assert
    assert_eq!(tokens.len(), CONCURRENT_REQUESTS);
    assert_eq!(
        server.generator().calls(),
        3,
        "initial active + expired + exactly one rotation"
    );

    let jwks = server.fetch_jwks().await?;
    assert_eq!(jwks.keys.len(), 1);
    let new_kid = &jwks.keys[0].kid;

    let kids: HashSet<_> = tokens
        .iter()
        .map(|token| {
            token.assert_valid_jwt().assert_signed_by(new_kid);
            verify_with_jwks(token, &jwks).map(|_| new_kid.clone())
        })
        .collect::<Result<_, _>>()?;
    assert_eq!(kids.len(), 1);

    Ok(())
}

/// JWKS readers running alongside the rotating writers never see a
/// half-installed key: every snapshot is empty (stale key) or the new key.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_jwks_reads_during_rotation_are_consistent() -> Result<(), anyhow::Error> {
    let server = TestJwksServer::spawn_with_config(rotating_config()).await?;
    tokio::time::sleep(PAST_FIRST_EXPIRY).await;

    let mut tasks = tokio::task::JoinSet::new();
    for i in 0..CONCURRENT_REQUESTS {
        let client = server.client().clone();
        let base = server.url();
        tasks.spawn(async move {
            if i % 2 == 0 {
                client
                    .post(format!("{}/auth", base))
                    .send()
                    .await?
                    .error_for_status()?;
                Ok::<_, anyhow::Error>(None)
            } else {
                let jwks: jwks_service::models::Jwks = client
                    .get(format!("{}/.well-known/jwks.json", base))
                    .send()
                    .await?
                    .json()
                    .await?;
                Ok(Some(jwks.keys.into_iter().map(|k| k.kid).collect::<Vec<_>>()))
            }
        });
    }

    let mut snapshots = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        if let Some(kids) = joined?? {
            snapshots.push(kids);
        }
    }

    let final_kid = server.fetch_jwks().await?.keys[0].kid.clone();
    for kids in snapshots {
        assert!(
            kids.is_empty() || kids == vec![final_kid.clone()],
            "unexpected JWKS snapshot {:?}",
            kids
        );
    }
    assert_eq!(server.generator().calls(), 3);

    Ok(())
}
