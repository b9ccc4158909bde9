//! Test server harness for E2E testing
//!
//! Provides TestJwksServer for spawning real JWKS issuer instances in tests.

use crate::crypto_fixtures::FixtureKeyGenerator;
use chrono::Utc;
use jwks_service::config::Config;
use jwks_service::models::{Jwks, TokenResponse};
use jwks_service::routes::{self, AppState};
use jwks_service::services::key_store::{KeyStore, RotationPolicy};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use tokio::task::JoinHandle;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// One recorder per test process. Installing globally fails on the second
/// attempt, so later servers share the first handle.
fn metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            jwks_service::observability::metrics::init_metrics_recorder()
                .unwrap_or_else(|_| PrometheusBuilder::new().build_recorder().handle())
        })
        .clone()
}

/// Test harness for spawning the JWKS issuer in E2E tests
///
/// Keys come from [`FixtureKeyGenerator`], so startup and rotations are fast.
///
/// # Example
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_token_flow_e2e() -> Result<()> {
///     let server = TestJwksServer::spawn().await?;
///
///     let token = server.request_token().await?;
///     let jwks = server.fetch_jwks().await?;
///     verify_with_jwks(&token, &jwks)?;
///     Ok(())
/// }
/// ```
pub struct TestJwksServer {
    addr: SocketAddr,
    config: Config,
    key_store: Arc<KeyStore>,
    generator: Arc<FixtureKeyGenerator>,
    client: reqwest::Client,
    handle: JoinHandle<()>,
}

impl TestJwksServer {
    /// Spawn a server with default configuration
    pub async fn spawn() -> Result<Self, anyhow::Error> {
        Self::spawn_with_config(Config::default()).await
    }

    /// Spawn a server with the given configuration
    ///
    /// The server will:
    /// - Bind to a random available port (127.0.0.1:0), ignoring `bind_address`
    /// - Build its key store from fixture keys
    /// - Start the HTTP server in the background
    pub async fn spawn_with_config(mut config: Config) -> Result<Self, anyhow::Error> {
        config.bind_address = "127.0.0.1:0".to_string();

        let generator = Arc::new(FixtureKeyGenerator::new());
        let key_store = Arc::new(KeyStore::new(
            generator.clone(),
            RotationPolicy::from_config(&config),
            Utc::now(),
        )?);

        let state = Arc::new(AppState {
            key_store: Arc::clone(&key_store),
            config: config.clone(),
        });

        let app = routes::build_routes(state, metrics_handle());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            config,
            key_store,
            generator,
            client: reqwest::Client::new(),
            handle,
        })
    }

    /// Get the base URL of the test server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The store behind the running server
    pub fn key_store(&self) -> &Arc<KeyStore> {
        &self.key_store
    }

    /// The generator behind the store; use to count rotations or force failures
    pub fn generator(&self) -> &FixtureKeyGenerator {
        &self.generator
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// `POST /auth`, returning the token on 200
    pub async fn request_token(&self) -> Result<String, anyhow::Error> {
        self.post_auth("/auth").await
    }

    /// `POST /auth?expired`, returning the token on 200
    pub async fn request_expired_token(&self) -> Result<String, anyhow::Error> {
        self.post_auth("/auth?expired").await
    }

    /// `GET /.well-known/jwks.json`
    pub async fn fetch_jwks(&self) -> Result<Jwks, anyhow::Error> {
        let response = self
            .client
            .get(format!("{}/.well-known/jwks.json", self.url()))
            .send()
            .await?
            .error_for_status()?;

        Ok(response.json::<Jwks>().await?)
    }

    async fn post_auth(&self, path: &str) -> Result<String, anyhow::Error> {
        let response = self
            .client
            .post(format!("{}{}", self.url(), path))
            .send()
            .await?
            .error_for_status()?;

        Ok(response.json::<TokenResponse>().await?.token)
    }
}

impl Drop for TestJwksServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
