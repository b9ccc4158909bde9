//! Liveness check.

/// Handler for GET /healthz
///
/// Always 200 while the process can serve HTTP. The key store is built
/// before the listener binds, so a running server always has keys.
pub async fn health_check() -> &'static str {
    "ok"
}
