//! JWKS Issuer Library
//!
//! Issues RS256-signed JWTs from an in-memory RSA key store that rotates
//! lazily, and publishes the matching public keys as a JWKS document.
//!
//! # Modules
//!
//! - `config` - Service configuration
//! - `crypto` - RSA key generation, JWT signing, JWK encoding
//! - `errors` - Error types
//! - `handlers` - HTTP request handlers
//! - `middleware` - HTTP metrics middleware
//! - `models` - Wire types
//! - `observability` - Metrics and log correlation helpers
//! - `routes` - Router and shared state
//! - `services` - Key store and token issuance

pub mod config;
pub mod crypto;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod routes;
pub mod services;
