//! # JWKS Test Utilities
//!
//! Shared test utilities for the JWKS issuer.
//!
//! This crate provides:
//! - Fixed RSA key fixtures and a fixture-backed key generator
//! - Test token builder (TestTokenBuilder) for forged tokens
//! - Server test harness (TestJwksServer for E2E tests)
//! - Relying-party style verification against a JWKS document
//! - Custom assertions (TokenAssertions trait)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use jwks_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() -> anyhow::Result<()> {
//!     let server = TestJwksServer::spawn().await?;
//!     let token = server.request_token().await?;
//!     let jwks = server.fetch_jwks().await?;
//!
//!     token.assert_valid_jwt().assert_signed_by(&jwks.keys[0].kid);
//!     verify_with_jwks(&token, &jwks)?;
//!     Ok(())
//! }
//! ```

pub mod assertions;
pub mod crypto_fixtures;
pub mod jwks_verifier;
pub mod server_harness;
pub mod token_builders;

// Re-export commonly used items
pub use assertions::*;
pub use crypto_fixtures::*;
pub use jwks_verifier::*;
pub use server_harness::*;
pub use token_builders::*;
