use crate::errors::JwksError;
use crate::models::JsonWebKey;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use rand::rngs::OsRng;
use rsa::pkcs1::EncodeRsaPrivateKey;
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::instrument;

/// Signature algorithm for every issued token and published key.
pub const SIGNING_ALGORITHM: Algorithm = Algorithm::RS256;

/// `alg` value published in the JWKS.
pub const JWK_ALGORITHM: &str = "RS256";

/// `kty` value published in the JWKS.
pub const JWK_KEY_TYPE: &str = "RSA";

/// `use` value published in the JWKS.
pub const JWK_KEY_USE: &str = "sig";

/// JWT Claims structure.
///
/// The `sub` field identifies the token holder and should not be exposed in
/// logs. A custom Debug implementation redacts it.
#[derive(Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // Subject
    pub iat: i64,    // Issued at timestamp
    pub exp: i64,    // Expiration timestamp
}

impl fmt::Debug for Claims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Claims")
            .field("sub", &"[REDACTED]")
            .field("iat", &self.iat)
            .field("exp", &self.exp)
            .finish()
    }
}

/// Generate an RSA private key of `bits` modulus size using the OS CSPRNG.
///
/// The public exponent is fixed at 65537.
#[instrument(skip_all, fields(bits = bits))]
pub fn generate_rsa_key(bits: usize) -> Result<RsaPrivateKey, JwksError> {
    RsaPrivateKey::new(&mut OsRng, bits)
        .map_err(|e| JwksError::KeyGeneration(format!("RSA key generation failed: {}", e)))
}

/// Encode an RSA private key for signing.
///
/// Done once per key pair; the result is reused for every token it signs.
pub fn encoding_key(private_key: &RsaPrivateKey) -> Result<EncodingKey, JwksError> {
    let der = private_key
        .to_pkcs1_der()
        .map_err(|e| JwksError::KeyGeneration(format!("Private key encoding failed: {}", e)))?;
    Ok(EncodingKey::from_rsa_der(der.as_bytes()))
}

/// Sign JWT with an RSA encoding key (RS256).
///
/// The header carries `typ: JWT` and the `kid` relying parties use to pick
/// the matching verification key.
#[instrument(skip_all)]
pub fn sign_jwt(
    claims: &Claims,
    encoding_key: &EncodingKey,
    key_id: &str,
) -> Result<String, JwksError> {
    let mut header = Header::new(SIGNING_ALGORITHM);
    header.typ = Some("JWT".to_string());
    header.kid = Some(key_id.to_string());

    encode(&header, claims, encoding_key)
        .map_err(|e| JwksError::Signing(format!("JWT signing operation failed: {}", e)))
}

/// Encode an RSA public key as a JSON Web Key (RFC 7517 / RFC 7518 §6.3).
///
/// `n` and `e` are the unsigned big-endian magnitudes, base64url without padding.
pub fn public_jwk(public_key: &RsaPublicKey, key_id: &str) -> JsonWebKey {
    JsonWebKey {
        kty: JWK_KEY_TYPE.to_string(),
        n: URL_SAFE_NO_PAD.encode(public_key.n().to_bytes_be()),
        e: URL_SAFE_NO_PAD.encode(public_key.e().to_bytes_be()),
        alg: JWK_ALGORITHM.to_string(),
        use_: JWK_KEY_USE.to_string(),
        kid: key_id.to_string(),
    }
}
