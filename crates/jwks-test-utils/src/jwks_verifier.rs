//! Verify tokens against a published JWKS document, the way a relying party
//! would: pick the key by `kid`, rebuild it from `n`/`e`, check RS256.

use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use jwks_service::crypto::Claims;
use jwks_service::models::Jwks;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VerifyError {
    #[error("Token header unreadable: {0}")]
    Header(jsonwebtoken::errors::Error),

    #[error("Token header has no kid")]
    MissingKid,

    #[error("No published key with kid {0}")]
    UnknownKid(String),

    #[error("Published key unusable: {0}")]
    BadKey(jsonwebtoken::errors::Error),

    #[error("Token rejected: {0}")]
    Rejected(jsonwebtoken::errors::Error),
}

impl VerifyError {
    /// True when the signature checked out but the token is past `exp`.
    pub fn is_expired(&self) -> bool {
        matches!(
            self,
            VerifyError::Rejected(e)
                if matches!(e.kind(), jsonwebtoken::errors::ErrorKind::ExpiredSignature)
        )
    }
}

/// Verify signature and expiry (no leeway).
pub fn verify_with_jwks(token: &str, jwks: &Jwks) -> Result<Claims, VerifyError> {
    verify(token, jwks, true)
}

/// Verify signature only, ignoring `exp`.
pub fn verify_signature_with_jwks(token: &str, jwks: &Jwks) -> Result<Claims, VerifyError> {
    verify(token, jwks, false)
}

fn verify(token: &str, jwks: &Jwks, validate_exp: bool) -> Result<Claims, VerifyError> {
    let header = decode_header(token).map_err(VerifyError::Header)?;
    let kid = header.kid.ok_or(VerifyError::MissingKid)?;

    let jwk = jwks
        .keys
        .iter()
        .find(|key| key.kid == kid)
        .ok_or(VerifyError::UnknownKid(kid))?;

    let decoding_key =
        DecodingKey::from_rsa_components(&jwk.n, &jwk.e).map_err(VerifyError::BadKey)?;

    let mut validation = Validation::new(Algorithm::RS256);
    validation.leeway = 0;
    validation.validate_exp = validate_exp;
    validation.required_spec_claims.clear();
    if validate_exp {
        validation.required_spec_claims.insert("exp".to_string());
    }

    decode::<Claims>(token, &decoding_key, &validation)
        .map(|data| data.claims)
        .map_err(VerifyError::Rejected)
}
