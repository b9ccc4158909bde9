use serde::{Deserialize, Serialize};

/// Token response for `POST /auth`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

/// JWKS response (RFC 7517)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Jwks {
    pub keys: Vec<JsonWebKey>,
}

/// JSON Web Key (RFC 7517) for an RSA verification key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonWebKey {
    pub kty: String, // Key Type ("RSA")
    pub n: String,   // Modulus (base64url, no padding)
    pub e: String,   // Public exponent (base64url, no padding)
    pub alg: String, // Algorithm ("RS256")
    #[serde(rename = "use")]
    pub use_: String, // Public key use ("sig")
    pub kid: String, // Key ID
}

/// Which key the token endpoint signs with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySelection {
    /// The store's active signing key (rotated lazily).
    Active,
    /// The store's permanently-expired demo key.
    Expired,
}

impl KeySelection {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeySelection::Active => "active",
            KeySelection::Expired => "expired",
        }
    }
}
