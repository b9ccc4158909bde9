use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum JwksError {
    /// Secure random key generation failed. Raised by store initialization
    /// and lazy rotation; the store keeps its prior state.
    #[error("Key generation error: {0}")]
    KeyGeneration(String),

    /// Signing failed despite valid key material. Never touches store state.
    #[error("Signing error: {0}")]
    Signing(String),

    #[error("Internal server error")]
    Internal,
}

impl JwksError {
    /// Bounded label for metrics and logs.
    pub fn category(&self) -> &'static str {
        match self {
            JwksError::KeyGeneration(_) => "key_generation",
            JwksError::Signing(_) => "signing",
            JwksError::Internal => "internal",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            JwksError::KeyGeneration(_) => StatusCode::SERVICE_UNAVAILABLE,
            JwksError::Signing(_) | JwksError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

impl IntoResponse for JwksError {
    fn into_response(self) -> Response {
        let (code, message) = match &self {
            JwksError::KeyGeneration(_) => (
                "KEY_UNAVAILABLE",
                "No signing key is currently available. Please try again later.",
            ),
            JwksError::Signing(_) => ("SIGNING_ERROR", "Failed to sign token"),
            JwksError::Internal => ("INTERNAL_ERROR", "An internal error occurred"),
        };

        let error_response = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message: message.to_string(),
            },
        };

        (self.status_code(), Json(error_response)).into_response()
    }
}
