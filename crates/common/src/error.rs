//! Common error types shared across crates.

use thiserror::Error;

/// Top-level service error type.
///
/// Variants map to HTTP status codes returned to callers:
/// - [`ServiceError::BadRequest`] → 400
/// - [`ServiceError::TokenNotFound`] → 404
/// - every server-side failure → 500
///
/// None of the variants are retried by the service itself.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// A required input was missing or empty, e.g. the token path parameter.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// No record exists for the requested token.
    #[error("token not found")]
    TokenNotFound,

    /// The cipher could not be constructed from the configured key.
    #[error("cipher initialisation failed: {0}")]
    CryptoInit(String),

    /// A stored payload (or token digest) is not valid hexadecimal.
    #[error("decode failure: {0}")]
    Decode(String),

    /// Ciphertext failed AEAD verification: tampered, truncated, or wrong key.
    #[error("ciphertext authentication failed")]
    Authentication,

    /// The persistence engine failed.
    #[error("store failure: {0}")]
    Store(String),

    /// An unexpected internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Returns the HTTP status code that should be sent for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            ServiceError::BadRequest(_) => 400,
            ServiceError::TokenNotFound => 404,
            ServiceError::CryptoInit(_)
            | ServiceError::Decode(_)
            | ServiceError::Authentication
            | ServiceError::Store(_)
            | ServiceError::Internal(_) => 500,
        }
    }

    /// Short machine-readable code used in [`crate::protocol::ErrorResponse`].
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::BadRequest(_) => "bad_request",
            ServiceError::TokenNotFound => "not_found",
            ServiceError::CryptoInit(_) => "crypto_init_error",
            ServiceError::Decode(_) => "decode_error",
            ServiceError::Authentication => "authentication_error",
            ServiceError::Store(_) => "store_error",
            ServiceError::Internal(_) => "internal_error",
        }
    }

    /// Returns `true` for failures on the service side (5xx).
    pub fn is_server_error(&self) -> bool {
        self.http_status() >= 500
    }
}
