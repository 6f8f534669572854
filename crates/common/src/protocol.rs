//! Request and response types exchanged over the public HTTP API.

use serde::{Deserialize, Serialize};

/// Open key-value bag of caller-supplied attributes, stored and returned verbatim.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

// ---------------------------------------------------------------------------
// Create endpoint
// ---------------------------------------------------------------------------

/// Caller-supplied fields of a token record.
///
/// Everything except `payload` is opaque to the vault: `token_type` is a free-form
/// classification, `ttl` a hint the vault does not enforce.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewToken {
    /// The sensitive content. Plaintext on input, ciphertext hex at rest.
    pub payload: String,
    /// Classification such as `"access"` or `"refresh"`.
    #[serde(default)]
    pub token_type: String,
    /// Time-to-live hint in seconds.
    #[serde(default)]
    pub ttl: i64,
    #[serde(default)]
    pub metadata: Metadata,
}

/// Request body for `POST /token`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTokenRequest {
    pub data: NewToken,
}

/// Successful response body for `POST /token`. Carries only the token string.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTokenResponse {
    pub token: String,
}

// ---------------------------------------------------------------------------
// Error response
// ---------------------------------------------------------------------------

/// Standard error response body returned on any non-2xx status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Short machine-readable error code (e.g. `"not_found"`).
    pub code: String,
    /// Human-readable description safe to expose to callers.
    pub message: String,
}

impl ErrorResponse {
    /// Construct an [`ErrorResponse`] from a code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Health check
// ---------------------------------------------------------------------------

/// Response body for `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    /// Name of the configured persistence backend (`"memory"`, `"dynamodb"`).
    pub store: String,
}
