//! Axum request handlers for all service endpoints.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use common::{
    protocol::{CreateTokenRequest, CreateTokenResponse, ErrorResponse, HealthResponse},
    ServiceError,
};
use serde::{Deserialize, Serialize};

use super::{error::ApiError, state::AppState};
use crate::model::Token;

/// Response body for both read endpoints. The key name is kept for both views.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetTokenResponse {
    pub encrypted_token: Token,
}

/// `POST /token` — tokenize, encrypt and persist a payload.
///
/// Responds `201 Created` with only the token string. A body that is not a
/// `{"data": ...}` JSON object is a bad request.
pub async fn create_token(
    State(state): State<AppState>,
    body: Result<Json<CreateTokenRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = body.map_err(bad_body)?;
    let token = state.vault.create(req.data).await?;
    Ok((StatusCode::CREATED, Json(CreateTokenResponse { token })))
}

/// `GET /token/:token` — record metadata with the payload blanked.
pub async fn get_encrypted_token(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<GetTokenResponse>, ApiError> {
    let record = state.vault.get_encrypted(&token).await?;
    Ok(Json(GetTokenResponse {
        encrypted_token: record,
    }))
}

/// `GET /token/:token/decrypt` — record with the plaintext payload.
pub async fn get_decrypted_token(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<GetTokenResponse>, ApiError> {
    let record = state.vault.get_decrypted(&token).await?;
    Ok(Json(GetTokenResponse {
        encrypted_token: record,
    }))
}

/// `DELETE /token/:token` — responds `204 No Content`.
pub async fn delete_token(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.vault.delete(&token).await?;
    Ok(StatusCode::NO_CONTENT)
}

// The rejection text can quote the body, so it is not echoed back.
fn bad_body(rejection: JsonRejection) -> ApiError {
    let message = match rejection {
        JsonRejection::MissingJsonContentType(_) => "content-type must be application/json",
        JsonRejection::JsonSyntaxError(_) => "request body is not valid JSON",
        _ => "request body must be an object with a `data` field",
    };
    ApiError(ServiceError::BadRequest(message.into()))
}

/// `/token` or `/token/` with no token segment.
pub async fn missing_token() -> ApiError {
    ApiError(ServiceError::BadRequest("token is required".into()))
}

/// `GET /health` — liveness check.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        store: state.vault.backend().into(),
    })
}

/// Catch-all 404 handler.
pub async fn not_found() -> impl IntoResponse {
    let err = ErrorResponse::new("not_found", "the requested resource does not exist");
    (StatusCode::NOT_FOUND, Json(err))
}
