//! HTTP rendering of [`ServiceError`].

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::{protocol::ErrorResponse, ServiceError};
use tracing::warn;

/// Handler error: a [`ServiceError`] rendered as an [`ErrorResponse`] body.
#[derive(Debug)]
pub struct ApiError(pub ServiceError);

impl<E> From<E> for ApiError
where
    E: Into<ServiceError>,
{
    fn from(e: E) -> Self {
        Self(e.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        // Server-side details stay in the logs.
        let message = if self.0.is_server_error() {
            warn!(error = %self.0, code = self.0.code(), "request failed");
            "the request could not be completed".to_owned()
        } else {
            self.0.to_string()
        };

        (status, Json(ErrorResponse::new(self.0.code(), message))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn render(e: ServiceError) -> (StatusCode, ErrorResponse) {
        let resp = ApiError(e).into_response();
        let status = resp.status();
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn bad_request_renders_400_with_message() {
        let (status, body) = render(ServiceError::BadRequest("token is required".into())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.code, "bad_request");
        assert!(body.message.contains("token is required"));
    }

    #[tokio::test]
    async fn not_found_renders_404() {
        let (status, body) = render(ServiceError::TokenNotFound).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.code, "not_found");
    }

    #[tokio::test]
    async fn server_errors_hide_details() {
        let (status, body) = render(ServiceError::Store("dynamodb: AccessDenied".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.code, "store_error");
        assert!(!body.message.contains("AccessDenied"));
    }
}
