//! Axum router construction.

use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{compression::CompressionLayer, timeout::TimeoutLayer, trace::TraceLayer};

use super::{handlers, state::AppState};

/// Build the application [`Router`] with all routes and middleware attached.
pub fn build(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        .route(
            "/token",
            post(handlers::create_token)
                .get(handlers::missing_token)
                .delete(handlers::missing_token),
        )
        .route(
            "/token/",
            get(handlers::missing_token).delete(handlers::missing_token),
        )
        .route(
            "/token/:token",
            get(handlers::get_encrypted_token).delete(handlers::delete_token),
        )
        .route("/token/:token/decrypt", get(handlers::get_decrypted_token))
        .route("/health", get(handlers::health))
        .fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(request_timeout))
        .layer(CompressionLayer::new())
        .with_state(state)
}
