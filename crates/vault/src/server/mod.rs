//! Axum HTTP(S) server, routing, and error mapping.
//!
//! # Responsibilities
//! - Define the Axum router with all routes and shared middleware.
//! - Map [`common::ServiceError`] onto HTTP responses.
//! - Serve plain HTTP or rustls-terminated HTTPS until a shutdown signal.

pub mod error;
pub mod handlers;
pub mod router;
pub mod state;
pub mod tls;

use tracing::info;

/// Resolves on SIGINT, or SIGTERM on unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    info!("shutdown signal received");
}
