//! `token-vault` — service binary entry point.
//!
//! Startup sequence:
//! 1. Load and validate [`Config`] from environment variables.
//! 2. Initialise the telemetry pipeline (JSON logs, optional OTLP).
//! 3. Build the payload cipher from the configured key.
//! 4. Connect the store backend, creating the DynamoDB table if asked to.
//! 5. Build the Axum router and serve HTTP or HTTPS until SIGINT/SIGTERM.

mod aws;
mod config;
mod crypto;
mod model;
mod server;
mod service;
mod store;
mod telemetry;

use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use tracing::info;

use config::{Config, StoreBackend};
use crypto::VaultCipher;
use server::state::AppState;
use store::{DynamoStore, MemoryStore, Store};

#[tokio::main]
async fn main() -> Result<()> {
    // -----------------------------------------------------------------------
    // 1. Configuration
    // -----------------------------------------------------------------------
    let cfg = Config::from_env().map_err(|e| {
        // Telemetry is not yet up; write to stderr directly.
        eprintln!("ERROR: configuration invalid: {e:#}");
        e
    })?;

    // -----------------------------------------------------------------------
    // 2. Telemetry
    // -----------------------------------------------------------------------
    telemetry::init_telemetry(cfg.otel_exporter_otlp_endpoint.as_deref(), &cfg.log_level)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        port = cfg.listen_port,
        cipher_mode = %cfg.cipher_mode,
        "token-vault starting"
    );

    // -----------------------------------------------------------------------
    // 3. Cipher
    // -----------------------------------------------------------------------
    let key = cfg.encryption_key()?;
    let cipher = VaultCipher::new(cfg.cipher_mode, key.as_bytes())
        .context("failed to initialise payload cipher")?;
    drop(key);

    // -----------------------------------------------------------------------
    // 4. Store
    // -----------------------------------------------------------------------
    let store = connect_store(&cfg).await?;
    info!(backend = store.backend(), "store ready");

    // -----------------------------------------------------------------------
    // 5. HTTP server
    // -----------------------------------------------------------------------
    let state = AppState::new(store, Arc::new(cipher));
    let router = server::router::build(state, Duration::from_secs(cfg.request_timeout_secs));

    let addr: std::net::SocketAddr = ([0, 0, 0, 0], cfg.listen_port).into();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    match cfg.tls_paths() {
        Some((cert, key)) => {
            let tls = server::tls::load_server_config(cert, key).await?;
            info!(addr = %addr, "listening (https)");
            server::tls::serve_tls(listener, router, tls, server::shutdown_signal()).await?;
        }
        None => {
            info!(addr = %addr, "listening (http)");
            axum::serve(listener, router)
                .with_graceful_shutdown(server::shutdown_signal())
                .await
                .context("server error")?;
        }
    }

    info!("token-vault stopped");
    telemetry::shutdown_telemetry();
    Ok(())
}

async fn connect_store(cfg: &Config) -> Result<Arc<dyn Store>> {
    match cfg.store_backend {
        StoreBackend::Memory => Ok(Arc::new(MemoryStore::new())),
        StoreBackend::Dynamodb => {
            let client = aws::dynamodb_client(cfg.dynamodb_endpoint.as_deref()).await;
            let store = DynamoStore::new(client, cfg.dynamodb_table.clone());
            if cfg.dynamodb_create_table {
                store
                    .ensure_table()
                    .await
                    .with_context(|| format!("failed to ensure table {}", store.table()))?;
            }
            Ok(Arc::new(store))
        }
    }
}
