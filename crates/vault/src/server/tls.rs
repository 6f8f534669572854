//! Optional TLS termination using rustls.
//!
//! When both `TLS_CERT_PATH` and `TLS_KEY_PATH` are configured the router is
//! served over HTTPS (HTTP/1.1 and HTTP/2 via ALPN); otherwise plain HTTP.

use std::{future::Future, path::Path, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use axum::Router;
use hyper::{body::Incoming, Request};
use hyper_util::{
    rt::{TokioExecutor, TokioIo},
    server::conn::auto,
};
use rustls::ServerConfig;
use tokio::net::TcpListener;
use tokio_rustls::TlsAcceptor;
use tower::ServiceExt;
use tracing::{debug, info, warn};

/// Pause after a failed `accept` (e.g. EMFILE) before polling again.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Build a [`rustls::ServerConfig`] from PEM-encoded certificate and private key bytes.
///
/// # Errors
///
/// Returns an error if the certificate or key cannot be parsed, or if rustls
/// rejects the configuration.
pub fn build_server_config(cert_pem: &[u8], key_pem: &[u8]) -> Result<Arc<ServerConfig>> {
    let certs = rustls_pemfile::certs(&mut std::io::BufReader::new(cert_pem))
        .collect::<Result<Vec<_>, _>>()
        .context("failed to parse TLS certificate chain")?;
    if certs.is_empty() {
        anyhow::bail!("no certificate found in PEM data");
    }

    let key = rustls_pemfile::private_key(&mut std::io::BufReader::new(key_pem))
        .context("failed to read TLS private key")?
        .context("no private key found in PEM data")?;

    let mut config =
        ServerConfig::builder_with_provider(Arc::new(rustls::crypto::ring::default_provider()))
            .with_safe_default_protocol_versions()
            .context("failed to select TLS protocol versions")?
            .with_no_client_auth()
            .with_single_cert(certs, key)
            .context("failed to build rustls ServerConfig")?;
    config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];

    Ok(Arc::new(config))
}

/// Read the certificate chain and key from disk and build a server config.
pub async fn load_server_config(cert_path: &str, key_path: &str) -> Result<Arc<ServerConfig>> {
    let cert_pem = read_pem(cert_path).await?;
    let key_pem = read_pem(key_path).await?;
    build_server_config(&cert_pem, &key_pem)
}

async fn read_pem(path: &str) -> Result<Vec<u8>> {
    tokio::fs::read(Path::new(path))
        .await
        .with_context(|| format!("failed to read {path}"))
}

/// Accept TLS connections on `listener` until `shutdown` resolves.
///
/// Each connection is served on its own task. A failed handshake is logged and
/// does not affect other connections.
pub async fn serve_tls<F>(
    listener: TcpListener,
    router: Router,
    config: Arc<ServerConfig>,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()>,
{
    let acceptor = TlsAcceptor::from(config);
    tokio::pin!(shutdown);

    loop {
        let (stream, peer) = tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok(conn) => conn,
                Err(e) => {
                    warn!(error = %e, "failed to accept connection");
                    tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                    continue;
                }
            },
            () = &mut shutdown => {
                info!("tls listener stopped");
                return Ok(());
            }
        };

        let acceptor = acceptor.clone();
        let router = router.clone();
        tokio::spawn(async move {
            let tls = match acceptor.accept(stream).await {
                Ok(tls) => tls,
                Err(e) => {
                    debug!(peer = %peer, error = %e, "tls handshake failed");
                    return;
                }
            };

            let service = hyper::service::service_fn(move |req: Request<Incoming>| {
                router.clone().oneshot(req)
            });

            if let Err(e) = auto::Builder::new(TokioExecutor::new())
                .serve_connection(TokioIo::new(tls), service)
                .await
            {
                debug!(peer = %peer, error = %e, "connection closed with error");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_cert_pem() {
        let result = build_server_config(b"", b"");
        assert!(result.is_err());
    }

    #[test]
    fn rejects_garbage_pem() {
        let result = build_server_config(b"not a pem", b"also not a pem");
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn serve_tls_stops_on_shutdown() {
        let config = ServerConfig::builder_with_provider(Arc::new(
            rustls::crypto::ring::default_provider(),
        ))
        .with_safe_default_protocol_versions()
        .unwrap()
        .with_no_client_auth()
        .with_cert_resolver(Arc::new(rustls::server::ResolvesServerCertUsingSni::new()));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();

        let served = tokio::time::timeout(
            Duration::from_secs(5),
            serve_tls(listener, Router::new(), Arc::new(config), async {}),
        )
        .await;
        assert!(matches!(served, Ok(Ok(()))));
    }

    #[tokio::test]
    async fn missing_files_are_reported() {
        let err = load_server_config("/nonexistent/tls.crt", "/nonexistent/tls.key")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("/nonexistent/tls.crt"));
    }
}
