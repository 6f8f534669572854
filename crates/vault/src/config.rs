//! Configuration loading and validation for the vault service.
//!
//! All values are read from environment variables at startup. The process will
//! exit with a clear error message if any required variable is missing or invalid.

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::crypto::{CipherMode, EncryptionKey};

/// Hex-encoded key material. Deserialises like a `String`, never prints.
#[derive(Clone, Deserialize)]
#[serde(transparent)]
pub struct SecretHex(String);

impl SecretHex {
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for SecretHex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretHex([REDACTED])")
    }
}

impl From<&str> for SecretHex {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Which [`Store`](crate::store::Store) implementation to run against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Memory,
    Dynamodb,
}

/// Validated vault service configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Hex-encoded 32-byte payload encryption key. **Required.**
    pub encryption_key: SecretHex,

    /// Payload AEAD construction (`gcm` or `gcm-siv`).
    #[serde(default)]
    pub cipher_mode: CipherMode,

    /// Persistence backend (`memory` or `dynamodb`).
    #[serde(default)]
    pub store_backend: StoreBackend,

    /// DynamoDB table holding token records.
    #[serde(default = "default_dynamodb_table")]
    pub dynamodb_table: String,

    /// Endpoint override for DynamoDB (e.g. DynamoDB Local).
    #[serde(default)]
    pub dynamodb_endpoint: Option<String>,

    /// Create the DynamoDB table at startup if it does not exist.
    #[serde(default = "default_dynamodb_create_table")]
    pub dynamodb_create_table: bool,

    /// Port the HTTP(S) server listens on.
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,

    /// Per-request timeout applied to every route.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// PEM certificate chain. TLS is enabled when this and `tls_key_path` are set.
    #[serde(default)]
    pub tls_cert_path: Option<String>,

    /// PEM private key matching `tls_cert_path`.
    #[serde(default)]
    pub tls_key_path: Option<String>,

    /// OTLP collector endpoint. Span export is disabled when unset.
    #[serde(default)]
    pub otel_exporter_otlp_endpoint: Option<String>,

    /// Tracing log level (e.g. `"info"`, `"debug"`).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_dynamodb_table() -> String {
    crate::store::dynamo::DEFAULT_TABLE.into()
}
fn default_dynamodb_create_table() -> bool {
    true
}
fn default_listen_port() -> u16 {
    8080
}
fn default_request_timeout() -> u64 {
    30
}
fn default_log_level() -> String {
    "info".into()
}

impl Config {
    /// Load and validate configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if any required variable is absent or cannot be parsed.
    pub fn from_env() -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::default())
            .build()
            .context("failed to build configuration from environment")?;

        let c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise configuration")?;

        c.validate()?;
        Ok(c)
    }

    /// Parse the configured encryption key.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is not hex or not 32 bytes long.
    pub fn encryption_key(&self) -> Result<EncryptionKey> {
        EncryptionKey::from_hex(self.encryption_key.expose())
            .context("ENCRYPTION_KEY must be 64 hex characters (32 bytes)")
    }

    /// Both TLS paths, when TLS is configured.
    pub fn tls_paths(&self) -> Option<(&str, &str)> {
        match (&self.tls_cert_path, &self.tls_key_path) {
            (Some(cert), Some(key)) => Some((cert.as_str(), key.as_str())),
            _ => None,
        }
    }

    /// Validate all fields, returning a descriptive error on the first failure.
    fn validate(&self) -> Result<()> {
        ensure_non_empty(self.encryption_key.expose(), "ENCRYPTION_KEY")?;
        self.encryption_key()?;

        if self.store_backend == StoreBackend::Dynamodb {
            ensure_non_empty(&self.dynamodb_table, "DYNAMODB_TABLE")?;
        }
        if self.request_timeout_secs == 0 {
            anyhow::bail!("REQUEST_TIMEOUT_SECS must be > 0");
        }
        if self.tls_cert_path.is_some() != self.tls_key_path.is_some() {
            anyhow::bail!("TLS_CERT_PATH and TLS_KEY_PATH must be set together");
        }
        Ok(())
    }
}

fn ensure_non_empty(value: &str, name: &str) -> Result<()> {
    if value.trim().is_empty() {
        anyhow::bail!("{name} is required and must not be empty");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> Config {
        Config {
            encryption_key: "42".repeat(32).as_str().into(),
            cipher_mode: CipherMode::default(),
            store_backend: StoreBackend::default(),
            dynamodb_table: default_dynamodb_table(),
            dynamodb_endpoint: None,
            dynamodb_create_table: default_dynamodb_create_table(),
            listen_port: default_listen_port(),
            request_timeout_secs: default_request_timeout(),
            tls_cert_path: None,
            tls_key_path: None,
            otel_exporter_otlp_endpoint: None,
            log_level: default_log_level(),
        }
    }

    #[test]
    fn defaults_are_correct() {
        assert_eq!(default_dynamodb_table(), "token_data");
        assert!(default_dynamodb_create_table());
        assert_eq!(default_listen_port(), 8080);
        assert_eq!(default_request_timeout(), 30);
        assert_eq!(default_log_level(), "info");
        assert_eq!(StoreBackend::default(), StoreBackend::Memory);
    }

    #[test]
    fn valid_config_passes() {
        let cfg = valid();
        assert!(cfg.validate().is_ok());
        assert!(cfg.tls_paths().is_none());
    }

    #[test]
    fn validate_rejects_empty_key() {
        let cfg = Config {
            encryption_key: "".into(),
            ..valid()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_short_key() {
        let cfg = Config {
            encryption_key: "42".repeat(16).as_str().into(),
            ..valid()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_timeout() {
        let cfg = Config {
            request_timeout_secs: 0,
            ..valid()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_half_tls_config() {
        let cfg = Config {
            tls_cert_path: Some("/etc/vault/tls.crt".into()),
            ..valid()
        };
        assert!(cfg.validate().is_err());

        let cfg = Config {
            tls_cert_path: Some("/etc/vault/tls.crt".into()),
            tls_key_path: Some("/etc/vault/tls.key".into()),
            ..valid()
        };
        assert!(cfg.validate().is_ok());
        assert_eq!(
            cfg.tls_paths(),
            Some(("/etc/vault/tls.crt", "/etc/vault/tls.key"))
        );
    }

    #[test]
    fn validate_rejects_empty_dynamodb_table() {
        let cfg = Config {
            store_backend: StoreBackend::Dynamodb,
            dynamodb_table: " ".into(),
            ..valid()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn debug_redacts_key() {
        let dbg = format!("{:?}", valid());
        assert!(dbg.contains("REDACTED"));
        assert!(!dbg.contains(&"42".repeat(32)));
    }

    #[test]
    fn backend_parses_lowercase() {
        let b: StoreBackend = serde_json::from_str("\"dynamodb\"").unwrap();
        assert_eq!(b, StoreBackend::Dynamodb);
    }
}
