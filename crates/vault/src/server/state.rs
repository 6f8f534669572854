//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use crate::crypto::VaultCipher;
use crate::service::TokenVault;
use crate::store::Store;

/// Application state shared across all request handlers.
///
/// Cloned per request by Axum; the vault only holds `Arc`s.
#[derive(Clone)]
pub struct AppState {
    pub vault: TokenVault,
}

impl AppState {
    /// Create a new [`AppState`] from a store backend and the process cipher.
    pub fn new(store: Arc<dyn Store>, cipher: Arc<VaultCipher>) -> Self {
        Self {
            vault: TokenVault::new(store, cipher),
        }
    }
}
