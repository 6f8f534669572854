//! [`MemoryStore`]: map-backed [`Store`] for tests and local runs.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{Store, StoreError};
use crate::model::Token;

/// Thread-safe in-memory token table.
///
/// Cheaply cloneable; all clones share the same map.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<HashMap<String, Token>>>,
}

impl MemoryStore {
    /// Create a new, empty [`MemoryStore`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records currently stored.
    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    #[cfg(test)]
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_token(&self, mut token: Token) -> Result<Token, StoreError> {
        token.assign_identity();
        let mut map = self.inner.write().await;
        map.insert(token.token.clone(), token.clone());
        Ok(token)
    }

    async fn get_token(&self, token: &str) -> Result<Token, StoreError> {
        self.inner
            .read()
            .await
            .get(token)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn delete_token(&self, token: &Token) -> Result<(), StoreError> {
        self.inner.write().await.remove(&token.token);
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
