//! Vault orchestration: the create / read / delete flows over a [`Store`].
//!
//! Every flow is fail-fast: the first error aborts the remaining steps and is
//! returned unchanged. No record is persisted after a failed encryption and no
//! plaintext is returned after a failed decryption.

use std::sync::Arc;

use common::{protocol::NewToken, ServiceError};
use tracing::{debug, info};

use crate::crypto::{CipherError, VaultCipher};
use crate::model::Token;
use crate::store::Store;

impl From<CipherError> for ServiceError {
    fn from(e: CipherError) -> Self {
        match e {
            CipherError::InvalidKeyLength(_) => ServiceError::CryptoInit(e.to_string()),
            CipherError::Decode(_) | CipherError::InvalidToken => {
                ServiceError::Decode(e.to_string())
            }
            CipherError::Authentication => ServiceError::Authentication,
            CipherError::Seal => ServiceError::Internal(e.to_string()),
        }
    }
}

/// The token vault. Cheap to clone; clones share the store and cipher.
#[derive(Clone)]
pub struct TokenVault {
    store: Arc<dyn Store>,
    cipher: Arc<VaultCipher>,
}

impl TokenVault {
    pub fn new(store: Arc<dyn Store>, cipher: Arc<VaultCipher>) -> Self {
        Self { store, cipher }
    }

    /// Name of the underlying store backend.
    pub fn backend(&self) -> &'static str {
        self.store.backend()
    }

    /// Tokenize and encrypt `data`, persist it, and return only the token.
    ///
    /// Identical payloads yield the same token, so a second create overwrites
    /// the first record.
    pub async fn create(&self, data: NewToken) -> Result<String, ServiceError> {
        let mut record = Token::new(data);
        record.tokenize();
        self.seal_and_store(record).await
    }

    /// Encrypt an already tokenized record and persist it. Nothing reaches the
    /// store when encryption fails.
    pub(crate) async fn seal_and_store(&self, mut record: Token) -> Result<String, ServiceError> {
        record.encrypt(&self.cipher)?;

        let stored = self.store.create_token(record).await?;
        info!(token = %stored.token, id = %stored.id, "token created");
        Ok(stored.token)
    }

    /// Fetch a record with its payload blanked.
    pub async fn get_encrypted(&self, token: &str) -> Result<Token, ServiceError> {
        let mut record = self.fetch(token).await?;
        record.data.payload.clear();
        Ok(record)
    }

    /// Fetch a record with its payload replaced by the decrypted plaintext.
    pub async fn get_decrypted(&self, token: &str) -> Result<Token, ServiceError> {
        let mut record = self.fetch(token).await?;
        let plaintext = record.decrypt(&self.cipher)?;
        record.data.payload = plaintext;
        debug!(token = %record.token, "token detokenized");
        Ok(record)
    }

    /// Delete a record. The record must exist; the store delete is not attempted
    /// otherwise.
    pub async fn delete(&self, token: &str) -> Result<(), ServiceError> {
        let record = self.fetch(token).await?;
        self.store.delete_token(&record).await?;
        info!(token = %record.token, "token deleted");
        Ok(())
    }

    async fn fetch(&self, token: &str) -> Result<Token, ServiceError> {
        if token.trim().is_empty() {
            return Err(ServiceError::BadRequest("token is required".into()));
        }
        Ok(self.store.get_token(token).await?)
    }
}
