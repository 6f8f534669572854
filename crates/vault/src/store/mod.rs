//! The persistence boundary the vault service programs against.
//!
//! Any engine that can upsert, point-read and delete a record by its `token`
//! string satisfies [`Store`]. Two backends ship:
//!
//! - [`MemoryStore`]: process-local map, used in tests and local runs.
//! - [`DynamoStore`]: a DynamoDB table with hash key `token`.
//!
//! # Error semantics
//!
//! - Lookups that find nothing return [`StoreError::NotFound`], however the
//!   engine reports absence.
//! - Creates overwrite any record with the same key; there is no "already
//!   exists" error.
//! - Deletes do not distinguish "removed" from "already absent".

pub mod dynamo;
pub mod memory;

pub use dynamo::DynamoStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use common::ServiceError;
use thiserror::Error;

use crate::model::Token;

/// Errors produced by store backends.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No record exists for the requested token.
    #[error("token not found")]
    NotFound,

    /// The engine rejected or failed the request (network, throttling, permission).
    #[error("backend error: {0}")]
    Backend(String),

    /// A stored record could not be decoded into a [`Token`].
    #[error("malformed record: {0}")]
    Codec(String),
}

impl From<StoreError> for ServiceError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound => ServiceError::TokenNotFound,
            other => ServiceError::Store(other.to_string()),
        }
    }
}

/// Persistence contract for [`Token`] records.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Store: Send + Sync {
    /// Assign identity if the record has none, upsert it keyed by `token.token`,
    /// and return the stored record.
    async fn create_token(&self, token: Token) -> Result<Token, StoreError>;

    /// Fetch a record by its token.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when no record exists.
    async fn get_token(&self, token: &str) -> Result<Token, StoreError>;

    /// Remove the record keyed by `token.token`.
    async fn delete_token(&self, token: &Token) -> Result<(), StoreError>;

    /// Short name of the engine, reported by the health endpoint.
    fn backend(&self) -> &'static str;
}
