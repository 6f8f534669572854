//! AWS SDK client initialisation for the DynamoDB store backend.

pub mod clients;

pub use clients::dynamodb_client;
