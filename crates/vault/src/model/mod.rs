//! Vault data model.

pub mod token;

pub use token::Token;
