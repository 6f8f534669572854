//! Cryptographic core: token derivation and payload encryption.
//!
//! This module is intentionally free of storage and HTTP dependencies.
//!
//! # Formats
//!
//! ```text
//! token   = hex(SHA-512/256(plaintext))          64 lowercase hex chars
//! payload = hex(AEAD(key, nonce, plaintext))     ciphertext || 16-byte tag
//! ```
//!
//! The token is always derived from the plaintext, so it must be computed
//! before the payload is replaced by its ciphertext.

pub mod cipher;
pub mod digest;
pub mod key;

pub use cipher::{CipherError, CipherMode, VaultCipher};
pub use digest::derive_token;
pub use key::EncryptionKey;
