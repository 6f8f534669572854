//! Deterministic token derivation.

use sha2::{Digest, Sha512_256};

/// Length of a derived token: a 256-bit digest rendered as lowercase hex.
#[allow(dead_code)]
pub const TOKEN_HEX_LEN: usize = 64;

/// Derive the lookup token for `plaintext`: `hex(SHA-512/256(plaintext))`.
///
/// Pure and infallible; identical plaintext always yields the identical token.
pub fn derive_token(plaintext: &str) -> String {
    hex::encode(Sha512_256::digest(plaintext.as_bytes()))
}
