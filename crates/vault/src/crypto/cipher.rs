//! AES-256 authenticated encryption of token payloads.
//!
//! Two modes exist, selected once per process:
//!
//! - [`CipherMode::Gcm`]: AES-256-GCM with an all-zero 96-bit nonce. This is the
//!   stored wire format (`hex(ciphertext || tag)`) and must stay byte-compatible
//!   with existing records. Identical plaintext under one key always yields
//!   identical ciphertext, and confidentiality rests entirely on key secrecy:
//!   GCM nonce reuse leaks the XOR of plaintexts and the GHASH key.
//! - [`CipherMode::GcmSiv`]: AES-256-GCM-SIV (RFC 8452, nonce-misuse resistant)
//!   with the nonce taken from the first 12 bytes of the record's token digest.
//!   Still deterministic and stateless, but not readable by `Gcm`.

use aes_gcm::{
    aead::{Aead, KeyInit, Nonce},
    Aes256Gcm,
};
use aes_gcm_siv::Aes256GcmSiv;
use serde::Deserialize;
use thiserror::Error;

/// Byte length of an AES-256 key (32 bytes = 256 bits).
pub const KEY_LEN: usize = 32;

/// Byte length of a GCM / GCM-SIV nonce (12 bytes = 96 bits).
pub const NONCE_LEN: usize = 12;

/// Byte length of the authentication tag appended to every ciphertext.
#[allow(dead_code)]
pub const TAG_LEN: usize = 16;

const ZERO_NONCE: [u8; NONCE_LEN] = [0u8; NONCE_LEN];

/// Errors produced by the cipher layer.
#[derive(Debug, Error)]
pub enum CipherError {
    /// The key is the wrong length (must be [`KEY_LEN`] bytes).
    #[error("invalid key length: expected {KEY_LEN} bytes, got {0}")]
    InvalidKeyLength(usize),

    /// Input that should be hexadecimal is not.
    #[error("invalid hex: {0}")]
    Decode(#[from] hex::FromHexError),

    /// The token digest cannot supply a nonce (GCM-SIV mode only).
    #[error("token is not a hex digest of at least {NONCE_LEN} bytes")]
    InvalidToken,

    /// AEAD verification failed: wrong key, tampered or truncated ciphertext.
    #[error("ciphertext failed authentication")]
    Authentication,

    /// AEAD sealing failed. Unreachable for payloads under 64 GiB.
    #[error("aead seal failed")]
    Seal,
}

/// Which AEAD construction a [`VaultCipher`] uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CipherMode {
    /// AES-256-GCM, zero nonce. Wire-compatible with existing ciphertexts.
    #[default]
    Gcm,
    /// AES-256-GCM-SIV, nonce derived from the token digest.
    GcmSiv,
}

impl std::fmt::Display for CipherMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CipherMode::Gcm => f.write_str("gcm"),
            CipherMode::GcmSiv => f.write_str("gcm-siv"),
        }
    }
}

enum Engine {
    Gcm(Aes256Gcm),
    GcmSiv(Aes256GcmSiv),
}

/// A payload cipher keyed once at startup and shared by every request.
pub struct VaultCipher {
    engine: Engine,
}

impl VaultCipher {
    /// Build the cipher for `mode` from raw key bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::InvalidKeyLength`] if `key` is not [`KEY_LEN`] bytes.
    pub fn new(mode: CipherMode, key: &[u8]) -> Result<Self, CipherError> {
        if key.len() != KEY_LEN {
            return Err(CipherError::InvalidKeyLength(key.len()));
        }
        let engine = match mode {
            CipherMode::Gcm => Engine::Gcm(gcm_cipher(key)?),
            CipherMode::GcmSiv => Engine::GcmSiv(
                Aes256GcmSiv::new_from_slice(key)
                    .map_err(|_| CipherError::InvalidKeyLength(key.len()))?,
            ),
        };
        Ok(Self { engine })
    }

    pub fn mode(&self) -> CipherMode {
        match self.engine {
            Engine::Gcm(_) => CipherMode::Gcm,
            Engine::GcmSiv(_) => CipherMode::GcmSiv,
        }
    }

    /// Encrypt `plaintext` and return `hex(ciphertext || tag)`.
    ///
    /// `token` is the record's digest; only GCM-SIV mode reads it.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::InvalidToken`] in GCM-SIV mode when `token` is not a
    /// usable hex digest.
    pub fn encrypt(&self, plaintext: &str, token: &str) -> Result<String, CipherError> {
        match &self.engine {
            Engine::Gcm(cipher) => seal(cipher, &ZERO_NONCE, plaintext),
            Engine::GcmSiv(cipher) => seal(cipher, &nonce_from_token(token)?, plaintext),
        }
    }

    /// Reverse [`VaultCipher::encrypt`].
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::Decode`] if `ciphertext_hex` is not hex and
    /// [`CipherError::Authentication`] if the ciphertext does not verify.
    pub fn decrypt(&self, ciphertext_hex: &str, token: &str) -> Result<String, CipherError> {
        match &self.engine {
            Engine::Gcm(cipher) => open(cipher, &ZERO_NONCE, ciphertext_hex),
            Engine::GcmSiv(cipher) => open(cipher, &nonce_from_token(token)?, ciphertext_hex),
        }
    }
}

impl std::fmt::Debug for VaultCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key material.
        f.debug_struct("VaultCipher")
            .field("mode", &self.mode())
            .finish_non_exhaustive()
    }
}

/// Encrypt `plaintext` with AES-256-GCM under the all-zero nonce.
///
/// One-shot form of [`VaultCipher::encrypt`] in [`CipherMode::Gcm`], for
/// tooling that holds a raw key.
///
/// # Errors
///
/// Returns [`CipherError::InvalidKeyLength`] if `key` is not [`KEY_LEN`] bytes.
#[allow(dead_code)]
pub fn encrypt(plaintext: &str, key: &[u8]) -> Result<String, CipherError> {
    seal(&gcm_cipher(key)?, &ZERO_NONCE, plaintext)
}

/// Decrypt a hex ciphertext produced by [`encrypt`].
///
/// # Errors
///
/// Returns [`CipherError::InvalidKeyLength`] for a bad key,
/// [`CipherError::Decode`] for non-hex input and [`CipherError::Authentication`]
/// when verification fails, including input shorter than a tag.
#[allow(dead_code)]
pub fn decrypt(ciphertext_hex: &str, key: &[u8]) -> Result<String, CipherError> {
    open(&gcm_cipher(key)?, &ZERO_NONCE, ciphertext_hex)
}

fn gcm_cipher(key: &[u8]) -> Result<Aes256Gcm, CipherError> {
    if key.len() != KEY_LEN {
        return Err(CipherError::InvalidKeyLength(key.len()));
    }
    Aes256Gcm::new_from_slice(key).map_err(|_| CipherError::InvalidKeyLength(key.len()))
}

fn nonce_from_token(token: &str) -> Result<[u8; NONCE_LEN], CipherError> {
    let digest = hex::decode(token).map_err(|_| CipherError::InvalidToken)?;
    digest
        .get(..NONCE_LEN)
        .and_then(|prefix| <[u8; NONCE_LEN]>::try_from(prefix).ok())
        .ok_or(CipherError::InvalidToken)
}

fn seal<C: Aead>(
    cipher: &C,
    nonce: &[u8; NONCE_LEN],
    plaintext: &str,
) -> Result<String, CipherError> {
    let ciphertext = cipher
        .encrypt(Nonce::<C>::from_slice(nonce), plaintext.as_bytes())
        .map_err(|_| CipherError::Seal)?;
    Ok(hex::encode(ciphertext))
}

fn open<C: Aead>(
    cipher: &C,
    nonce: &[u8; NONCE_LEN],
    ciphertext_hex: &str,
) -> Result<String, CipherError> {
    let ciphertext = hex::decode(ciphertext_hex)?;
    let plaintext = cipher
        .decrypt(Nonce::<C>::from_slice(nonce), ciphertext.as_slice())
        .map_err(|_| CipherError::Authentication)?;
    String::from_utf8(plaintext).map_err(|_| CipherError::Authentication)
}
