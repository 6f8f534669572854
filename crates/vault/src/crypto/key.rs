//! [`EncryptionKey`]: the process-wide symmetric key, parsed from configuration.

use super::cipher::{CipherError, KEY_LEN};

/// Fixed-size key buffer that holds exactly [`KEY_LEN`] bytes.
///
/// When this type is dropped, the memory is overwritten with zeroes to
/// minimise the window during which plaintext key material lives in RAM.
pub struct EncryptionKey(Box<[u8; KEY_LEN]>);

impl EncryptionKey {
    /// Parse a hex-encoded key.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::Decode`] for non-hex input and
    /// [`CipherError::InvalidKeyLength`] if it does not decode to [`KEY_LEN`] bytes.
    pub fn from_hex(encoded: &str) -> Result<Self, CipherError> {
        let mut bytes = hex::decode(encoded.trim())?;
        if bytes.len() != KEY_LEN {
            let len = bytes.len();
            bytes.iter_mut().for_each(|b| *b = 0);
            return Err(CipherError::InvalidKeyLength(len));
        }
        let mut buf = Box::new([0u8; KEY_LEN]);
        buf.copy_from_slice(&bytes);
        bytes.iter_mut().for_each(|b| *b = 0);
        Ok(Self(buf))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0[..]
    }
}

impl Drop for EncryptionKey {
    fn drop(&mut self) {
        self.0.iter_mut().for_each(|b| *b = 0);
    }
}

impl std::fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key material — not even in debug builds.
        f.write_str("EncryptionKey([REDACTED])")
    }
}
