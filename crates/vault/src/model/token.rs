//! The [`Token`] record: identity, caller fields, derived token and payload.

use chrono::{DateTime, Utc};
use common::protocol::NewToken;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::crypto::{derive_token, CipherError, VaultCipher};

/// A vault record keyed by its `token`.
///
/// `payload` holds plaintext only between construction and [`Token::encrypt`];
/// at rest it is ciphertext hex.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    /// Time-sortable UUIDv7, nil until [`Token::assign_identity`] runs.
    pub id: Uuid,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    /// Write-once: no operation advances it after creation.
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub data: NewToken,
    pub token: String,
}

impl Token {
    /// Wrap caller-supplied fields in an unsaved record.
    pub fn new(data: NewToken) -> Self {
        Self {
            id: Uuid::nil(),
            created_at: DateTime::<Utc>::default(),
            updated_at: DateTime::<Utc>::default(),
            data,
            token: String::new(),
        }
    }

    pub fn has_identity(&self) -> bool {
        !self.id.is_nil()
    }

    /// Assign id and timestamps unless the record already has an id.
    pub fn assign_identity(&mut self) {
        if self.has_identity() {
            return;
        }
        let now = Utc::now();
        self.id = Uuid::now_v7();
        self.created_at = now;
        self.updated_at = now;
    }

    /// Set `token` from the current payload. Call on the plaintext, before
    /// [`Token::encrypt`].
    pub fn tokenize(&mut self) {
        self.token = derive_token(&self.data.payload);
    }

    /// Replace the payload with its ciphertext hex.
    ///
    /// # Errors
    ///
    /// Propagates [`CipherError`] from the cipher; the payload is left untouched
    /// on failure.
    pub fn encrypt(&mut self, cipher: &VaultCipher) -> Result<(), CipherError> {
        self.data.payload = cipher.encrypt(&self.data.payload, &self.token)?;
        Ok(())
    }

    /// Return the decrypted payload without modifying the record.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::Decode`] or [`CipherError::Authentication`] when the
    /// stored payload is corrupt or was sealed under another key.
    pub fn decrypt(&self, cipher: &VaultCipher) -> Result<String, CipherError> {
        cipher.decrypt(&self.data.payload, &self.token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{cipher::KEY_LEN, CipherMode};
    use serde_json::json;

    fn cipher(mode: CipherMode) -> VaultCipher {
        VaultCipher::new(mode, &[0x42u8; KEY_LEN]).unwrap()
    }

    fn new_token(payload: &str) -> Token {
        let mut metadata = common::protocol::Metadata::new();
        metadata.insert("key".into(), json!("value"));
        Token::new(NewToken {
            payload: payload.into(),
            token_type: "access".into(),
            ttl: 3600,
            metadata,
        })
    }

    #[test]
    fn new_token_has_no_identity() {
        let t = new_token("p");
        assert!(!t.has_identity());
        assert!(t.token.is_empty());
    }

    #[test]
    fn assign_identity_is_write_once() {
        let mut t = new_token("p");
        t.assign_identity();
        assert!(t.has_identity());
        assert_eq!(t.id.get_version_num(), 7);
        assert_eq!(t.created_at, t.updated_at);

        let (id, created) = (t.id, t.created_at);
        t.assign_identity();
        assert_eq!(t.id, id);
        assert_eq!(t.created_at, created);
    }

    #[test]
    fn tokenize_hashes_plaintext() {
        let mut t = new_token("this is the payload");
        t.tokenize();
        assert_eq!(
            t.token,
            "e3061477f33275654a7beebe7ac6a4941adedec434d870a8bac71e7bff2eb137"
        );
    }

    #[test]
    fn tokenize_then_encrypt_keeps_plaintext_token() {
        for mode in [CipherMode::Gcm, CipherMode::GcmSiv] {
            let cipher = cipher(mode);
            let mut t = new_token("4111111111111111");
            t.tokenize();
            let token = t.token.clone();
            t.encrypt(&cipher).unwrap();
            assert_eq!(t.token, token);
            assert_ne!(t.data.payload, "4111111111111111");
            assert!(t.data.payload.chars().all(|c| c.is_ascii_hexdigit()));
            assert_eq!(t.decrypt(&cipher).unwrap(), "4111111111111111");
        }
    }

    #[test]
    fn failed_encrypt_leaves_payload_untouched() {
        let mut t = new_token("4111111111111111");
        assert!(matches!(
            t.encrypt(&cipher(CipherMode::GcmSiv)),
            Err(CipherError::InvalidToken)
        ));
        assert_eq!(t.data.payload, "4111111111111111");
    }

    #[test]
    fn decrypt_does_not_mutate_payload() {
        let cipher = cipher(CipherMode::Gcm);
        let mut t = new_token("secret");
        t.tokenize();
        t.encrypt(&cipher).unwrap();
        let stored = t.data.payload.clone();
        let _ = t.decrypt(&cipher).unwrap();
        assert_eq!(t.data.payload, stored);
    }

    #[test]
    fn decrypt_invalid_hex_payload_fails() {
        let t = new_token("invalid hex string");
        assert!(matches!(
            t.decrypt(&cipher(CipherMode::Gcm)),
            Err(CipherError::Decode(_))
        ));
    }

    #[test]
    fn decrypt_corrupted_ciphertext_fails() {
        let t = new_token("deadbeef");
        assert!(matches!(
            t.decrypt(&cipher(CipherMode::Gcm)),
            Err(CipherError::Authentication)
        ));
    }

    #[test]
    fn serialises_with_record_field_names() {
        let mut t = new_token("p");
        t.tokenize();
        let v = serde_json::to_value(&t).unwrap();
        for field in [
            "id", "createdAt", "updatedAt", "payload", "token_type", "ttl", "metadata", "token",
        ] {
            assert!(v.get(field).is_some(), "missing {field} in {v}");
        }
        assert_eq!(v["metadata"]["key"], "value");

        let back: Token = serde_json::from_value(v).unwrap();
        assert_eq!(back, t);
    }
}
