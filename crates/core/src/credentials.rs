//! Encryption at rest for remote instance API keys.
//!
//! Keys are sealed with AES-256-GCM. The cipher key is the SHA-256 digest of
//! the configured secret, so any non-empty secret string is accepted. A sealed
//! value is `nonce (12 bytes) || ciphertext+tag`.

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use sha2::{Digest, Sha256};

use crate::error::CoreError;

/// AES-GCM nonce length in bytes.
const NONCE_LEN: usize = 12;

/// Seals and opens instance credentials.
#[derive(Clone)]
pub struct CredentialCipher {
    cipher: Aes256Gcm,
}

impl std::fmt::Debug for CredentialCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialCipher").finish_non_exhaustive()
    }
}

impl CredentialCipher {
    /// Build a cipher from a secret. Rejects an empty secret.
    pub fn new(secret: &str) -> Result<Self, CoreError> {
        if secret.is_empty() {
            return Err(CoreError::Validation(
                "credential secret must not be empty".into(),
            ));
        }
        let digest = Sha256::digest(secret.as_bytes());
        let key = Key::<Aes256Gcm>::from_slice(&digest);
        Ok(Self {
            cipher: Aes256Gcm::new(key),
        })
    }

    /// Encrypt a plaintext credential with a fresh random nonce.
    pub fn seal(&self, plaintext: &str) -> Result<Vec<u8>, CoreError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|_| CoreError::Internal("failed to seal credential".into()))?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        sealed.extend_from_slice(&nonce);
        sealed.extend_from_slice(&ciphertext);
        Ok(sealed)
    }

    /// Decrypt a value produced by [`seal`](Self::seal).
    pub fn open(&self, sealed: &[u8]) -> Result<String, CoreError> {
        if sealed.len() <= NONCE_LEN {
            return Err(CoreError::Internal("sealed credential is truncated".into()));
        }
        let (nonce, ciphertext) = sealed.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| CoreError::Internal("failed to open credential".into()))?;

        String::from_utf8(plaintext)
            .map_err(|_| CoreError::Internal("credential is not valid UTF-8".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn seal_then_open_recovers_plaintext() {
        let cipher = CredentialCipher::new("local-dev-secret").unwrap();
        let sealed = cipher.seal("n8n_api_key_123").unwrap();
        assert_ne!(&sealed[NONCE_LEN..], b"n8n_api_key_123");
        assert_eq!(cipher.open(&sealed).unwrap(), "n8n_api_key_123");
    }

    #[test]
    fn nonces_differ_between_seals() {
        let cipher = CredentialCipher::new("secret").unwrap();
        let a = cipher.seal("same").unwrap();
        let b = cipher.seal("same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn wrong_secret_cannot_open() {
        let sealed = CredentialCipher::new("one").unwrap().seal("key").unwrap();
        let other = CredentialCipher::new("two").unwrap();
        assert_matches!(other.open(&sealed), Err(CoreError::Internal(_)));
    }

    #[test]
    fn truncated_and_empty_inputs_rejected() {
        let cipher = CredentialCipher::new("secret").unwrap();
        assert!(cipher.open(&[0u8; 4]).is_err());
        assert_matches!(CredentialCipher::new(""), Err(CoreError::Validation(_)));
    }
}
