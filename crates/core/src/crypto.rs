//! At-rest encryption of face encodings.
//!
//! An encoding is serialized to a JSON number array and sealed with
//! AES-256-GCM. The stored blob is `nonce (12 bytes) || ciphertext`. The key
//! is the SHA-256 digest of the configured secret, so any non-empty secret
//! string yields a valid 256-bit key.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use rand::Rng;
use sha2::{Digest, Sha256};

/// Length of the random AES-GCM nonce prefixed to every blob.
pub const NONCE_LEN: usize = 12;

/// Errors from sealing or opening an encoding blob.
#[derive(Debug, thiserror::Error)]
pub enum CipherError {
    #[error("Encryption secret must not be empty")]
    EmptySecret,

    #[error("Encrypted encoding is truncated ({0} bytes)")]
    Truncated(usize),

    #[error("Encoding encryption failed")]
    Encrypt,

    #[error("Encoding decryption failed: wrong key or corrupted data")]
    Decrypt,

    #[error("Encoding serialization failed: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Symmetric cipher for student face encodings.
#[derive(Clone)]
pub struct EncodingCipher {
    cipher: Aes256Gcm,
}

impl std::fmt::Debug for EncodingCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncodingCipher").finish_non_exhaustive()
    }
}

impl EncodingCipher {
    /// Derive the cipher key from a configured secret.
    pub fn from_secret(secret: &str) -> Result<Self, CipherError> {
        if secret.is_empty() {
            return Err(CipherError::EmptySecret);
        }
        let digest = Sha256::digest(secret.as_bytes());
        let key = Key::<Aes256Gcm>::from_slice(digest.as_slice());
        Ok(Self {
            cipher: Aes256Gcm::new(key),
        })
    }

    /// Serialize and encrypt an encoding under a fresh random nonce.
    pub fn encrypt(&self, encoding: &[f64]) -> Result<Vec<u8>, CipherError> {
        let plaintext = serde_json::to_vec(encoding)?;

        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::rng().fill(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext.as_slice())
            .map_err(|_| CipherError::Encrypt)?;

        let mut blob = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        blob.extend_from_slice(&nonce_bytes);
        blob.extend_from_slice(&ciphertext);
        Ok(blob)
    }

    /// Decrypt and deserialize a blob produced by [`encrypt`](Self::encrypt).
    pub fn decrypt(&self, blob: &[u8]) -> Result<Vec<f64>, CipherError> {
        // GCM appends a 16-byte tag, so a valid blob is strictly longer than the nonce.
        if blob.len() <= NONCE_LEN {
            return Err(CipherError::Truncated(blob.len()));
        }
        let (nonce_bytes, ciphertext) = blob.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|_| CipherError::Decrypt)?;
        Ok(serde_json::from_slice(&plaintext)?)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::encoding::ENCODING_DIMENSION;

    fn sample_encoding() -> Vec<f64> {
        (0..ENCODING_DIMENSION).map(|i| (i as f64) * 0.001 - 0.05).collect()
    }

    #[test]
    fn decrypt_recovers_encoding() {
        let cipher = EncodingCipher::from_secret("unit-test-secret").unwrap();
        let enc = sample_encoding();

        let blob = cipher.encrypt(&enc).unwrap();
        assert_eq!(cipher.decrypt(&blob).unwrap(), enc);
    }

    #[test]
    fn nonces_differ_between_encryptions() {
        let cipher = EncodingCipher::from_secret("unit-test-secret").unwrap();
        let enc = sample_encoding();

        let a = cipher.encrypt(&enc).unwrap();
        let b = cipher.encrypt(&enc).unwrap();
        assert_ne!(a, b, "same plaintext must not produce identical blobs");
    }

    #[test]
    fn wrong_key_fails() {
        let a = EncodingCipher::from_secret("secret-alpha").unwrap();
        let b = EncodingCipher::from_secret("secret-bravo").unwrap();

        let blob = a.encrypt(&sample_encoding()).unwrap();
        assert_matches!(b.decrypt(&blob), Err(CipherError::Decrypt));
    }

    #[test]
    fn tampered_blob_fails() {
        let cipher = EncodingCipher::from_secret("unit-test-secret").unwrap();
        let mut blob = cipher.encrypt(&sample_encoding()).unwrap();
        let last = blob.len() - 1;
        blob[last] ^= 0xff;

        assert_matches!(cipher.decrypt(&blob), Err(CipherError::Decrypt));
    }

    #[test]
    fn truncated_blob_fails() {
        let cipher = EncodingCipher::from_secret("unit-test-secret").unwrap();
        assert_matches!(cipher.decrypt(&[0u8; 8]), Err(CipherError::Truncated(8)));
    }

    #[test]
    fn empty_secret_is_rejected() {
        assert_matches!(
            EncodingCipher::from_secret(""),
            Err(CipherError::EmptySecret)
        );
    }
}
