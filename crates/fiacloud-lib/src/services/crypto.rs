// Crypto Service
// AES-256-GCM encryption for persisted credentials with a machine-derived key

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Digest;
use thiserror::Error;

const NONCE_SIZE: usize = 12;
const KEY_SIZE: usize = 32;
// Application-specific salt for key derivation
const APP_SALT: &[u8] = b"FiaCloud-Config-Encryption-v1";

/// Encrypted blob as stored in the key/value store
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EncryptedData {
    /// Base64 encoded nonce
    pub nonce: String,
    /// Base64 encoded ciphertext
    pub ciphertext: String,
}

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Key derivation error: {0}")]
    KeyDerivation(String),

    #[error("Encryption error: {0}")]
    Encryption(String),

    #[error("Decryption error: {0}")]
    Decryption(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

pub type CryptoResult<T> = Result<T, CryptoError>;

/// Symmetric cipher over JSON blobs
#[derive(Clone)]
pub struct ConfigCipher {
    key: [u8; KEY_SIZE],
}

impl std::fmt::Debug for ConfigCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigCipher").finish_non_exhaustive()
    }
}

impl ConfigCipher {
    /// Cipher keyed from this machine's identity
    ///
    /// The key is deterministic per machine, so nothing has to be stored.
    pub fn from_machine() -> Self {
        Self::from_secret(&get_machine_id())
    }

    /// Cipher keyed from an arbitrary secret
    pub fn from_secret(secret: &str) -> Self {
        Self {
            key: derive_key(secret),
        }
    }

    /// Encrypt a plaintext string
    pub fn encrypt(&self, plaintext: &str) -> CryptoResult<EncryptedData> {
        let cipher = Aes256Gcm::new_from_slice(&self.key)
            .map_err(|e| CryptoError::Encryption(format!("Failed to create cipher: {}", e)))?;

        let mut nonce_bytes = [0u8; NONCE_SIZE];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|e| CryptoError::Encryption(format!("Encryption failed: {}", e)))?;

        Ok(EncryptedData {
            nonce: BASE64.encode(nonce_bytes),
            ciphertext: BASE64.encode(ciphertext),
        })
    }

    /// Decrypt an encrypted blob
    pub fn decrypt(&self, encrypted: &EncryptedData) -> CryptoResult<String> {
        let cipher = Aes256Gcm::new_from_slice(&self.key)
            .map_err(|e| CryptoError::Decryption(format!("Failed to create cipher: {}", e)))?;

        let nonce_bytes = BASE64
            .decode(&encrypted.nonce)
            .map_err(|e| CryptoError::InvalidData(format!("Invalid nonce: {}", e)))?;

        if nonce_bytes.len() != NONCE_SIZE {
            return Err(CryptoError::InvalidData(format!(
                "Invalid nonce size: expected {}, got {}",
                NONCE_SIZE,
                nonce_bytes.len()
            )));
        }

        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = BASE64
            .decode(&encrypted.ciphertext)
            .map_err(|e| CryptoError::InvalidData(format!("Invalid ciphertext: {}", e)))?;

        let plaintext = cipher
            .decrypt(nonce, ciphertext.as_ref())
            .map_err(|e| CryptoError::Decryption(format!("Decryption failed: {}", e)))?;

        String::from_utf8(plaintext)
            .map_err(|e| CryptoError::Decryption(format!("Invalid UTF-8: {}", e)))
    }

    /// Encrypt into the serialized form written to the store
    pub fn seal(&self, plaintext: &str) -> CryptoResult<String> {
        let encrypted = self.encrypt(plaintext)?;
        serde_json::to_string(&encrypted).map_err(|e| CryptoError::Encryption(e.to_string()))
    }

    /// Decrypt the serialized form read from the store
    pub fn open(&self, sealed: &str) -> CryptoResult<String> {
        let encrypted: EncryptedData = serde_json::from_str(sealed)
            .map_err(|e| CryptoError::InvalidData(format!("Malformed blob: {}", e)))?;
        self.decrypt(&encrypted)
    }
}

/// Machine identifier: hostname plus user name
fn get_machine_id() -> String {
    let hostname = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown-host".to_string());
    let username = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown-user".to_string());

    format!("{}-{}", hostname, username)
}

/// Derive an encryption key from a secret using SHA-256
fn derive_key(secret: &str) -> [u8; KEY_SIZE] {
    let mut hasher = sha2::Sha256::new();
    hasher.update(APP_SALT);
    hasher.update(secret.as_bytes());
    hasher.update(APP_SALT);

    let result = hasher.finalize();

    let mut key = [0u8; KEY_SIZE];
    key.copy_from_slice(&result);
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encrypt_decrypt() {
        let cipher = ConfigCipher::from_secret("test-secret");
        let plaintext = r#"{"accessKeyId":"LTAI123"}"#;

        let encrypted = cipher.encrypt(plaintext).expect("Encryption should succeed");
        let decrypted = cipher.decrypt(&encrypted).expect("Decryption should succeed");

        assert_eq!(plaintext, decrypted);
    }

    #[test]
    fn test_seal_uses_fresh_nonce() {
        let cipher = ConfigCipher::from_secret("test-secret");
        let a = cipher.seal("same").unwrap();
        let b = cipher.seal("same").unwrap();
        assert_ne!(a, b);
        assert_eq!(cipher.open(&a).unwrap(), "same");
        assert_eq!(cipher.open(&b).unwrap(), "same");
    }

    #[test]
    fn test_wrong_key_fails() {
        let sealed = ConfigCipher::from_secret("one").seal("secret").unwrap();
        let result = ConfigCipher::from_secret("two").open(&sealed);
        assert!(matches!(result, Err(CryptoError::Decryption(_))));
    }

    #[test]
    fn test_garbage_blob_is_invalid_data() {
        let cipher = ConfigCipher::from_secret("k");
        assert!(matches!(cipher.open("U2FsdGVkX1+legacy"), Err(CryptoError::InvalidData(_))));
    }

    #[test]
    fn test_machine_key_consistency() {
        let a = ConfigCipher::from_machine();
        let b = ConfigCipher::from_machine();
        let sealed = a.seal("x").unwrap();
        assert_eq!(b.open(&sealed).unwrap(), "x");
    }
}
