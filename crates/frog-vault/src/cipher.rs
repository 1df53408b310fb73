use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Nonce};
use rand::RngCore;

use crate::error::{VaultError, VaultResult};

/// Key size in bytes (256 bits).
pub const KEY_SIZE: usize = 32;
/// Nonce size in bytes (96 bits).
pub const NONCE_SIZE: usize = 12;
/// Authentication tag size in bytes (128 bits).
pub const TAG_SIZE: usize = 16;

/// Generate a random vault key, base64-encoded.
pub fn generate_key() -> String {
    let mut key = [0u8; KEY_SIZE];
    rand::thread_rng().fill_bytes(&mut key);
    STANDARD.encode(key)
}

/// ChaCha20-Poly1305 sealing of secret strings.
///
/// Ciphertext text format: `base64([nonce: 12 bytes][ciphertext + tag])`.
pub struct SecretCipher {
    cipher: ChaCha20Poly1305,
}

impl SecretCipher {
    /// Build from a base64-encoded 32-byte key.
    pub fn from_base64_key(key: &str) -> VaultResult<Self> {
        let bytes = STANDARD
            .decode(key.trim())
            .map_err(|e| VaultError::InvalidKey(e.to_string()))?;
        if bytes.len() != KEY_SIZE {
            return Err(VaultError::InvalidKey(format!(
                "expected {} bytes, got {}",
                KEY_SIZE,
                bytes.len()
            )));
        }
        let cipher = ChaCha20Poly1305::new_from_slice(&bytes)
            .map_err(|e| VaultError::InvalidKey(e.to_string()))?;
        Ok(Self { cipher })
    }

    pub fn encrypt(&self, plaintext: &str) -> VaultResult<String> {
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let sealed = self
            .cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|e| VaultError::EncryptionFailed(e.to_string()))?;

        let mut out = Vec::with_capacity(NONCE_SIZE + sealed.len());
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&sealed);
        Ok(STANDARD.encode(out))
    }

    pub fn decrypt(&self, ciphertext: &str) -> VaultResult<String> {
        let raw = STANDARD.decode(ciphertext.trim())?;
        if raw.len() < NONCE_SIZE + TAG_SIZE {
            return Err(VaultError::InvalidCiphertext("ciphertext too short".to_string()));
        }

        let (nonce_bytes, sealed) = raw.split_at(NONCE_SIZE);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce_bytes), sealed)
            .map_err(|e| VaultError::DecryptionFailed(e.to_string()))?;

        String::from_utf8(plaintext).map_err(|_| VaultError::NotUtf8)
    }
}

impl std::fmt::Debug for SecretCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretCipher").finish_non_exhaustive()
    }
}
