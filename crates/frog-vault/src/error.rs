use thiserror::Error;

use frog_core::FrogError;

#[derive(Debug, Error)]
pub enum VaultError {
    #[error("invalid vault key: {0}")]
    InvalidKey(String),

    #[error("encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("decryption failed: {0}")]
    DecryptionFailed(String),

    #[error("invalid ciphertext format: {0}")]
    InvalidCiphertext(String),

    #[error("secret is not valid UTF-8")]
    NotUtf8,
}

impl From<base64::DecodeError> for VaultError {
    fn from(err: base64::DecodeError) -> Self {
        VaultError::InvalidCiphertext(err.to_string())
    }
}

impl From<VaultError> for FrogError {
    fn from(err: VaultError) -> Self {
        FrogError::Secret(err.to_string())
    }
}

pub type VaultResult<T> = Result<T, VaultError>;
