//! Secret vault for frog.
//!
//! Secrets are sealed with ChaCha20-Poly1305 and stored per account as
//! base64 text. Reads decrypt every entry on its own, so one corrupt or
//! foreign-key entry never hides the rest of an account's secrets.

pub mod cipher;
pub mod error;
pub mod store;

pub use cipher::{generate_key, SecretCipher};
pub use error::{VaultError, VaultResult};
pub use store::InMemorySecretStore;
