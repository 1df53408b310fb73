use std::collections::HashMap;

use futures::future::BoxFuture;
use tokio::sync::RwLock;
use tracing::debug;

use frog_core::config::VaultConfig;
use frog_core::error::{FrogError, Result};
use frog_core::traits::{SecretStore, SecretValue};

use crate::cipher::SecretCipher;

/// Process-local secret store: account id -> key -> ciphertext.
///
/// Values stay encrypted at rest and are decrypted on every read.
pub struct InMemorySecretStore {
    cipher: Option<SecretCipher>,
    accounts: RwLock<HashMap<String, HashMap<String, String>>>,
}

impl InMemorySecretStore {
    /// A store sealing values with the given cipher.
    pub fn new(cipher: SecretCipher) -> Self {
        Self {
            cipher: Some(cipher),
            accounts: RwLock::new(HashMap::new()),
        }
    }

    /// Build from the `[vault]` config section.
    ///
    /// Without a key the store can still be read, but every entry reports
    /// as undecryptable and `put` fails.
    pub fn from_config(config: &VaultConfig) -> Result<Self> {
        let cipher = match config.key.as_deref() {
            Some(key) => Some(SecretCipher::from_base64_key(key)?),
            None => None,
        };
        let accounts: HashMap<String, HashMap<String, String>> = config.accounts.clone();
        debug!(accounts = accounts.len(), "Secret store loaded from config");
        Ok(Self {
            cipher,
            accounts: RwLock::new(accounts),
        })
    }

    /// Encrypt and store a secret for an account.
    pub async fn put(&self, account_id: &str, key: &str, value: &str) -> Result<()> {
        let cipher = self
            .cipher
            .as_ref()
            .ok_or_else(|| FrogError::Secret("no vault key configured".to_string()))?;
        let sealed = cipher.encrypt(value)?;
        self.insert_ciphertext(account_id, key, sealed).await;
        Ok(())
    }

    /// Store an already-encrypted value as-is.
    pub async fn insert_ciphertext(&self, account_id: &str, key: &str, ciphertext: String) {
        self.accounts
            .write()
            .await
            .entry(account_id.to_string())
            .or_default()
            .insert(key.to_string(), ciphertext);
    }

    /// Remove a secret. Returns whether it existed.
    pub async fn remove(&self, account_id: &str, key: &str) -> bool {
        let mut accounts = self.accounts.write().await;
        let Some(entries) = accounts.get_mut(account_id) else {
            return false;
        };
        let removed = entries.remove(key).is_some();
        if entries.is_empty() {
            accounts.remove(account_id);
        }
        removed
    }

    fn open(&self, ciphertext: &str) -> SecretValue {
        match &self.cipher {
            Some(cipher) => match cipher.decrypt(ciphertext) {
                Ok(value) => SecretValue::Decrypted(value),
                Err(e) => SecretValue::Undecryptable {
                    reason: e.to_string(),
                },
            },
            None => SecretValue::Undecryptable {
                reason: "no vault key configured".to_string(),
            },
        }
    }
}

impl SecretStore for InMemorySecretStore {
    fn get(&self, account_id: &str) -> BoxFuture<'_, Result<HashMap<String, SecretValue>>> {
        let account_id = account_id.to_string();
        Box::pin(async move {
            let accounts = self.accounts.read().await;
            let Some(entries) = accounts.get(&account_id) else {
                return Ok(HashMap::new());
            };
            Ok(entries
                .iter()
                .map(|(key, sealed)| (key.clone(), self.open(sealed)))
                .collect())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cipher::generate_key;

    fn store() -> InMemorySecretStore {
        InMemorySecretStore::new(SecretCipher::from_base64_key(&generate_key()).unwrap())
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let store = store();
        store.put("acct_1", "GITHUB_TOKEN", "ghp_abc").await.unwrap();

        let secrets = store.get("acct_1").await.unwrap();
        assert_eq!(
            secrets.get("GITHUB_TOKEN"),
            Some(&SecretValue::Decrypted("ghp_abc".into()))
        );
    }

    #[tokio::test]
    async fn test_unknown_account_is_empty() {
        let store = store();
        assert!(store.get("nobody").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_accounts_are_isolated() {
        let store = store();
        store.put("a", "K1", "v1").await.unwrap();
        store.put("b", "K2", "v2").await.unwrap();

        let a = store.get("a").await.unwrap();
        let b = store.get("b").await.unwrap();
        assert!(a.contains_key("K1") && !a.contains_key("K2"));
        assert!(b.contains_key("K2") && !b.contains_key("K1"));
    }

    #[tokio::test]
    async fn test_corrupt_entry_reported_per_key() {
        let store = store();
        store.put("acct", "GOOD", "fine").await.unwrap();
        store
            .insert_ciphertext("acct", "BAD", "definitely-not-ciphertext".into())
            .await;

        let secrets = store.get("acct").await.unwrap();
        assert_eq!(secrets["GOOD"], SecretValue::Decrypted("fine".into()));
        assert!(matches!(secrets["BAD"], SecretValue::Undecryptable { .. }));
    }

    #[tokio::test]
    async fn test_config_without_key() {
        let mut config = VaultConfig::default();
        config
            .accounts
            .entry("acct".into())
            .or_default()
            .insert("TOKEN".into(), "c2VhbGVk".into());
        let store = InMemorySecretStore::from_config(&config).unwrap();

        let secrets = store.get("acct").await.unwrap();
        assert!(matches!(secrets["TOKEN"], SecretValue::Undecryptable { .. }));
        assert!(store.put("acct", "NEW", "v").await.is_err());
    }

    #[tokio::test]
    async fn test_config_with_sealed_values() {
        let key = generate_key();
        let sealed = SecretCipher::from_base64_key(&key)
            .unwrap()
            .encrypt("from-config")
            .unwrap();
        let mut config = VaultConfig {
            key: Some(key),
            ..Default::default()
        };
        config
            .accounts
            .entry("acct".into())
            .or_default()
            .insert("TOKEN".into(), sealed);

        let store = InMemorySecretStore::from_config(&config).unwrap();
        let secrets = store.get("acct").await.unwrap();
        assert_eq!(secrets["TOKEN"], SecretValue::Decrypted("from-config".into()));
    }

    #[tokio::test]
    async fn test_remove() {
        let store = store();
        store.put("acct", "K", "v").await.unwrap();
        assert!(store.remove("acct", "K").await);
        assert!(!store.remove("acct", "K").await);
        assert!(store.get("acct").await.unwrap().is_empty());
    }
}
