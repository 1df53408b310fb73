use std::collections::HashMap;

use futures::future::BoxFuture;

use frog_core::error::{FrogError, Result};
use frog_core::traits::{SecretStore, SecretValue};

/// Secret store returning scripted per-key outcomes.
#[derive(Default)]
pub struct FakeSecretStore {
    accounts: HashMap<String, HashMap<String, SecretValue>>,
    unavailable: bool,
}

impl FakeSecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose every lookup fails.
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    pub fn with_secret(mut self, account: &str, key: &str, value: &str) -> Self {
        self.accounts
            .entry(account.to_string())
            .or_default()
            .insert(key.to_string(), SecretValue::Decrypted(value.to_string()));
        self
    }

    pub fn with_undecryptable(mut self, account: &str, key: &str, reason: &str) -> Self {
        self.accounts.entry(account.to_string()).or_default().insert(
            key.to_string(),
            SecretValue::Undecryptable {
                reason: reason.to_string(),
            },
        );
        self
    }
}

impl SecretStore for FakeSecretStore {
    fn get(&self, account_id: &str) -> BoxFuture<'_, Result<HashMap<String, SecretValue>>> {
        let account_id = account_id.to_string();
        Box::pin(async move {
            if self.unavailable {
                return Err(FrogError::Secret("secret store unavailable".into()));
            }
            Ok(self.accounts.get(&account_id).cloned().unwrap_or_default())
        })
    }
}
