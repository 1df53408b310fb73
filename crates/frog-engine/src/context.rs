use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use frog_core::config::SecretPolicy;
use frog_core::error::{FrogError, Result};
use frog_core::traits::{SecretStore, SecretValue};
use frog_core::{ExecutionContext, Workflow};

/// Builds the per-run [`ExecutionContext`], injecting decrypted secrets.
///
/// The store and the shared secrets are handed in explicitly; nothing here
/// reaches for process-wide state.
pub struct ContextBuilder {
    store: Option<Arc<dyn SecretStore>>,
    shared: HashMap<String, String>,
    policy: SecretPolicy,
}

impl ContextBuilder {
    pub fn new() -> Self {
        Self {
            store: None,
            shared: HashMap::new(),
            policy: SecretPolicy::default(),
        }
    }

    pub fn with_store(mut self, store: Arc<dyn SecretStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Secrets injected into every account's context, e.g. a provider key.
    pub fn with_shared_secrets(mut self, shared: HashMap<String, String>) -> Self {
        self.shared = shared;
        self
    }

    pub fn with_policy(mut self, policy: SecretPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Create a fresh context for one run of `workflow`.
    ///
    /// Without an account the context carries no secrets at all. With one,
    /// shared secrets are merged first and account secrets override them.
    /// Entries the store could not decrypt are skipped and named in
    /// `degraded_secrets` under the lenient policy; the strict policy fails
    /// the build instead.
    pub async fn build(
        &self,
        workflow: &Workflow,
        account_id: Option<&str>,
    ) -> Result<ExecutionContext> {
        let Some(account_id) = account_id else {
            let ctx = ExecutionContext::new(None);
            debug!(request_id = %ctx.request_id(), workflow_id = %workflow.id, "Context built without account");
            return Ok(ctx);
        };

        let mut secrets = self.shared.clone();
        let mut degraded = Vec::new();

        let stored = match &self.store {
            Some(store) => match store.get(account_id).await {
                Ok(stored) => stored,
                Err(e) if self.policy == SecretPolicy::Lenient => {
                    warn!(account_id, error = %e, "Secret store unavailable, continuing without account secrets");
                    HashMap::new()
                }
                Err(e) => return Err(e),
            },
            None => HashMap::new(),
        };

        let mut entries: Vec<(String, SecretValue)> = stored.into_iter().collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        for (key, value) in entries {
            match value {
                SecretValue::Decrypted(plain) => {
                    secrets.insert(key, plain);
                }
                SecretValue::Undecryptable { reason } => match self.policy {
                    SecretPolicy::Lenient => {
                        warn!(account_id, secret = %key, reason = %reason, "Skipping undecryptable secret");
                        degraded.push(key);
                    }
                    SecretPolicy::Strict => {
                        return Err(FrogError::Secret(format!(
                            "secret '{}' for account '{}' could not be decrypted: {}",
                            key, account_id, reason
                        )));
                    }
                },
            }
        }

        let ctx = ExecutionContext::new(Some(account_id.to_string())).with_secrets(secrets, degraded);
        debug!(
            request_id = %ctx.request_id(),
            workflow_id = %workflow.id,
            account_id,
            secrets = ?ctx.secret_keys(),
            degraded = ctx.degraded_secrets().len(),
            "Context built"
        );
        Ok(ctx)
    }
}

impl Default for ContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}
