use std::collections::HashMap;

use futures::future::BoxFuture;
use serde_json::{Map, Value};

use crate::context::{ExecutionContext, NodeResult};
use crate::error::Result;
use crate::schema::ParameterSchema;

/// Tool: a capability a workflow node can invoke by type string.
pub trait Tool: Send + Sync + 'static {
    /// Tool type identifier (e.g. `browser.search`).
    fn name(&self) -> &str;

    /// Human-readable description.
    fn description(&self) -> &str;

    /// Declared parameters, validated before every dispatch.
    fn schema(&self) -> ParameterSchema {
        ParameterSchema::open()
    }

    /// Execute the tool with the node's parameters and the run context.
    ///
    /// Returning `Err` or an `"error"`-tagged result both mark the node failed.
    fn execute(
        &self,
        params: Map<String, Value>,
        ctx: ExecutionContext,
    ) -> BoxFuture<'_, Result<NodeResult>>;

    /// Timeout in seconds for this tool.
    fn timeout_secs(&self) -> u64 {
        30
    }
}

/// Per-key outcome of reading a stored secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretValue {
    Decrypted(String),
    Undecryptable { reason: String },
}

/// Secret store: per-account encrypted secrets.
pub trait SecretStore: Send + Sync + 'static {
    /// All secrets stored for an account, each decrypted independently.
    ///
    /// An unknown account yields an empty map.
    fn get(&self, account_id: &str) -> BoxFuture<'_, Result<HashMap<String, SecretValue>>>;
}
