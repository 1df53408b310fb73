use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use uuid::Uuid;

/// Unique identifier of one workflow run.
///
/// Tool implementations key pooled external resources by this id, so it must
/// never repeat across concurrently active runs.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct RequestId(pub String);

impl RequestId {
    pub fn new() -> Self {
        Self(format!("req_{}", Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Output of one node: a string-keyed map.
///
/// By convention an `"error"` key marks failure without aborting the run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeResult(pub Map<String, Value>);

impl NodeResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Error-tagged result: `{"error": message, "node_id": node_id}`.
    pub fn failure(node_id: &str, message: impl Into<String>) -> Self {
        Self::new()
            .with("error", Value::String(message.into()))
            .with("node_id", Value::String(node_id.to_string()))
    }

    /// Wrap an arbitrary JSON value. Objects are used as-is, anything else
    /// lands under `"output"`.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            other => Self::new().with("output", other),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: Value) -> Self {
        self.0.insert(key.into(), value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn is_error(&self) -> bool {
        self.0.contains_key("error")
    }

    /// The captured error text, if this result is error-tagged.
    pub fn error(&self) -> Option<String> {
        self.0.get("error").map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

/// Outcome recorded in the execution log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogStatus {
    Success,
    Error,
    Info,
}

/// One structured entry of the execution log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    pub tool_type: String,
    pub status: LogStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elapsed_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<Value>,
    pub timestamp: DateTime<Utc>,
}

impl LogEntry {
    pub fn node_success(node_id: &str, tool_type: &str, elapsed_ms: u64) -> Self {
        Self {
            node_id: Some(node_id.to_string()),
            tool_type: tool_type.to_string(),
            status: LogStatus::Success,
            error: None,
            elapsed_ms: Some(elapsed_ms),
            detail: None,
            timestamp: Utc::now(),
        }
    }

    pub fn node_error(node_id: &str, tool_type: &str, error: &str, elapsed_ms: u64) -> Self {
        Self {
            node_id: Some(node_id.to_string()),
            tool_type: tool_type.to_string(),
            status: LogStatus::Error,
            error: Some(error.to_string()),
            elapsed_ms: Some(elapsed_ms),
            detail: None,
            timestamp: Utc::now(),
        }
    }

    /// Informational entry written by a tool about its own work.
    pub fn tool_info(tool_type: &str, detail: Value) -> Self {
        Self {
            node_id: None,
            tool_type: tool_type.to_string(),
            status: LogStatus::Info,
            error: None,
            elapsed_ms: None,
            detail: Some(detail),
            timestamp: Utc::now(),
        }
    }
}

/// Per-run execution context handed to every tool invocation.
///
/// Cloning is cheap and every clone refers to the same run state, so branches
/// running concurrently observe each other's variable writes. Secrets are fixed
/// at construction and read-only afterwards. The log only grows.
#[derive(Clone)]
pub struct ExecutionContext {
    request_id: RequestId,
    account_id: Option<String>,
    secrets: Arc<HashMap<String, String>>,
    degraded_secrets: Arc<Vec<String>>,
    variables: Arc<Mutex<Map<String, Value>>>,
    log: Arc<Mutex<Vec<LogEntry>>>,
}

impl ExecutionContext {
    /// A fresh context with a new request id and no secrets.
    pub fn new(account_id: Option<String>) -> Self {
        Self {
            request_id: RequestId::new(),
            account_id,
            secrets: Arc::new(HashMap::new()),
            degraded_secrets: Arc::new(Vec::new()),
            variables: Arc::new(Mutex::new(Map::new())),
            log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Attach the decrypted secrets and the names of entries that could not be decrypted.
    pub fn with_secrets(mut self, secrets: HashMap<String, String>, degraded: Vec<String>) -> Self {
        self.secrets = Arc::new(secrets);
        self.degraded_secrets = Arc::new(degraded);
        self
    }

    pub fn request_id(&self) -> &RequestId {
        &self.request_id
    }

    pub fn account_id(&self) -> Option<&str> {
        self.account_id.as_deref()
    }

    pub fn secret(&self, key: &str) -> Option<&str> {
        self.secrets.get(key).map(String::as_str)
    }

    pub fn secrets(&self) -> &HashMap<String, String> {
        &self.secrets
    }

    /// Secret names, sorted. Values never leave the context through this.
    pub fn secret_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.secrets.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    pub fn degraded_secrets(&self) -> &[String] {
        &self.degraded_secrets
    }

    pub async fn set_variable(&self, key: impl Into<String>, value: Value) {
        self.variables.lock().await.insert(key.into(), value);
    }

    pub async fn variable(&self, key: &str) -> Option<Value> {
        self.variables.lock().await.get(key).cloned()
    }

    pub async fn variables(&self) -> Map<String, Value> {
        self.variables.lock().await.clone()
    }

    pub async fn append_log(&self, entry: LogEntry) {
        self.log.lock().await.push(entry);
    }

    pub async fn execution_log(&self) -> Vec<LogEntry> {
        self.log.lock().await.clone()
    }

    pub async fn log_len(&self) -> usize {
        self.log.lock().await.len()
    }
}

impl std::fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("request_id", &self.request_id)
            .field("account_id", &self.account_id)
            .field("secrets", &self.secret_keys())
            .field("degraded_secrets", &self.degraded_secrets)
            .finish()
    }
}
