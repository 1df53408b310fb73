use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{FrogError, Result};

/// Top-level frog configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub vault: VaultConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub log: LogConfig,
}

/// How the Context Builder treats secrets that fail to decrypt.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SecretPolicy {
    /// Omit the entry and record its name as degraded.
    #[default]
    Lenient,
    /// Refuse to build the context.
    Strict,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Nodes allowed in flight at once. 1 keeps execution strictly sequential.
    #[serde(default = "default_max_parallel")]
    pub max_parallel: usize,
    /// Upper bound on any single tool invocation.
    #[serde(default = "default_tool_timeout")]
    pub tool_timeout_secs: u64,
    #[serde(default)]
    pub secret_policy: SecretPolicy,
    /// Capacity of the per-run event channel.
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_parallel: default_max_parallel(),
            tool_timeout_secs: default_tool_timeout(),
            secret_policy: SecretPolicy::default(),
            event_buffer: default_event_buffer(),
        }
    }
}

fn default_max_parallel() -> usize { 1 }
fn default_tool_timeout() -> u64 { 30 }
fn default_event_buffer() -> usize { 64 }

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VaultConfig {
    /// Base64-encoded 32-byte key used to decrypt account secrets.
    #[serde(default)]
    pub key: Option<String>,
    /// Secrets injected into every run that has an account (plaintext).
    #[serde(default)]
    pub shared: HashMap<String, String>,
    /// Per-account secrets: account id -> key -> ciphertext.
    #[serde(default)]
    pub accounts: HashMap<String, HashMap<String, String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,
    /// Response text beyond this many characters is cut.
    #[serde(default = "default_http_max_body_chars")]
    pub http_max_body_chars: usize,
    #[serde(default = "default_search_results_max")]
    pub search_results_max: usize,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            http_timeout_secs: default_http_timeout(),
            http_max_body_chars: default_http_max_body_chars(),
            search_results_max: default_search_results_max(),
        }
    }
}

fn default_http_timeout() -> u64 { 30 }
fn default_http_max_body_chars() -> usize { 1000 }
fn default_search_results_max() -> usize { 3 }

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String { "127.0.0.1:8000".to_string() }

/// JSONL audit log of run events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            log_dir: default_log_dir(),
        }
    }
}

fn default_log_dir() -> String { "./logs".to_string() }

impl AppConfig {
    /// Load config from a TOML file, with env var expansion.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|_| FrogError::ConfigNotFound(path.display().to_string()))?;

        Self::parse(&content)
    }

    /// Parse TOML text, expanding `${ENV_VAR}` references first.
    pub fn parse(content: &str) -> Result<Self> {
        let expanded = expand_env_vars(content);

        toml::from_str(&expanded)
            .map_err(|e| FrogError::Config(e.to_string()))
    }

    /// Load the file if it exists, otherwise start from defaults; then apply
    /// environment overrides.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            Self::load(path)?
        } else {
            debug!(path = %path.display(), "Config file not found, using defaults");
            Self::default()
        };
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Apply `FROG_*` and provider-key environment variables.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(key) = std::env::var("FROG_VAULT_KEY") {
            self.vault.key = Some(key);
        }
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            self.vault.shared.insert("OPENAI_API_KEY".to_string(), key);
        }
        if let Ok(bind) = std::env::var("FROG_BIND") {
            self.gateway.bind = bind;
        }
        if let Ok(raw) = std::env::var("FROG_MAX_PARALLEL") {
            self.engine.max_parallel = raw
                .parse()
                .map_err(|_| FrogError::Config(format!("FROG_MAX_PARALLEL is not a number: {raw}")))?;
        }
        Ok(())
    }

    pub fn log_dir(&self) -> PathBuf {
        PathBuf::from(&self.log.log_dir)
    }
}

/// Expand `${ENV_VAR}` patterns in a string.
fn expand_env_vars(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '$' && chars.peek() == Some(&'{') {
            chars.next(); // consume '{'
            let mut var_name = String::new();
            for c in chars.by_ref() {
                if c == '}' {
                    break;
                }
                var_name.push(c);
            }
            match std::env::var(&var_name) {
                Ok(val) => result.push_str(&val),
                Err(_) => {
                    // Keep original if env var not set
                    result.push_str(&format!("${{{}}}", var_name));
                }
            }
        } else {
            result.push(c);
        }
    }
    result
}
