use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use frog_core::config::ToolsConfig;
use frog_core::error::{FrogError, Result};
use frog_core::traits::Tool;
use frog_core::{ExecutionContext, NodeResult};

/// Public description of a registered tool.
#[derive(Debug, Clone, Serialize)]
pub struct ToolInfo {
    #[serde(rename = "type")]
    pub tool_type: String,
    pub description: String,
    pub parameters: Value,
}

/// Registry of available tools, keyed by tool type.
///
/// The registry is open: any `Tool` implementation can be added without
/// touching the engine.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    timeout_ceiling_secs: u64,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
            timeout_ceiling_secs: u64::MAX,
        }
    }

    /// Cap every tool's own timeout at `secs`.
    pub fn with_timeout_ceiling(mut self, secs: u64) -> Self {
        self.timeout_ceiling_secs = secs;
        self
    }

    /// Register a tool.
    pub fn register(&mut self, tool: impl Tool) {
        self.register_arc(Arc::new(tool));
    }

    /// Register a shared tool instance.
    pub fn register_arc(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        debug!(tool = %name, "Registered tool");
        self.tools.insert(name, tool);
    }

    /// Unregister a tool by type.
    pub fn unregister(&mut self, name: &str) -> bool {
        self.tools.remove(name).is_some()
    }

    /// Get a tool by type.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// List all registered tool types, sorted.
    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Describe every tool, sorted by type.
    pub fn definitions(&self) -> Vec<ToolInfo> {
        self.list()
            .into_iter()
            .filter_map(|name| self.tools.get(name))
            .map(|t| ToolInfo {
                tool_type: t.name().to_string(),
                description: t.description().to_string(),
                parameters: t.schema().to_json_schema(),
            })
            .collect()
    }

    /// Execute a tool by type.
    ///
    /// Fails with `UnknownTool` if the type is not registered, `ToolValidation`
    /// if the parameters do not match the tool's schema, and `ToolTimeout` if
    /// the tool does not finish in time. A panicking tool surfaces as
    /// `ToolExecution`.
    pub async fn execute(
        &self,
        name: &str,
        params: Map<String, Value>,
        ctx: ExecutionContext,
    ) -> Result<NodeResult> {
        let tool = self
            .get(name)
            .ok_or_else(|| FrogError::UnknownTool(name.to_string()))?;

        tool.schema().validate(&params)?;

        let timeout_secs = tool.timeout_secs().min(self.timeout_ceiling_secs);
        let timeout = Duration::from_secs(timeout_secs);

        let guarded = AssertUnwindSafe(tool.execute(params, ctx)).catch_unwind();
        match tokio::time::timeout(timeout, guarded).await {
            Ok(Ok(result)) => result,
            Ok(Err(payload)) => {
                let message = panic_message(payload.as_ref());
                warn!(tool = name, panic = %message, "Tool panicked");
                Err(FrogError::ToolExecution {
                    tool: name.to_string(),
                    message: format!("tool panicked: {}", message),
                })
            }
            Err(_) => Err(FrogError::ToolTimeout {
                tool: name.to_string(),
                timeout_secs,
            }),
        }
    }

    /// Create a registry with all built-in tools registered.
    pub fn with_builtins(config: &ToolsConfig) -> Self {
        let mut registry = Self::new();

        // ── Search / HTTP ───────────────────────────────────────
        registry.register(crate::builtin::search::BrowserSearchTool::new(
            config.search_results_max,
        ));
        registry.register(crate::builtin::http::HttpRequestTool::new(
            config.http_timeout_secs,
            config.http_max_body_chars,
        ));

        // ── Code ────────────────────────────────────────────────
        registry.register(crate::builtin::python::PythonExecTool);

        // ── Planner template steps ──────────────────────────────
        registry.register(crate::builtin::planner::ThinkTool);
        registry.register(crate::builtin::planner::PlanTool);
        registry.register(crate::builtin::planner::ExecuteTool);

        // ── Context variables ───────────────────────────────────
        registry.register(crate::builtin::vars::VarsSetTool);
        registry.register(crate::builtin::vars::VarsGetTool);

        registry
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
