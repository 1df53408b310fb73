use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::BoxFuture;
use serde_json::{json, Map, Value};

use frog_core::error::{FrogError, Result};
use frog_core::traits::Tool;
use frog_core::{ExecutionContext, NodeResult};

type CallLog = Arc<Mutex<Vec<Map<String, Value>>>>;

/// Returns a fixed result and records every parameter map it receives.
pub struct MockTool {
    name: String,
    result: Value,
    calls: CallLog,
}

impl MockTool {
    pub fn new(name: impl Into<String>, result: Value) -> Self {
        Self {
            name: name.into(),
            result,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Handle on the recorded calls; stays valid after the tool is registered.
    pub fn calls(&self) -> CallLog {
        self.calls.clone()
    }
}

impl Tool for MockTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Mock tool returning a fixed result"
    }

    fn execute(
        &self,
        params: Map<String, Value>,
        _ctx: ExecutionContext,
    ) -> BoxFuture<'_, Result<NodeResult>> {
        Box::pin(async move {
            if let Ok(mut calls) = self.calls.lock() {
                calls.push(params);
            }
            Ok(NodeResult::from_value(self.result.clone()))
        })
    }
}

/// Always fails with `ToolExecution`.
pub struct FailingTool {
    name: String,
    message: String,
}

impl FailingTool {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
        }
    }
}

impl Tool for FailingTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Mock tool that always fails"
    }

    fn execute(
        &self,
        _params: Map<String, Value>,
        _ctx: ExecutionContext,
    ) -> BoxFuture<'_, Result<NodeResult>> {
        Box::pin(async move {
            Err(FrogError::ToolExecution {
                tool: self.name.clone(),
                message: self.message.clone(),
            })
        })
    }
}

/// Panics when executed.
pub struct PanicTool {
    name: String,
    message: String,
}

impl PanicTool {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
        }
    }
}

impl Tool for PanicTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Mock tool that panics"
    }

    fn execute(
        &self,
        _params: Map<String, Value>,
        _ctx: ExecutionContext,
    ) -> BoxFuture<'_, Result<NodeResult>> {
        Box::pin(async move { panic!("{}", self.message) })
    }
}

/// Sleeps for a fixed duration before succeeding.
pub struct SlowTool {
    name: String,
    delay: Duration,
}

impl SlowTool {
    pub fn new(name: impl Into<String>, delay: Duration) -> Self {
        Self {
            name: name.into(),
            delay,
        }
    }
}

impl Tool for SlowTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Mock tool that sleeps before answering"
    }

    fn execute(
        &self,
        _params: Map<String, Value>,
        _ctx: ExecutionContext,
    ) -> BoxFuture<'_, Result<NodeResult>> {
        Box::pin(async move {
            tokio::time::sleep(self.delay).await;
            Ok(NodeResult::new().with("slept_ms", json!(self.delay.as_millis() as u64)))
        })
    }
}

/// Reports what the execution context exposes to tools.
///
/// Secret values are returned too, so tests can assert isolation between runs.
pub struct ContextProbeTool;

impl ContextProbeTool {
    pub const NAME: &'static str = "probe.context";
}

impl Tool for ContextProbeTool {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Echo the request id, account and secrets visible to tools"
    }

    fn execute(
        &self,
        _params: Map<String, Value>,
        ctx: ExecutionContext,
    ) -> BoxFuture<'_, Result<NodeResult>> {
        Box::pin(async move {
            let secrets: Map<String, Value> = ctx
                .secrets()
                .iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect();
            Ok(NodeResult::new()
                .with("request_id", json!(ctx.request_id().as_str()))
                .with("account_id", json!(ctx.account_id()))
                .with("secrets", Value::Object(secrets))
                .with("degraded_secrets", json!(ctx.degraded_secrets())))
        })
    }
}
