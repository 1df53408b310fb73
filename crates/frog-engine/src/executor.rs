use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use tracing::{debug, info, warn};

use frog_core::error::{FrogError, Result};
use frog_core::schema::DEPENDENCY_PREFIX;
use frog_core::{ExecutionContext, LogEntry, NodeResult, Workflow};
use frog_tools::ToolRegistry;

/// Runs one workflow node against the tool registry.
pub struct NodeExecutor {
    registry: Arc<ToolRegistry>,
}

impl NodeExecutor {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// Execute `node_id` given the results of nodes that already ran.
    ///
    /// Tool failures of any kind (unknown type, rejected parameters, timeout,
    /// execution error) come back as an error-tagged result, never as `Err`.
    /// `Err` is reserved for a node that is missing from the workflow or
    /// scheduled before its dependencies, both of which indicate a scheduler bug.
    pub async fn execute(
        &self,
        node_id: &str,
        workflow: &Workflow,
        ctx: &ExecutionContext,
        prior: &HashMap<String, NodeResult>,
    ) -> Result<NodeResult> {
        let node = workflow
            .node(node_id)
            .ok_or_else(|| FrogError::NodeNotFound(node_id.to_string()))?;

        let mut params = node.tool.parameters.clone();
        for dep in &node.depends_on {
            let result = prior.get(dep).ok_or_else(|| FrogError::UnsatisfiedDependency {
                node: node_id.to_string(),
                dependency: dep.clone(),
            })?;
            params.insert(
                format!("{}{}", DEPENDENCY_PREFIX, dep),
                Value::Object(result.as_map().clone()),
            );
        }

        let tool_type = node.tool.tool_type.as_str();
        info!(request_id = %ctx.request_id(), node_id, tool = tool_type, "Executing node");

        let start = Instant::now();
        let outcome = self.registry.execute(tool_type, params, ctx.clone()).await;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        let result = match outcome {
            Ok(result) => result,
            Err(e) => {
                warn!(request_id = %ctx.request_id(), node_id, tool = tool_type, error = %e, "Node failed");
                NodeResult::failure(node_id, e.to_string())
            }
        };

        let entry = match result.error() {
            Some(err) => LogEntry::node_error(node_id, tool_type, &err, elapsed_ms),
            None => LogEntry::node_success(node_id, tool_type, elapsed_ms),
        };
        ctx.append_log(entry).await;

        debug!(node_id, elapsed_ms, failed = result.is_error(), "Node execution complete");
        Ok(result)
    }
}
