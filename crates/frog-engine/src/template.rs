use serde_json::json;

use frog_core::{ToolDefinition, Workflow, WorkflowNode};

/// The graph used when a caller supplies no workflow: think, then plan, then execute.
pub fn default_workflow(prompt: &str) -> Workflow {
    Workflow::new("default", "Default Workflow")
        .with_description("Think about the request, plan the steps, then carry them out")
        .with_node(WorkflowNode::new(
            "think",
            ToolDefinition::new("planner.think").with_param("prompt", json!(prompt)),
        ))
        .with_node(
            WorkflowNode::new(
                "plan",
                ToolDefinition::new("planner.plan").with_param("goal", json!(prompt)),
            )
            .depends_on(["think"]),
        )
        .with_node(
            WorkflowNode::new("execute", ToolDefinition::new("planner.execute"))
                .depends_on(["plan"]),
        )
}
