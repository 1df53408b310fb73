use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A tool invocation: which capability to call and with what parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolDefinition {
    /// Capability identifier, e.g. `browser.search`.
    #[serde(rename = "type")]
    pub tool_type: String,
    /// Tool-specific parameters.
    #[serde(default)]
    pub parameters: serde_json::Map<String, serde_json::Value>,
}

impl ToolDefinition {
    pub fn new(tool_type: impl Into<String>) -> Self {
        Self {
            tool_type: tool_type.into(),
            parameters: serde_json::Map::new(),
        }
    }

    /// Set a single parameter.
    pub fn with_param(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.parameters.insert(key.into(), value);
        self
    }
}

/// A node in the workflow DAG.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkflowNode {
    /// Unique identifier within the workflow.
    pub id: String,
    /// The tool this node invokes.
    pub tool: ToolDefinition,
    /// Node ids that must complete before this one runs.
    #[serde(default)]
    pub depends_on: Vec<String>,
    /// Reserved; carried through serialization but not evaluated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

impl WorkflowNode {
    pub fn new(id: impl Into<String>, tool: ToolDefinition) -> Self {
        Self {
            id: id.into(),
            tool,
            depends_on: vec![],
            condition: None,
        }
    }

    /// Set the dependency list.
    pub fn depends_on<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.depends_on = deps.into_iter().map(Into::into).collect();
        self
    }

    /// Set the (reserved) condition expression.
    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }
}

/// A declarative workflow: an ordered list of nodes forming a DAG.
///
/// Declaration order matters. It breaks ties in the scheduler and fixes
/// the line order of the completion summary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Workflow {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub nodes: Vec<WorkflowNode>,
}

impl Workflow {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            nodes: vec![],
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Append a node.
    pub fn with_node(mut self, node: WorkflowNode) -> Self {
        self.nodes.push(node);
        self
    }

    /// Look up a node by id.
    pub fn node(&self, id: &str) -> Option<&WorkflowNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Position of a node in declaration order.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.nodes.iter().position(|n| n.id == id)
    }

    pub fn from_json(input: &str) -> Result<Self> {
        Ok(serde_json::from_str(input)?)
    }
}
