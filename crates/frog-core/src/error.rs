use thiserror::Error;

#[derive(Debug, Error)]
pub enum FrogError {
    // Workflow structure errors
    #[error("Invalid workflow DAG: node '{node}' depends on unknown node '{dependency}'")]
    DanglingDependency { node: String, dependency: String },

    #[error("Invalid workflow DAG: duplicate node id '{0}'")]
    DuplicateNode(String),

    #[error("Workflow contains cycles: {}", nodes.join(" -> "))]
    Cycle { nodes: Vec<String> },

    // Scheduler invariants
    #[error("Node {0} not found in workflow")]
    NodeNotFound(String),

    #[error("Dependency {dependency} not satisfied for node {node}")]
    UnsatisfiedDependency { node: String, dependency: String },

    // Tool errors
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Tool execution failed: {tool}: {message}")]
    ToolExecution { tool: String, message: String },

    #[error("Tool input validation failed: {0}")]
    ToolValidation(String),

    #[error("Tool timeout after {timeout_secs}s: {tool}")]
    ToolTimeout { tool: String, timeout_secs: u64 },

    // Secret errors
    #[error("Secret error: {0}")]
    Secret(String),

    // Config errors
    #[error("Config error: {0}")]
    Config(String),

    #[error("Config file not found: {0}")]
    ConfigNotFound(String),

    // Gateway errors
    #[error("Gateway error: {0}")]
    Gateway(String),

    // Internal errors
    #[error("Internal error: {0}")]
    Internal(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // JSON errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FrogError {
    /// Whether this error aborts the whole run rather than a single node.
    ///
    /// Tool-level failures are downgraded to error-tagged node results by the
    /// executor; everything else short-circuits with a `workflow_error` event.
    pub fn is_workflow_level(&self) -> bool {
        !matches!(
            self,
            Self::UnknownTool(_)
                | Self::ToolExecution { .. }
                | Self::ToolValidation(_)
                | Self::ToolTimeout { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, FrogError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_message_lists_path() {
        let err = FrogError::Cycle {
            nodes: vec!["a".into(), "b".into(), "a".into()],
        };
        assert_eq!(err.to_string(), "Workflow contains cycles: a -> b -> a");
    }

    #[test]
    fn test_error_levels() {
        assert!(!FrogError::UnknownTool("x".into()).is_workflow_level());
        assert!(!FrogError::ToolTimeout {
            tool: "x".into(),
            timeout_secs: 1
        }
        .is_workflow_level());
        assert!(FrogError::Cycle { nodes: vec![] }.is_workflow_level());
        assert!(FrogError::NodeNotFound("n".into()).is_workflow_level());
    }
}
