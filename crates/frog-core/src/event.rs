use serde::{Deserialize, Serialize};

use crate::context::{LogEntry, NodeResult, RequestId};

/// One record of the workflow progress stream.
///
/// Serialized self-describing, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkflowEvent {
    /// Validation and scheduling succeeded; execution is about to begin.
    WorkflowStart {
        workflow_id: String,
        node_count: usize,
        execution_order: Vec<String>,
    },
    /// A node is about to execute.
    NodeStart { node_id: String },
    /// A node finished with a success payload.
    NodeComplete { node_id: String, result: NodeResult },
    /// A node finished with an error-tagged payload.
    NodeError { node_id: String, error: String },
    /// The completion summary.
    Message { content: String, role: String },
    /// Terminal success marker.
    WorkflowComplete { execution_log: Vec<LogEntry> },
    /// Terminal failure marker; nothing follows it.
    WorkflowError { error: String },
}

impl WorkflowEvent {
    pub fn assistant_message(content: impl Into<String>) -> Self {
        Self::Message {
            content: content.into(),
            role: "assistant".to_string(),
        }
    }

    /// The `type` tag as it appears on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::WorkflowStart { .. } => "workflow_start",
            Self::NodeStart { .. } => "node_start",
            Self::NodeComplete { .. } => "node_complete",
            Self::NodeError { .. } => "node_error",
            Self::Message { .. } => "message",
            Self::WorkflowComplete { .. } => "workflow_complete",
            Self::WorkflowError { .. } => "workflow_error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::WorkflowComplete { .. } | Self::WorkflowError { .. })
    }

    /// One newline-terminated JSON line.
    pub fn to_ndjson_line(&self) -> String {
        let mut line = serde_json::to_string(self).unwrap_or_else(|e| {
            serde_json::json!({"type": "workflow_error", "error": e.to_string()}).to_string()
        });
        line.push('\n');
        line
    }
}

/// A workflow event tagged with the run it belongs to.
#[derive(Debug, Clone)]
pub struct RunEvent {
    pub request_id: RequestId,
    pub event: WorkflowEvent,
}

/// Event bus using tokio broadcast channel.
/// All subscribers receive all events.
pub struct EventBus {
    tx: tokio::sync::broadcast::Sender<RunEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = tokio::sync::broadcast::channel(capacity);
        Self { tx }
    }

    pub fn publish(&self, event: RunEvent) {
        // Ignore error if no receivers
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<RunEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
