use std::path::PathBuf;

use chrono::Utc;
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use frog_core::{EventBus, RequestId, RunEvent, WorkflowEvent};

/// JSONL audit trail for workflow runs.
///
/// Follows one run on the [`EventBus`] and appends one JSON object per event
/// to `{log_dir}/{request_id}.jsonl`. Each line is flushed as it is written,
/// so a crash mid-run leaves every earlier line intact.
pub struct RunLogger {
    log_dir: PathBuf,
}

/// A single line of the JSONL file.
#[derive(Serialize)]
struct LogLine {
    timestamp: String,
    request_id: String,
    event_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    node_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<serde_json::Value>,
}

impl RunLogger {
    pub fn new(log_dir: impl Into<PathBuf>) -> Self {
        Self {
            log_dir: log_dir.into(),
        }
    }

    pub fn log_path(&self, request_id: &RequestId) -> PathBuf {
        self.log_dir.join(format!("{}.jsonl", request_id))
    }

    /// Subscribe to `bus` now and write `request_id`'s events in the background.
    ///
    /// Subscribing happens before this returns, so a run started afterwards
    /// cannot publish events the logger misses. The task ends after the run's
    /// terminal event, on cancellation, or when the bus closes.
    pub fn spawn(
        self,
        bus: &EventBus,
        request_id: RequestId,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let rx = bus.subscribe();
        tokio::spawn(async move { self.run(rx, request_id, cancel).await })
    }

    async fn run(
        self,
        mut rx: broadcast::Receiver<RunEvent>,
        request_id: RequestId,
        cancel: CancellationToken,
    ) {
        if let Err(e) = tokio::fs::create_dir_all(&self.log_dir).await {
            error!(error = %e, "Failed to create log directory");
            return;
        }

        let log_path = self.log_path(&request_id);
        let file = match tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .await
        {
            Ok(f) => f,
            Err(e) => {
                error!(error = %e, path = %log_path.display(), "Failed to open run log");
                return;
            }
        };

        info!(path = %log_path.display(), "RunLogger started");
        let mut writer = tokio::io::BufWriter::new(file);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("RunLogger cancelled");
                    break;
                }
                result = rx.recv() => {
                    match result {
                        Ok(run_event) => {
                            if run_event.request_id != request_id {
                                continue;
                            }
                            let line = to_line(&run_event);
                            if let Ok(json) = serde_json::to_string(&line) {
                                if let Err(e) = writer.write_all(format!("{}\n", json).as_bytes()).await {
                                    error!(error = %e, "Failed to write run log entry");
                                    break;
                                }
                                if let Err(e) = writer.flush().await {
                                    error!(error = %e, "Failed to flush run log");
                                }
                            }
                            if run_event.event.is_terminal() {
                                break;
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            debug!(skipped = n, "RunLogger lagged, skipped events");
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            debug!("EventBus closed, RunLogger stopping");
                            break;
                        }
                    }
                }
            }
        }

        writer.flush().await.ok();
        debug!(path = %log_path.display(), "RunLogger finished");
    }
}

fn to_line(run_event: &RunEvent) -> LogLine {
    let (node_id, detail) = match &run_event.event {
        WorkflowEvent::WorkflowStart {
            workflow_id,
            node_count,
            execution_order,
        } => (
            None,
            Some(serde_json::json!({
                "workflow_id": workflow_id,
                "node_count": node_count,
                "execution_order": execution_order,
            })),
        ),
        WorkflowEvent::NodeStart { node_id } => (Some(node_id.clone()), None),
        WorkflowEvent::NodeComplete { node_id, result } => (
            Some(node_id.clone()),
            Some(serde_json::json!({
                "result": truncate_json(&result.clone().into_value(), 500),
            })),
        ),
        WorkflowEvent::NodeError { node_id, error } => (
            Some(node_id.clone()),
            Some(serde_json::json!({ "error": error })),
        ),
        WorkflowEvent::Message { content, .. } => {
            (None, Some(serde_json::json!({ "content": content })))
        }
        WorkflowEvent::WorkflowComplete { execution_log } => (
            None,
            Some(serde_json::json!({ "log_entries": execution_log.len() })),
        ),
        WorkflowEvent::WorkflowError { error } => {
            (None, Some(serde_json::json!({ "error": error })))
        }
    };

    LogLine {
        timestamp: Utc::now().to_rfc3339(),
        request_id: run_event.request_id.to_string(),
        event_type: run_event.event.kind(),
        node_id,
        detail,
    }
}

/// Truncate a JSON value for logging, on a char boundary.
fn truncate_json(value: &serde_json::Value, max_chars: usize) -> String {
    let s = value.to_string();
    if s.chars().count() <= max_chars {
        s
    } else {
        format!("{}...", s.chars().take(max_chars).collect::<String>())
    }
}
