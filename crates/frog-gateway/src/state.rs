use std::path::PathBuf;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use frog_core::config::GatewayConfig;
use frog_core::{EventBus, RequestId};
use frog_engine::{ContextBuilder, RunLogger, WorkflowRunner};

/// Shared application state for axum handlers.
pub struct AppState {
    pub config: GatewayConfig,
    pub runner: Arc<WorkflowRunner>,
    pub contexts: Arc<ContextBuilder>,
    pub event_bus: Arc<EventBus>,
    /// Where per-run JSONL logs go; `None` disables them.
    pub run_log_dir: Option<PathBuf>,
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Start the JSONL logger for a run about to begin, if enabled.
    pub fn start_run_log(&self, request_id: &RequestId) {
        if let Some(dir) = &self.run_log_dir {
            RunLogger::new(dir.clone()).spawn(
                &self.event_bus,
                request_id.clone(),
                self.shutdown.child_token(),
            );
        }
    }
}
