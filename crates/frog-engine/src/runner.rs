use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::{FutureExt, StreamExt};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, error, info, warn};

use frog_core::config::EngineConfig;
use frog_core::error::{FrogError, Result};
use frog_core::{EventBus, ExecutionContext, NodeResult, RequestId, RunEvent, Workflow, WorkflowEvent};
use frog_tools::ToolRegistry;

use crate::executor::NodeExecutor;
use crate::scheduler::{execution_order, ReadyQueue};
use crate::summary::summarize;
use crate::validate::validate;

/// Finite stream of one run's events. Ends right after the terminal event.
pub type EventStream = ReceiverStream<WorkflowEvent>;

/// Every event of a finished run, for callers that do not stream.
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub request_id: RequestId,
    pub events: Vec<WorkflowEvent>,
}

impl RunOutcome {
    /// Content of the summary `message` event, if the run completed.
    pub fn summary(&self) -> Option<&str> {
        self.events.iter().find_map(|e| match e {
            WorkflowEvent::Message { content, .. } => Some(content.as_str()),
            _ => None,
        })
    }

    /// The `workflow_error` text, if the run failed as a whole.
    pub fn error(&self) -> Option<&str> {
        self.events.iter().find_map(|e| match e {
            WorkflowEvent::WorkflowError { error } => Some(error.as_str()),
            _ => None,
        })
    }

    pub fn succeeded(&self) -> bool {
        matches!(self.events.last(), Some(WorkflowEvent::WorkflowComplete { .. }))
    }
}

/// Drives workflow runs and turns their progress into events.
///
/// With `max_parallel == 1` nodes run one at a time in scheduler order and
/// events follow that order exactly. With more workers, independent nodes run
/// concurrently: a node still starts only after all its dependencies have
/// completed, but events of sibling nodes may interleave.
pub struct WorkflowRunner {
    executor: Arc<NodeExecutor>,
    max_parallel: usize,
    event_buffer: usize,
    bus: Option<Arc<EventBus>>,
}

impl WorkflowRunner {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            executor: Arc::new(NodeExecutor::new(registry)),
            max_parallel: 1,
            event_buffer: 64,
            bus: None,
        }
    }

    pub fn from_config(registry: Arc<ToolRegistry>, config: &EngineConfig) -> Self {
        Self::new(registry)
            .with_max_parallel(config.max_parallel)
            .with_event_buffer(config.event_buffer)
    }

    pub fn with_max_parallel(mut self, max_parallel: usize) -> Self {
        self.max_parallel = max_parallel.max(1);
        self
    }

    pub fn with_event_buffer(mut self, event_buffer: usize) -> Self {
        self.event_buffer = event_buffer.max(1);
        self
    }

    /// Also publish every event on `bus`, tagged with the run's request id.
    pub fn with_event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.bus = Some(bus);
        self
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        self.executor.registry()
    }

    /// Start a run in the background and return its event stream.
    ///
    /// Dropping the stream does not cancel the run; it completes and its
    /// remaining events still reach the event bus.
    pub fn run(&self, workflow: Workflow, ctx: ExecutionContext) -> EventStream {
        let (tx, rx) = mpsc::channel(self.event_buffer);
        let emitter = Emitter {
            tx,
            bus: self.bus.clone(),
            request_id: ctx.request_id().clone(),
            detached: false,
        };
        tokio::spawn(drive(
            self.executor.clone(),
            self.max_parallel,
            workflow,
            ctx,
            emitter,
        ));
        ReceiverStream::new(rx)
    }

    /// Run to completion and collect every event.
    pub async fn run_collect(&self, workflow: Workflow, ctx: ExecutionContext) -> RunOutcome {
        let request_id = ctx.request_id().clone();
        let events = self.run(workflow, ctx).collect().await;
        RunOutcome { request_id, events }
    }
}

struct Emitter {
    tx: mpsc::Sender<WorkflowEvent>,
    bus: Option<Arc<EventBus>>,
    request_id: RequestId,
    detached: bool,
}

impl Emitter {
    async fn emit(&mut self, event: WorkflowEvent) {
        if let Some(bus) = &self.bus {
            bus.publish(RunEvent {
                request_id: self.request_id.clone(),
                event: event.clone(),
            });
        }
        if !self.detached && self.tx.send(event).await.is_err() {
            debug!(request_id = %self.request_id, "Event stream dropped, run continues");
            self.detached = true;
        }
    }
}

fn node_event(node_id: &str, result: &NodeResult) -> WorkflowEvent {
    match result.error() {
        Some(error) => WorkflowEvent::NodeError {
            node_id: node_id.to_string(),
            error,
        },
        None => WorkflowEvent::NodeComplete {
            node_id: node_id.to_string(),
            result: result.clone(),
        },
    }
}

/// Node-level errors become error-tagged results; the rest end the run.
fn settle(node_id: &str, outcome: Result<NodeResult>) -> Result<NodeResult> {
    match outcome {
        Err(e) if !e.is_workflow_level() => Ok(NodeResult::failure(node_id, e.to_string())),
        other => other,
    }
}

async fn drive(
    executor: Arc<NodeExecutor>,
    max_parallel: usize,
    workflow: Workflow,
    ctx: ExecutionContext,
    mut emitter: Emitter,
) {
    let request_id = ctx.request_id().clone();

    let order = match validate(&workflow).and_then(|_| execution_order(&workflow)) {
        Ok(order) => order,
        Err(e) => {
            warn!(request_id = %request_id, workflow_id = %workflow.id, error = %e, "Workflow rejected");
            emitter
                .emit(WorkflowEvent::WorkflowError {
                    error: e.to_string(),
                })
                .await;
            return;
        }
    };

    info!(
        request_id = %request_id,
        workflow_id = %workflow.id,
        nodes = order.len(),
        max_parallel,
        "Workflow started"
    );
    emitter
        .emit(WorkflowEvent::WorkflowStart {
            workflow_id: workflow.id.clone(),
            node_count: workflow.nodes.len(),
            execution_order: order.clone(),
        })
        .await;

    let workflow = Arc::new(workflow);
    // Tool panics never reach here; the registry turns them into node errors.
    let outcome = if max_parallel <= 1 {
        AssertUnwindSafe(run_sequential(&executor, &workflow, &order, &ctx, &mut emitter))
            .catch_unwind()
            .await
    } else {
        AssertUnwindSafe(run_parallel(&executor, &workflow, max_parallel, &ctx, &mut emitter))
            .catch_unwind()
            .await
    };

    let outcome = match outcome {
        Ok(result) => result,
        Err(_) => Err(FrogError::Internal("workflow run panicked".into())),
    };

    match outcome {
        Ok(results) => {
            let succeeded = results.values().filter(|r| !r.is_error()).count();
            emitter
                .emit(WorkflowEvent::assistant_message(summarize(&workflow, &results)))
                .await;
            let execution_log = ctx.execution_log().await;
            info!(
                request_id = %request_id,
                succeeded,
                total = workflow.nodes.len(),
                "Workflow complete"
            );
            emitter
                .emit(WorkflowEvent::WorkflowComplete { execution_log })
                .await;
        }
        Err(e) => {
            error!(request_id = %request_id, error = %e, "Workflow failed");
            emitter
                .emit(WorkflowEvent::WorkflowError {
                    error: e.to_string(),
                })
                .await;
        }
    }
}

async fn run_sequential(
    executor: &NodeExecutor,
    workflow: &Workflow,
    order: &[String],
    ctx: &ExecutionContext,
    emitter: &mut Emitter,
) -> Result<HashMap<String, NodeResult>> {
    let mut results = HashMap::with_capacity(order.len());
    for node_id in order {
        emitter
            .emit(WorkflowEvent::NodeStart {
                node_id: node_id.clone(),
            })
            .await;
        let result = settle(node_id, executor.execute(node_id, workflow, ctx, &results).await)?;
        emitter.emit(node_event(node_id, &result)).await;
        results.insert(node_id.clone(), result);
    }
    Ok(results)
}

async fn run_parallel(
    executor: &Arc<NodeExecutor>,
    workflow: &Arc<Workflow>,
    max_parallel: usize,
    ctx: &ExecutionContext,
    emitter: &mut Emitter,
) -> Result<HashMap<String, NodeResult>> {
    let mut queue = ReadyQueue::new(workflow)?;
    let mut results: HashMap<String, NodeResult> = HashMap::new();
    let mut tasks: JoinSet<(String, Result<NodeResult>)> = JoinSet::new();

    loop {
        while tasks.len() < max_parallel {
            let Some(node_id) = queue.pop() else {
                break;
            };
            emitter
                .emit(WorkflowEvent::NodeStart {
                    node_id: node_id.clone(),
                })
                .await;

            let prior = dependency_snapshot(workflow, &node_id, &results);
            let executor = executor.clone();
            let workflow = workflow.clone();
            let ctx = ctx.clone();
            tasks.spawn(async move {
                let result = executor.execute(&node_id, &workflow, &ctx, &prior).await;
                (node_id, result)
            });
        }

        let Some(joined) = tasks.join_next().await else {
            break;
        };
        let (node_id, result) =
            joined.map_err(|e| FrogError::Internal(format!("node task failed: {}", e)))?;
        let result = settle(&node_id, result)?;

        emitter.emit(node_event(&node_id, &result)).await;
        queue.complete(&node_id)?;
        results.insert(node_id, result);
    }

    if !queue.is_finished() {
        return Err(FrogError::Cycle {
            nodes: queue.blocked(),
        });
    }
    Ok(results)
}

/// Results of `node_id`'s dependencies, cloned for a worker task.
fn dependency_snapshot(
    workflow: &Workflow,
    node_id: &str,
    results: &HashMap<String, NodeResult>,
) -> HashMap<String, NodeResult> {
    workflow
        .node(node_id)
        .map(|node| {
            node.depends_on
                .iter()
                .filter_map(|dep| results.get(dep).map(|r| (dep.clone(), r.clone())))
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use frog_core::WorkflowNode;
    use frog_test_utils::{
        cyclic_workflow, dangling_workflow, diamond_workflow, fan_out_workflow, linear_workflow,
        mock_node, FailingTool, MockTool, PanicTool, SlowTool,
    };
    use serde_json::json;

    fn registry() -> Arc<ToolRegistry> {
        let mut registry = ToolRegistry::new();
        registry.register(MockTool::new("mock.ok", json!({"ok": true})));
        registry.register(FailingTool::new("mock.fail", "upstream exploded"));
        registry.register(SlowTool::new("mock.slow", Duration::from_millis(50)));
        Arc::new(registry)
    }

    fn kinds(events: &[WorkflowEvent]) -> Vec<&'static str> {
        events.iter().map(WorkflowEvent::kind).collect()
    }

    fn started(events: &[WorkflowEvent]) -> Vec<String> {
        events
            .iter()
            .filter_map(|e| match e {
                WorkflowEvent::NodeStart { node_id } => Some(node_id.clone()),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_sequential_event_protocol() {
        let runner = WorkflowRunner::new(registry());
        let workflow = Workflow::new("w", "Fan")
            .with_node(mock_node("A", "mock.ok", &[]))
            .with_node(mock_node("B", "mock.ok", &["A"]))
            .with_node(mock_node("C", "mock.ok", &["A"]));

        let outcome = runner.run_collect(workflow, ExecutionContext::new(None)).await;
        assert_eq!(
            kinds(&outcome.events),
            vec![
                "workflow_start",
                "node_start",
                "node_complete",
                "node_start",
                "node_complete",
                "node_start",
                "node_complete",
                "message",
                "workflow_complete",
            ]
        );
        match &outcome.events[0] {
            WorkflowEvent::WorkflowStart {
                workflow_id,
                node_count,
                execution_order,
            } => {
                assert_eq!(workflow_id, "w");
                assert_eq!(*node_count, 3);
                assert_eq!(execution_order, &vec!["A", "B", "C"]);
            }
            other => panic!("unexpected first event {:?}", other),
        }
        assert!(outcome.succeeded());
        assert!(outcome
            .summary()
            .unwrap()
            .ends_with("3/3 nodes completed successfully"));
    }

    #[tokio::test]
    async fn test_cycle_emits_single_error() {
        let runner = WorkflowRunner::new(registry());
        let outcome = runner
            .run_collect(cyclic_workflow("mock.ok"), ExecutionContext::new(None))
            .await;
        assert_eq!(kinds(&outcome.events), vec!["workflow_error"]);
        assert!(outcome.error().unwrap().contains("cycles"));
        assert!(!outcome.succeeded());
    }

    #[tokio::test]
    async fn test_dangling_rejected_before_any_node() {
        let runner = WorkflowRunner::new(registry());
        let outcome = runner
            .run_collect(dangling_workflow("mock.ok"), ExecutionContext::new(None))
            .await;
        assert_eq!(kinds(&outcome.events), vec!["workflow_error"]);
        assert!(outcome.error().unwrap().starts_with("Invalid workflow DAG"));
    }

    #[tokio::test]
    async fn test_failure_is_isolated() {
        let mut registry = ToolRegistry::new();
        let downstream = MockTool::new("mock.ok", json!({"ok": true}));
        let calls = downstream.calls();
        registry.register(downstream);
        registry.register(FailingTool::new("mock.fail", "upstream exploded"));
        let runner = WorkflowRunner::new(Arc::new(registry));

        let workflow = Workflow::new("w", "Isolation")
            .with_node(mock_node("x", "mock.fail", &[]))
            .with_node(mock_node("free", "mock.ok", &[]))
            .with_node(mock_node("y", "mock.ok", &["x"]));
        let ctx = ExecutionContext::new(None);
        let outcome = runner.run_collect(workflow, ctx.clone()).await;

        assert!(outcome.succeeded());
        assert!(outcome.events.iter().any(|e| matches!(
            e,
            WorkflowEvent::NodeError { node_id, error } if node_id == "x" && error.contains("upstream exploded")
        )));

        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        let y_params = calls.iter().find(|p| p.contains_key("dep_x")).unwrap();
        assert_eq!(y_params["dep_x"]["node_id"], json!("x"));
        assert!(y_params["dep_x"]["error"]
            .as_str()
            .unwrap()
            .contains("upstream exploded"));

        assert!(outcome
            .summary()
            .unwrap()
            .ends_with("2/3 nodes completed successfully"));
        assert_eq!(ctx.log_len().await, 3);
    }

    #[tokio::test]
    async fn test_panicking_tool_is_isolated() {
        for max_parallel in [1, 2] {
            let mut registry = ToolRegistry::new();
            registry.register(MockTool::new("mock.ok", json!({"ok": true})));
            registry.register(PanicTool::new("mock.panic", "tool blew up"));
            let runner = WorkflowRunner::new(Arc::new(registry)).with_max_parallel(max_parallel);

            let workflow = Workflow::new("w", "Panic")
                .with_node(mock_node("boom", "mock.panic", &[]))
                .with_node(mock_node("free", "mock.ok", &[]))
                .with_node(mock_node("after", "mock.ok", &["boom"]));
            let ctx = ExecutionContext::new(None);
            let outcome = runner.run_collect(workflow, ctx.clone()).await;

            assert!(outcome.succeeded(), "max_parallel={}: {:?}", max_parallel, outcome.events);
            assert!(outcome.events.iter().any(|e| matches!(
                e,
                WorkflowEvent::NodeError { node_id, error }
                    if node_id == "boom" && error.contains("tool panicked: tool blew up")
            )));
            for id in ["free", "after"] {
                assert!(outcome.events.iter().any(|e| matches!(
                    e,
                    WorkflowEvent::NodeComplete { node_id, .. } if node_id == id
                )));
            }
            assert!(outcome
                .summary()
                .unwrap()
                .ends_with("2/3 nodes completed successfully"));
            assert_eq!(ctx.log_len().await, 3);
        }
    }

    #[tokio::test]
    async fn test_execution_log_covers_every_node() {
        let runner = WorkflowRunner::new(registry());
        let outcome = runner
            .run_collect(diamond_workflow("mock.ok"), ExecutionContext::new(None))
            .await;
        match outcome.events.last() {
            Some(WorkflowEvent::WorkflowComplete { execution_log }) => {
                assert!(execution_log.len() >= 4);
                let logged: Vec<_> = execution_log
                    .iter()
                    .filter_map(|e| e.node_id.as_deref())
                    .collect();
                assert_eq!(logged, vec!["a", "b", "c", "d"]);
            }
            other => panic!("expected workflow_complete, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_error_tagged_result_reported_as_node_error() {
        let mut registry = ToolRegistry::new();
        registry.register(MockTool::new("mock.soft", json!({"error": "quota exceeded"})));
        let runner = WorkflowRunner::new(Arc::new(registry));
        let workflow = Workflow::new("w", "Soft").with_node(mock_node("s", "mock.soft", &[]));

        let outcome = runner.run_collect(workflow, ExecutionContext::new(None)).await;
        assert_eq!(
            outcome.events[2],
            WorkflowEvent::NodeError {
                node_id: "s".into(),
                error: "quota exceeded".into(),
            }
        );
    }

    #[tokio::test]
    async fn test_parallel_respects_dependencies() {
        let runner = WorkflowRunner::new(registry()).with_max_parallel(4);
        let workflow = diamond_workflow("mock.slow");
        let outcome = runner.run_collect(workflow, ExecutionContext::new(None)).await;
        assert!(outcome.succeeded());

        let position = |kind: &str, id: &str| {
            outcome
                .events
                .iter()
                .position(|e| {
                    e.kind() == kind
                        && match e {
                            WorkflowEvent::NodeStart { node_id }
                            | WorkflowEvent::NodeComplete { node_id, .. } => node_id == id,
                            _ => false,
                        }
                })
                .unwrap()
        };
        assert!(position("node_complete", "a") < position("node_start", "b"));
        assert!(position("node_complete", "a") < position("node_start", "c"));
        assert!(position("node_complete", "b") < position("node_start", "d"));
        assert!(position("node_complete", "c") < position("node_start", "d"));
        for id in ["a", "b", "c", "d"] {
            assert!(position("node_start", id) < position("node_complete", id));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_parallel_runs_siblings_concurrently() {
        let runner = WorkflowRunner::new(registry()).with_max_parallel(8);
        let workflow = fan_out_workflow("mock.slow", 6);
        let started_at = tokio::time::Instant::now();
        let outcome = runner.run_collect(workflow, ExecutionContext::new(None)).await;
        assert!(outcome.succeeded());
        // root, then all six leaves together
        assert!(started_at.elapsed() < Duration::from_millis(150));
        assert_eq!(started(&outcome.events).len(), 7);
    }

    #[tokio::test]
    async fn test_parallel_workflow_start_uses_kahn_order() {
        let runner = WorkflowRunner::new(registry()).with_max_parallel(2);
        let outcome = runner
            .run_collect(linear_workflow("mock.ok"), ExecutionContext::new(None))
            .await;
        match &outcome.events[0] {
            WorkflowEvent::WorkflowStart { execution_order, .. } => {
                assert_eq!(execution_order, &vec!["a", "b", "c"])
            }
            other => panic!("unexpected first event {:?}", other),
        }
        assert_eq!(started(&outcome.events), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_dropped_stream_does_not_cancel() {
        let bus = Arc::new(EventBus::new(64));
        let mut rx = bus.subscribe();
        let runner = WorkflowRunner::new(registry())
            .with_event_buffer(1)
            .with_event_bus(bus.clone());

        let ctx = ExecutionContext::new(None);
        let stream = runner.run(linear_workflow("mock.slow"), ctx.clone());
        drop(stream);

        loop {
            let event = rx.recv().await.unwrap();
            assert_eq!(&event.request_id, ctx.request_id());
            if event.event.is_terminal() {
                assert_eq!(event.event.kind(), "workflow_complete");
                break;
            }
        }
        assert_eq!(ctx.log_len().await, 3);
    }

    #[tokio::test]
    async fn test_condition_is_ignored() {
        let runner = WorkflowRunner::new(registry());
        let workflow = Workflow::new("w", "Cond").with_node(
            WorkflowNode::new("a", frog_core::ToolDefinition::new("mock.ok"))
                .with_condition("false"),
        );
        let outcome = runner.run_collect(workflow, ExecutionContext::new(None)).await;
        assert_eq!(started(&outcome.events), vec!["a"]);
    }
}
