use std::sync::Arc;

use serde_json::json;

use frog_core::config::{SecretPolicy, ToolsConfig};
use frog_core::{ToolDefinition, Workflow, WorkflowEvent, WorkflowNode};
use frog_engine::{default_workflow, ContextBuilder, WorkflowRunner};
use frog_test_utils::{diamond_workflow, mock_node, ContextProbeTool, FailingTool, MockTool};
use frog_tools::ToolRegistry;
use frog_vault::{generate_key, InMemorySecretStore, SecretCipher};

fn registry() -> ToolRegistry {
    let mut registry = ToolRegistry::with_builtins(&ToolsConfig::default());
    registry.register(MockTool::new("mock.ok", json!({"ok": true})));
    registry.register(FailingTool::new("mock.fail", "upstream unavailable"));
    registry.register(ContextProbeTool);
    registry
}

fn kinds(events: &[WorkflowEvent]) -> Vec<&'static str> {
    events.iter().map(WorkflowEvent::kind).collect()
}

async fn vault() -> InMemorySecretStore {
    let cipher = SecretCipher::from_base64_key(&generate_key()).unwrap();
    let store = InMemorySecretStore::new(cipher);
    store.put("acme", "GITHUB_TOKEN", "ghp_acme").await.unwrap();
    store.put("acme", "OPENAI_API_KEY", "sk-acme").await.unwrap();
    store
        .insert_ciphertext("acme", "STALE_TOKEN", "bm90LXNlYWxlZA==".into())
        .await;
    store
}

fn probe_workflow() -> Workflow {
    Workflow::new("probe", "Probe").with_node(WorkflowNode::new(
        "p",
        ToolDefinition::new(ContextProbeTool::NAME),
    ))
}

#[tokio::test]
async fn test_vault_secrets_reach_tools() {
    let contexts = ContextBuilder::new()
        .with_store(Arc::new(vault().await))
        .with_shared_secrets(
            [
                ("OPENAI_API_KEY".to_string(), "sk-shared".to_string()),
                ("SEARCH_KEY".to_string(), "shared-search".to_string()),
            ]
            .into(),
        );
    let workflow = probe_workflow();
    let ctx = contexts.build(&workflow, Some("acme")).await.unwrap();

    let outcome = WorkflowRunner::new(Arc::new(registry()))
        .run_collect(workflow, ctx)
        .await;
    assert!(outcome.succeeded());

    let WorkflowEvent::NodeComplete { result, .. } = &outcome.events[2] else {
        panic!("expected node_complete, got {:?}", outcome.events[2]);
    };
    let secrets = result.get("secrets").unwrap();
    assert_eq!(secrets["GITHUB_TOKEN"], "ghp_acme");
    // account entries override shared ones
    assert_eq!(secrets["OPENAI_API_KEY"], "sk-acme");
    assert_eq!(secrets["SEARCH_KEY"], "shared-search");
    assert!(secrets.get("STALE_TOKEN").is_none());
    assert_eq!(result.get("degraded_secrets").unwrap(), &json!(["STALE_TOKEN"]));
}

#[tokio::test]
async fn test_strict_policy_refuses_undecryptable_secret() {
    let contexts = ContextBuilder::new()
        .with_store(Arc::new(vault().await))
        .with_policy(SecretPolicy::Strict);

    let err = contexts
        .build(&probe_workflow(), Some("acme"))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("STALE_TOKEN"));
}

#[tokio::test]
async fn test_default_template_runs_end_to_end() {
    let workflow = default_workflow("compare async runtimes for embedded targets");
    let ctx = ContextBuilder::new().build(&workflow, None).await.unwrap();

    let outcome = WorkflowRunner::new(Arc::new(registry()))
        .run_collect(workflow, ctx)
        .await;

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
    let summary = outcome.summary().unwrap();
    assert!(summary.starts_with("Workflow 'Default Workflow' completed:"));
    assert!(summary.ends_with("Execution Summary: 3/3 nodes completed successfully"));
}

#[tokio::test]
async fn test_diamond_with_failing_branch() {
    let workflow = Workflow::new("diamond", "Diamond")
        .with_node(mock_node("a", "mock.ok", &[]))
        .with_node(mock_node("b", "mock.fail", &["a"]))
        .with_node(mock_node("c", "mock.ok", &["a"]))
        .with_node(mock_node("d", "mock.ok", &["b", "c"]));
    let ctx = ContextBuilder::new().build(&workflow, None).await.unwrap();

    let outcome = WorkflowRunner::new(Arc::new(registry()))
        .with_max_parallel(4)
        .run_collect(workflow, ctx)
        .await;

    // A failing node does not stop its dependents
    assert!(outcome.succeeded());
    let failed: Vec<&str> = outcome
        .events
        .iter()
        .filter_map(|e| match e {
            WorkflowEvent::NodeError { node_id, .. } => Some(node_id.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(failed, vec!["b"]);

    let summary = outcome.summary().unwrap();
    assert!(summary.contains("❌ b: "));
    assert!(summary.contains("upstream unavailable"));
    assert!(summary.ends_with("3/4 nodes completed successfully"));
}

#[tokio::test]
async fn test_diamond_parallel_respects_dependencies() {
    let workflow = diamond_workflow("mock.ok");
    let ctx = ContextBuilder::new().build(&workflow, None).await.unwrap();

    let outcome = WorkflowRunner::new(Arc::new(registry()))
        .with_max_parallel(4)
        .run_collect(workflow, ctx)
        .await;
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
    for (dep, node) in [("a", "b"), ("a", "c"), ("b", "d"), ("c", "d")] {
        assert!(position("node_complete", dep) < position("node_start", node));
    }
}

#[tokio::test]
async fn test_variables_are_shared_across_nodes() {
    let workflow = Workflow::new("vars", "Vars")
        .with_node(WorkflowNode::new(
            "set",
            ToolDefinition::new("vars.set")
                .with_param("key", json!("topic"))
                .with_param("value", json!("rust")),
        ))
        .with_node(
            WorkflowNode::new("get", ToolDefinition::new("vars.get").with_param("key", json!("topic")))
                .depends_on(["set"]),
        );
    let ctx = ContextBuilder::new().build(&workflow, None).await.unwrap();

    let outcome = WorkflowRunner::new(Arc::new(registry()))
        .run_collect(workflow, ctx)
        .await;

    let value = outcome.events.iter().find_map(|e| match e {
        WorkflowEvent::NodeComplete { node_id, result } if node_id == "get" => {
            result.get("value").cloned()
        }
        _ => None,
    });
    assert_eq!(value, Some(json!("rust")));
}
