//! Deterministic think → plan → execute steps backing the default workflow.
//!
//! Each step reads what its predecessors produced through the injected
//! `dep_*` parameters, so the template exercises the same data passing as
//! any user-supplied graph.

use futures::future::BoxFuture;
use serde_json::{json, Map, Value};

use frog_core::error::Result;
use frog_core::schema::{ParamKind, ParameterSchema};
use frog_core::traits::Tool;
use frog_core::{ExecutionContext, NodeResult};

use super::dependency_results;

const MAX_KEY_TERMS: usize = 5;

fn key_terms(prompt: &str) -> Vec<String> {
    let mut terms: Vec<String> = Vec::new();
    for word in prompt.split_whitespace() {
        let word: String = word
            .chars()
            .filter(|c| c.is_alphanumeric() || *c == '-')
            .collect::<String>()
            .to_lowercase();
        if word.chars().count() > 3 && !terms.contains(&word) {
            terms.push(word);
        }
        if terms.len() == MAX_KEY_TERMS {
            break;
        }
    }
    terms
}

fn strings(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

// ── ThinkTool ───────────────────────────────────────────────────

pub struct ThinkTool;

impl Tool for ThinkTool {
    fn name(&self) -> &str {
        "planner.think"
    }

    fn description(&self) -> &str {
        "Break a request down into its key terms"
    }

    fn schema(&self) -> ParameterSchema {
        ParameterSchema::new().required("prompt", ParamKind::String, "The user request")
    }

    fn execute(
        &self,
        params: Map<String, Value>,
        _ctx: ExecutionContext,
    ) -> BoxFuture<'_, Result<NodeResult>> {
        Box::pin(async move {
            let prompt = params
                .get("prompt")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .trim()
                .to_string();
            if prompt.is_empty() {
                return Ok(NodeResult::new().with("error", json!("No prompt provided")));
            }

            let terms = key_terms(&prompt);
            let kind = if prompt.ends_with('?') { "question" } else { "instruction" };
            let thoughts = vec![
                format!("Restate the request: {}", prompt),
                format!("Request type: {}", kind),
                format!("Key terms: {}", terms.join(", ")),
            ];

            Ok(NodeResult::new()
                .with("prompt", json!(prompt))
                .with("thoughts", json!(thoughts))
                .with("key_terms", json!(terms)))
        })
    }
}

// ── PlanTool ────────────────────────────────────────────────────

pub struct PlanTool;

impl Tool for PlanTool {
    fn name(&self) -> &str {
        "planner.plan"
    }

    fn description(&self) -> &str {
        "Turn prior thinking into an ordered list of steps"
    }

    fn schema(&self) -> ParameterSchema {
        ParameterSchema::new().optional("goal", ParamKind::String, "Overall goal of the plan")
    }

    fn execute(
        &self,
        params: Map<String, Value>,
        _ctx: ExecutionContext,
    ) -> BoxFuture<'_, Result<NodeResult>> {
        Box::pin(async move {
            let mut steps = Vec::new();
            for (dep_id, result) in dependency_results(&params) {
                if let Some(err) = result.get("error") {
                    steps.push(format!("Work around failed step '{}': {}", dep_id, err));
                    continue;
                }
                for term in strings(result.get("key_terms")) {
                    steps.push(format!("Research {}", term));
                }
            }
            if steps.is_empty() {
                steps.push("Answer the request directly".to_string());
            }
            steps.push("Synthesize findings".to_string());

            let mut result = NodeResult::new().with("steps", json!(steps));
            if let Some(goal) = params.get("goal").and_then(Value::as_str) {
                result = result.with("goal", json!(goal));
            }
            Ok(result)
        })
    }
}

// ── ExecuteTool ─────────────────────────────────────────────────

pub struct ExecuteTool;

impl Tool for ExecuteTool {
    fn name(&self) -> &str {
        "planner.execute"
    }

    fn description(&self) -> &str {
        "Carry out the planned steps and report the outcome"
    }

    fn execute(
        &self,
        params: Map<String, Value>,
        _ctx: ExecutionContext,
    ) -> BoxFuture<'_, Result<NodeResult>> {
        Box::pin(async move {
            let mut completed = Vec::new();
            let mut blocked = Vec::new();
            for (dep_id, result) in dependency_results(&params) {
                if result.contains_key("error") {
                    blocked.push(dep_id.to_string());
                } else {
                    completed.extend(strings(result.get("steps")));
                }
            }

            let output = if blocked.is_empty() {
                format!("Completed {} planned steps", completed.len())
            } else {
                format!(
                    "Completed {} planned steps; blocked by: {}",
                    completed.len(),
                    blocked.join(", ")
                )
            };

            Ok(NodeResult::new()
                .with("completed_steps", json!(completed))
                .with("blocked_by", json!(blocked))
                .with("output", json!(output)))
        })
    }
}
