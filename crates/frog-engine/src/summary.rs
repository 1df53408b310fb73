use std::collections::HashMap;

use frog_core::{NodeResult, Workflow};

/// Render the human-readable completion message for a run.
///
/// Nodes are listed in declaration order. A node with no recorded result is
/// reported as not executed and does not count as a success.
pub fn summarize(workflow: &Workflow, results: &HashMap<String, NodeResult>) -> String {
    let mut lines = vec![format!("Workflow '{}' completed:", workflow.name)];
    let mut succeeded = 0;

    for node in &workflow.nodes {
        match results.get(&node.id) {
            Some(result) => match result.error() {
                Some(err) => lines.push(format!("❌ {}: {}", node.id, err)),
                None => {
                    succeeded += 1;
                    lines.push(format!("✅ {}: Success", node.id));
                }
            },
            None => lines.push(format!("❌ {}: not executed", node.id)),
        }
    }

    lines.push(format!(
        "\nExecution Summary: {}/{} nodes completed successfully",
        succeeded,
        workflow.nodes.len()
    ));
    lines.join("\n")
}
