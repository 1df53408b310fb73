use frog_core::{ToolDefinition, Workflow, WorkflowNode};

/// Node running `tool` with no parameters after `deps`.
pub fn mock_node(id: &str, tool: &str, deps: &[&str]) -> WorkflowNode {
    WorkflowNode::new(id, ToolDefinition::new(tool)).depends_on(deps.iter().copied())
}

/// `a → b → c`, declared in reverse so ordering cannot lean on declaration order.
pub fn linear_workflow(tool: &str) -> Workflow {
    Workflow::new("linear", "Linear")
        .with_node(mock_node("c", tool, &["b"]))
        .with_node(mock_node("b", tool, &["a"]))
        .with_node(mock_node("a", tool, &[]))
}

/// `a` feeds `b` and `c`, which both feed `d`.
pub fn diamond_workflow(tool: &str) -> Workflow {
    Workflow::new("diamond", "Diamond")
        .with_node(mock_node("a", tool, &[]))
        .with_node(mock_node("b", tool, &["a"]))
        .with_node(mock_node("c", tool, &["a"]))
        .with_node(mock_node("d", tool, &["b", "c"]))
}

/// One `root` followed by `width` independent leaves `leaf0..`.
pub fn fan_out_workflow(tool: &str, width: usize) -> Workflow {
    let mut workflow = Workflow::new("fan-out", "Fan out").with_node(mock_node("root", tool, &[]));
    for i in 0..width {
        workflow = workflow.with_node(mock_node(&format!("leaf{}", i), tool, &["root"]));
    }
    workflow
}

/// `a` and `b` depend on each other.
pub fn cyclic_workflow(tool: &str) -> Workflow {
    Workflow::new("cyclic", "Cyclic")
        .with_node(mock_node("a", tool, &["b"]))
        .with_node(mock_node("b", tool, &["a"]))
}

/// `a` depends on a node that does not exist.
pub fn dangling_workflow(tool: &str) -> Workflow {
    Workflow::new("dangling", "Dangling").with_node(mock_node("a", tool, &["ghost"]))
}
