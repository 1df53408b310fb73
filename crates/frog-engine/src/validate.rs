//! Structural checks run before any node is scheduled.

use std::collections::{HashMap, HashSet};

use frog_core::error::{FrogError, Result};
use frog_core::Workflow;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

/// Validate a workflow graph.
///
/// Rejects duplicate node ids, `depends_on` references to unknown nodes,
/// and dependency cycles. Checks run in that order and the first failure wins.
pub fn validate(workflow: &Workflow) -> Result<()> {
    check_unique_ids(workflow)?;
    check_references(workflow)?;
    check_cycles(workflow)
}

/// Boolean form of [`validate`].
pub fn is_valid(workflow: &Workflow) -> bool {
    validate(workflow).is_ok()
}

fn check_unique_ids(workflow: &Workflow) -> Result<()> {
    let mut seen = HashSet::new();
    for node in &workflow.nodes {
        if !seen.insert(node.id.as_str()) {
            return Err(FrogError::DuplicateNode(node.id.clone()));
        }
    }
    Ok(())
}

fn check_references(workflow: &Workflow) -> Result<()> {
    for node in &workflow.nodes {
        for dep in &node.depends_on {
            if workflow.node(dep).is_none() {
                return Err(FrogError::DanglingDependency {
                    node: node.id.clone(),
                    dependency: dep.clone(),
                });
            }
        }
    }
    Ok(())
}

/// DFS over `depends_on` edges, visiting roots in declaration order.
/// Assumes ids are unique and references resolve.
fn check_cycles(workflow: &Workflow) -> Result<()> {
    let index: HashMap<&str, usize> = workflow
        .nodes
        .iter()
        .enumerate()
        .map(|(i, n)| (n.id.as_str(), i))
        .collect();
    let mut marks = vec![Mark::Unvisited; workflow.nodes.len()];
    let mut path = Vec::new();

    for start in 0..workflow.nodes.len() {
        if marks[start] == Mark::Unvisited {
            if let Some(cycle) = visit(start, workflow, &index, &mut marks, &mut path) {
                return Err(FrogError::Cycle { nodes: cycle });
            }
        }
    }
    Ok(())
}

fn visit(
    current: usize,
    workflow: &Workflow,
    index: &HashMap<&str, usize>,
    marks: &mut [Mark],
    path: &mut Vec<usize>,
) -> Option<Vec<String>> {
    marks[current] = Mark::InProgress;
    path.push(current);

    for dep in &workflow.nodes[current].depends_on {
        let Some(&next) = index.get(dep.as_str()) else {
            continue;
        };
        match marks[next] {
            Mark::InProgress => {
                // The path from `next` back to itself is the cycle.
                let from = path.iter().position(|&i| i == next).unwrap_or(0);
                let mut cycle: Vec<String> = path[from..]
                    .iter()
                    .map(|&i| workflow.nodes[i].id.clone())
                    .collect();
                cycle.push(workflow.nodes[next].id.clone());
                return Some(cycle);
            }
            Mark::Unvisited => {
                if let Some(cycle) = visit(next, workflow, index, marks, path) {
                    return Some(cycle);
                }
            }
            Mark::Done => {}
        }
    }

    path.pop();
    marks[current] = Mark::Done;
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use frog_test_utils::{
        cyclic_workflow, dangling_workflow, diamond_workflow, linear_workflow, mock_node,
    };

    #[test]
    fn test_valid_graphs() {
        assert!(validate(&linear_workflow("mock.ok")).is_ok());
        assert!(is_valid(&diamond_workflow("mock.ok")));
        assert!(is_valid(&Workflow::new("empty", "Empty")));
    }

    #[test]
    fn test_dangling_reference() {
        let err = validate(&dangling_workflow("mock.ok")).unwrap_err();
        assert!(matches!(
            err,
            FrogError::DanglingDependency { ref node, ref dependency } if node == "a" && dependency == "ghost"
        ));
        assert!(err.to_string().starts_with("Invalid workflow DAG"));
    }

    #[test]
    fn test_duplicate_ids() {
        let workflow = Workflow::new("dup", "Dup")
            .with_node(mock_node("a", "mock.ok", &[]))
            .with_node(mock_node("a", "mock.ok", &[]));
        assert!(matches!(validate(&workflow), Err(FrogError::DuplicateNode(ref id)) if id == "a"));
    }

    #[test]
    fn test_two_node_cycle_reports_path() {
        match validate(&cyclic_workflow("mock.ok")) {
            Err(FrogError::Cycle { nodes }) => assert_eq!(nodes, vec!["a", "b", "a"]),
            other => panic!("expected cycle, got {:?}", other),
        }
    }

    #[test]
    fn test_self_dependency_is_cycle() {
        let workflow = Workflow::new("self", "Self").with_node(mock_node("a", "mock.ok", &["a"]));
        match validate(&workflow) {
            Err(FrogError::Cycle { nodes }) => assert_eq!(nodes, vec!["a", "a"]),
            other => panic!("expected cycle, got {:?}", other),
        }
    }

    #[test]
    fn test_cycle_behind_valid_prefix() {
        let workflow = Workflow::new("tail", "Tail")
            .with_node(mock_node("root", "mock.ok", &[]))
            .with_node(mock_node("x", "mock.ok", &["root", "z"]))
            .with_node(mock_node("y", "mock.ok", &["x"]))
            .with_node(mock_node("z", "mock.ok", &["y"]));
        match validate(&workflow) {
            Err(FrogError::Cycle { nodes }) => assert_eq!(nodes, vec!["x", "z", "y", "x"]),
            other => panic!("expected cycle, got {:?}", other),
        }
    }
}
