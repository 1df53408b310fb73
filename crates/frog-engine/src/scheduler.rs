//! Kahn-style scheduling over `depends_on` edges.

use std::collections::{HashMap, VecDeque};

use frog_core::error::{FrogError, Result};
use frog_core::Workflow;

/// Nodes whose dependencies have all completed, handed out in the order
/// they became ready.
///
/// Initially ready nodes are queued in declaration order; nodes unlocked by a
/// completion are appended in declaration order too. Draining the queue one
/// node at a time therefore yields Kahn's order with a declaration-order
/// tie-break. The parallel runner pops several nodes before completing any.
#[derive(Debug)]
pub struct ReadyQueue {
    ids: Vec<String>,
    index: HashMap<String, usize>,
    dependents: Vec<Vec<usize>>,
    pending: Vec<usize>,
    ready: VecDeque<usize>,
    completed: usize,
}

impl ReadyQueue {
    /// Build the queue. Fails on `depends_on` references to unknown nodes.
    pub fn new(workflow: &Workflow) -> Result<Self> {
        let ids: Vec<String> = workflow.nodes.iter().map(|n| n.id.clone()).collect();
        let index: HashMap<String, usize> = ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), i))
            .collect();

        let mut dependents = vec![Vec::new(); ids.len()];
        let mut pending = vec![0; ids.len()];

        for (i, node) in workflow.nodes.iter().enumerate() {
            let mut seen = Vec::with_capacity(node.depends_on.len());
            for dep in &node.depends_on {
                if seen.contains(&dep) {
                    continue;
                }
                seen.push(dep);
                let &d = index.get(dep).ok_or_else(|| FrogError::DanglingDependency {
                    node: node.id.clone(),
                    dependency: dep.clone(),
                })?;
                dependents[d].push(i);
                pending[i] += 1;
            }
        }

        let ready = (0..ids.len()).filter(|&i| pending[i] == 0).collect();

        Ok(Self {
            ids,
            index,
            dependents,
            pending,
            ready,
            completed: 0,
        })
    }

    /// Next node ready to run, if any.
    pub fn pop(&mut self) -> Option<String> {
        self.ready.pop_front().map(|i| self.ids[i].clone())
    }

    /// Record that `node_id` finished and return the nodes it unlocked.
    pub fn complete(&mut self, node_id: &str) -> Result<Vec<String>> {
        let &i = self
            .index
            .get(node_id)
            .ok_or_else(|| FrogError::NodeNotFound(node_id.to_string()))?;
        self.completed += 1;

        let mut unlocked = Vec::new();
        for &dependent in &self.dependents[i] {
            self.pending[dependent] -= 1;
            if self.pending[dependent] == 0 {
                self.ready.push_back(dependent);
                unlocked.push(self.ids[dependent].clone());
            }
        }
        Ok(unlocked)
    }

    pub fn has_ready(&self) -> bool {
        !self.ready.is_empty()
    }

    /// Whether every node has been completed.
    pub fn is_finished(&self) -> bool {
        self.completed == self.ids.len()
    }

    /// Nodes that never became ready, in declaration order.
    pub fn blocked(&self) -> Vec<String> {
        (0..self.ids.len())
            .filter(|&i| self.pending[i] > 0)
            .map(|i| self.ids[i].clone())
            .collect()
    }
}

/// Compute the execution order of a workflow.
///
/// Fails with `Cycle` when some nodes can never become ready; the error lists
/// those nodes.
pub fn execution_order(workflow: &Workflow) -> Result<Vec<String>> {
    let mut queue = ReadyQueue::new(workflow)?;
    let mut order = Vec::with_capacity(workflow.nodes.len());

    while let Some(id) = queue.pop() {
        queue.complete(&id)?;
        order.push(id);
    }

    if !queue.is_finished() {
        return Err(FrogError::Cycle {
            nodes: queue.blocked(),
        });
    }
    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use frog_test_utils::{
        cyclic_workflow, diamond_workflow, fan_out_workflow, linear_workflow, mock_node,
    };

    fn assert_dependencies_first(workflow: &Workflow, order: &[String]) {
        assert_eq!(order.len(), workflow.nodes.len());
        let pos = |id: &str| order.iter().position(|o| o == id).unwrap();
        for node in &workflow.nodes {
            for dep in &node.depends_on {
                assert!(pos(dep) < pos(&node.id), "{} must run before {}", dep, node.id);
            }
        }
    }

    #[test]
    fn test_linear_ignores_declaration_order() {
        let workflow = linear_workflow("mock.ok");
        let order = execution_order(&workflow).unwrap();
        assert_eq!(order, vec!["a", "b", "c"]);
        assert_dependencies_first(&workflow, &order);
    }

    #[test]
    fn test_siblings_follow_declaration_order() {
        let workflow = Workflow::new("w", "W")
            .with_node(mock_node("A", "mock.ok", &[]))
            .with_node(mock_node("B", "mock.ok", &["A"]))
            .with_node(mock_node("C", "mock.ok", &["A"]));
        assert_eq!(execution_order(&workflow).unwrap(), vec!["A", "B", "C"]);

        let diamond = diamond_workflow("mock.ok");
        assert_eq!(execution_order(&diamond).unwrap(), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_independent_roots_keep_declaration_order() {
        let workflow = Workflow::new("w", "W")
            .with_node(mock_node("z", "mock.ok", &[]))
            .with_node(mock_node("y", "mock.ok", &["z", "x"]))
            .with_node(mock_node("x", "mock.ok", &[]));
        assert_eq!(execution_order(&workflow).unwrap(), vec!["z", "x", "y"]);
    }

    #[test]
    fn test_fan_out_order_is_valid() {
        let workflow = fan_out_workflow("mock.ok", 5);
        let order = execution_order(&workflow).unwrap();
        assert_eq!(order[0], "root");
        assert_dependencies_first(&workflow, &order);
    }

    #[test]
    fn test_duplicate_dependency_counted_once() {
        let workflow = Workflow::new("w", "W")
            .with_node(mock_node("a", "mock.ok", &[]))
            .with_node(mock_node("b", "mock.ok", &["a", "a"]));
        assert_eq!(execution_order(&workflow).unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn test_cycle_error_lists_blocked_nodes() {
        let workflow = cyclic_workflow("mock.ok").with_node(mock_node("free", "mock.ok", &[]));
        match execution_order(&workflow) {
            Err(FrogError::Cycle { nodes }) => assert_eq!(nodes, vec!["a", "b"]),
            other => panic!("expected cycle, got {:?}", other),
        }
    }

    #[test]
    fn test_ready_queue_unlocks_in_waves() {
        let workflow = diamond_workflow("mock.ok");
        let mut queue = ReadyQueue::new(&workflow).unwrap();
        assert_eq!(queue.pop().as_deref(), Some("a"));
        assert!(!queue.has_ready());
        assert_eq!(queue.complete("a").unwrap(), vec!["b", "c"]);
        assert_eq!(queue.pop().as_deref(), Some("b"));
        assert_eq!(queue.pop().as_deref(), Some("c"));
        assert!(queue.complete("c").unwrap().is_empty());
        assert_eq!(queue.complete("b").unwrap(), vec!["d"]);
        assert_eq!(queue.pop().as_deref(), Some("d"));
        queue.complete("d").unwrap();
        assert!(queue.is_finished());
    }

    #[test]
    fn test_unknown_completion_rejected() {
        let mut queue = ReadyQueue::new(&linear_workflow("mock.ok")).unwrap();
        assert!(matches!(queue.complete("nope"), Err(FrogError::NodeNotFound(_))));
    }
}
