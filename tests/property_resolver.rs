use std::collections::{HashMap, HashSet};

use proptest::prelude::*;
use provdag::dag::TaskGraph;
use provdag::errors::GraphError;
use provdag::task::TaskNode;
use provdag_test_utils::fake_action::FakeAction;

// Strategy to generate an acyclic graph.
// We ensure acyclicity by only allowing task N to depend on tasks 0..N-1,
// then shuffle declaration order so the resolver can't rely on it.
fn dag_strategy(max_tasks: usize) -> impl Strategy<Value = Vec<TaskNode>> {
    (1..=max_tasks).prop_flat_map(|num_tasks| {
        let deps_strat = proptest::collection::vec(
            proptest::collection::vec(any::<usize>(), 0..num_tasks),
            num_tasks,
        );

        deps_strat.prop_flat_map(|raw_deps| {
            let nodes: Vec<TaskNode> = raw_deps
                .into_iter()
                .enumerate()
                .map(|(i, potential)| {
                    let mut node = FakeAction::succeed(&format!("task_{i}")).node();
                    let valid: HashSet<usize> = if i > 0 {
                        potential.into_iter().map(|d| d % i).collect()
                    } else {
                        HashSet::new()
                    };
                    for d in valid {
                        node = node.after(format!("task_{d}"));
                    }
                    node
                })
                .collect();
            Just(nodes).prop_shuffle()
        })
    })
}

proptest! {
    #[test]
    fn test_order_respects_every_edge(nodes in dag_strategy(12)) {
        let expected = nodes.len();
        let edges: Vec<(String, String)> = nodes
            .iter()
            .flat_map(|n| n.deps.iter().map(move |d| (d.clone(), n.name.clone())))
            .collect();

        let graph = TaskGraph::new(nodes).unwrap();
        let order = graph.order_names();
        prop_assert_eq!(order.len(), expected);

        let pos: HashMap<&str, usize> = order.iter().enumerate().map(|(i, n)| (*n, i)).collect();
        prop_assert_eq!(pos.len(), expected, "every task appears exactly once");
        for (dep, task) in &edges {
            prop_assert!(pos[dep.as_str()] < pos[task.as_str()], "{} must precede {}", dep, task);
        }

        // Layers partition the tasks and only look backwards.
        let layers = graph.layers();
        let depth: HashMap<&str, usize> = layers
            .iter()
            .enumerate()
            .flat_map(|(d, layer)| layer.iter().map(move |n| (*n, d)))
            .collect();
        prop_assert_eq!(depth.len(), expected);
        for (dep, task) in &edges {
            prop_assert!(depth[dep.as_str()] < depth[task.as_str()]);
        }
    }

    #[test]
    fn test_back_edge_is_always_reported_as_cycle(n in 2usize..10) {
        // A chain task_0 <- task_1 <- ... <- task_{n-1}, closed by task_0 after the last.
        let mut nodes: Vec<TaskNode> = (0..n)
            .map(|i| {
                let node = FakeAction::succeed(&format!("task_{i}")).node();
                if i > 0 { node.after(format!("task_{}", i - 1)) } else { node }
            })
            .collect();
        nodes[0] = nodes[0].clone().after(format!("task_{}", n - 1));

        match TaskGraph::new(nodes) {
            Err(GraphError::Cycle { members }) => prop_assert_eq!(members.len(), n),
            other => prop_assert!(false, "expected cycle, got {:?}", other.map(|g| g.order_names().join(","))),
        }
    }
}
