use provdag::dag::{ancestors, check_independent, TaskGraph};
use provdag::errors::GraphError;
use provdag::task::TaskNode;
use provdag_test_utils::fake_action::FakeAction;

fn node(name: &str) -> TaskNode {
    FakeAction::succeed(name).node()
}

/// Init -> A -> B, Init -> C
fn provision_graph() -> TaskGraph {
    TaskGraph::new(vec![
        node("Init"),
        node("A").after("Init"),
        node("B").after("A"),
        node("C").after("Init"),
    ])
    .expect("graph should be valid")
}

fn position(order: &[&str], name: &str) -> usize {
    order.iter().position(|n| *n == name).unwrap()
}

#[test]
fn test_dependencies_come_first() {
    let graph = provision_graph();
    let order = graph.order_names();

    assert_eq!(order.len(), 4);
    assert!(position(&order, "Init") < position(&order, "A"));
    assert!(position(&order, "A") < position(&order, "B"));
    assert!(position(&order, "Init") < position(&order, "C"));
}

#[test]
fn test_ties_break_by_declaration_order() {
    let graph = provision_graph();
    assert_eq!(graph.order_names(), vec!["Init", "A", "B", "C"]);

    // Declared out of order: dependencies still win, then declaration order.
    let graph = TaskGraph::new(vec![
        node("Z").after("M"),
        node("M"),
        node("B"),
    ])
    .unwrap();
    assert_eq!(graph.order_names(), vec!["M", "Z", "B"]);
}

#[test]
fn test_order_is_stable_across_builds() {
    let first = provision_graph().order_names().join(",");
    for _ in 0..10 {
        assert_eq!(provision_graph().order_names().join(","), first);
    }
}

#[test]
fn test_cycle_names_only_cycle_members() {
    let result = TaskGraph::new(vec![
        node("Init"),
        node("A").after("Init").after("B"),
        node("B").after("A"),
        // Downstream of the cycle, but not on it.
        node("D").after("B"),
    ]);

    match result {
        Err(GraphError::Cycle { members }) => {
            assert_eq!(members, vec!["A".to_string(), "B".to_string()]);
        }
        other => panic!("Expected Cycle error, got: {:?}", other),
    }
}

#[test]
fn test_self_dependency_is_a_cycle() {
    let result = TaskGraph::new(vec![node("A").after("A")]);
    match result {
        Err(GraphError::Cycle { members }) => assert_eq!(members, vec!["A".to_string()]),
        other => panic!("Expected Cycle error, got: {:?}", other),
    }
}

#[test]
fn test_unknown_dependency_is_rejected() {
    let result = TaskGraph::new(vec![node("A").after("Ghost")]);
    match result {
        Err(GraphError::UnknownDependency { task, dependency }) => {
            assert_eq!(task, "A");
            assert_eq!(dependency, "Ghost");
        }
        other => panic!("Expected UnknownDependency, got: {:?}", other),
    }
}

#[test]
fn test_duplicate_task_is_rejected() {
    let result = TaskGraph::new(vec![node("A"), node("A")]);
    assert!(matches!(result, Err(GraphError::DuplicateTask(name)) if name == "A"));
}

#[test]
fn test_empty_graph_is_valid() {
    let graph = TaskGraph::new(Vec::new()).unwrap();
    assert!(graph.is_empty());
    assert!(graph.order_names().is_empty());
    assert!(graph.layers().is_empty());
}

#[test]
fn test_repeated_dependency_counts_once() {
    let graph = TaskGraph::new(vec![node("A"), node("B").after("A").after("A")]).unwrap();
    assert_eq!(graph.order_names(), vec!["A", "B"]);
    assert_eq!(graph.dependents_of("A"), vec!["B"]);
}

#[test]
fn test_layers_group_by_depth() {
    let graph = provision_graph();
    assert_eq!(
        graph.layers(),
        vec![vec!["Init"], vec!["A", "C"], vec!["B"]]
    );
}

#[test]
fn test_independence_check() {
    let graph = TaskGraph::new(vec![
        node("Init"),
        node("Nox").after("Init"),
        node("Uvicorn").after("Init"),
        node("FastAPI").after("Uvicorn"),
    ])
    .unwrap();

    // Shared ancestors outside the set are fine.
    check_independent(&graph, &["Nox".into(), "Uvicorn".into()]).unwrap();

    match check_independent(&graph, &["Init".into(), "FastAPI".into()]) {
        Err(GraphError::NotIndependent { task, depends_on }) => {
            assert_eq!(task, "FastAPI");
            assert_eq!(depends_on, "Init");
        }
        other => panic!("Expected NotIndependent, got: {:?}", other),
    }

    assert!(matches!(
        check_independent(&graph, &["Nope".into()]),
        Err(GraphError::UnknownTask(_))
    ));
}

#[test]
fn test_ancestors_are_transitive() {
    let graph = provision_graph();
    let up = ancestors(&graph, "B");
    assert_eq!(up.len(), 2);
    assert!(up.contains("A"));
    assert!(up.contains("Init"));
    assert!(ancestors(&graph, "Init").is_empty());
}
