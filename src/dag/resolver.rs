// src/dag/resolver.rs

//! Dependency resolution: ordering, layering, cycle reporting and
//! independence checks.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashSet};

use petgraph::algo::tarjan_scc;
use petgraph::graphmap::DiGraphMap;
use tracing::{debug, warn};

use crate::dag::graph::TaskGraph;
use crate::errors::GraphError;
use crate::types::TaskName;

/// Kahn's algorithm over index adjacency.
///
/// Among ready nodes the lowest declaration index goes first, so the order
/// is stable across runs of an unchanged graph.
pub(crate) fn topological_order(
    names: &[&str],
    deps: &[Vec<usize>],
    dependents: &[Vec<usize>],
) -> Result<Vec<usize>, GraphError> {
    let n = deps.len();
    let mut in_degree: Vec<usize> = deps.iter().map(|d| d.len()).collect();
    let mut ready: BinaryHeap<Reverse<usize>> = (0..n)
        .filter(|&i| in_degree[i] == 0)
        .map(Reverse)
        .collect();

    let mut order = Vec::with_capacity(n);

    while let Some(Reverse(i)) = ready.pop() {
        order.push(i);
        for &d in &dependents[i] {
            in_degree[d] -= 1;
            if in_degree[d] == 0 {
                ready.push(Reverse(d));
            }
        }
    }

    if order.len() < n {
        let members = cycle_members(names, deps, &in_degree);
        warn!(?members, "cycle detected in task graph");
        return Err(GraphError::Cycle { members });
    }

    Ok(order)
}

/// Names of every node that sits on a cycle, in declaration order.
///
/// Nodes left with a non-zero in-degree after Kahn are either on a cycle or
/// downstream of one; the strongly connected components tell them apart.
fn cycle_members(names: &[&str], deps: &[Vec<usize>], in_degree: &[usize]) -> Vec<TaskName> {
    // Edge direction: dep -> task.
    let mut graph: DiGraphMap<usize, ()> = DiGraphMap::new();
    for (i, &deg) in in_degree.iter().enumerate() {
        if deg > 0 {
            graph.add_node(i);
        }
    }
    for (i, ds) in deps.iter().enumerate() {
        if in_degree[i] == 0 {
            continue;
        }
        for &d in ds {
            if in_degree[d] > 0 {
                graph.add_edge(d, i, ());
            }
        }
    }

    let mut members: Vec<usize> = tarjan_scc(&graph)
        .into_iter()
        .filter(|scc| scc.len() > 1 || graph.contains_edge(scc[0], scc[0]))
        .flatten()
        .collect();
    members.sort_unstable();
    members.into_iter().map(|i| names[i].to_string()).collect()
}

/// Group nodes so that each group only depends on strictly earlier groups.
pub(crate) fn layers(deps: &[Vec<usize>], order: &[usize]) -> Vec<Vec<usize>> {
    let mut depth = vec![0usize; deps.len()];
    for &i in order {
        depth[i] = deps[i].iter().map(|&d| depth[d] + 1).max().unwrap_or(0);
    }

    let count = depth.iter().copied().max().map(|m| m + 1).unwrap_or(0);
    let mut out: Vec<Vec<usize>> = vec![Vec::new(); count];
    for (i, &d) in depth.iter().enumerate() {
        out[d].push(i);
    }
    out
}

/// Check that no member of `set` depends, directly or transitively, on
/// another member.
pub fn check_independent(graph: &TaskGraph, set: &[TaskName]) -> Result<(), GraphError> {
    let mut members: Vec<usize> = Vec::with_capacity(set.len());
    for name in set {
        let i = graph
            .index_of(name)
            .ok_or_else(|| GraphError::UnknownTask(name.clone()))?;
        members.push(i);
    }
    let member_set: HashSet<usize> = members.iter().copied().collect();

    for &m in &members {
        let mut stack: Vec<usize> = graph.dep_indices(m).to_vec();
        let mut visited: HashSet<usize> = HashSet::new();

        while let Some(i) = stack.pop() {
            if !visited.insert(i) {
                continue;
            }
            if member_set.contains(&i) {
                return Err(GraphError::NotIndependent {
                    task: graph.name_at(m).to_string(),
                    depends_on: graph.name_at(i).to_string(),
                });
            }
            stack.extend_from_slice(graph.dep_indices(i));
        }
    }

    debug!(tasks = set.len(), "parallel set is mutually independent");
    Ok(())
}

/// All transitive dependencies of `name`, by name.
pub fn ancestors<'g>(graph: &'g TaskGraph, name: &str) -> HashSet<&'g str> {
    let mut out = HashSet::new();
    let Some(start) = graph.index_of(name) else {
        return out;
    };
    let mut stack: Vec<usize> = graph.dep_indices(start).to_vec();
    while let Some(i) = stack.pop() {
        if out.insert(graph.name_at(i)) {
            stack.extend_from_slice(graph.dep_indices(i));
        }
    }
    out
}
