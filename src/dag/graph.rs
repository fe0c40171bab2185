// src/dag/graph.rs

use std::collections::HashMap;

use tracing::debug;

use crate::dag::resolver;
use crate::errors::GraphError;
use crate::task::TaskNode;
use crate::types::TaskName;

/// The execution graph for one invocation.
///
/// Nodes are kept in declaration order; adjacency is stored by index. The
/// graph is validated and linearized once in [`TaskGraph::new`] and is never
/// mutated afterwards.
#[derive(Debug)]
pub struct TaskGraph {
    nodes: Vec<TaskNode>,
    index: HashMap<TaskName, usize>,
    /// Direct dependencies by node index.
    deps: Vec<Vec<usize>>,
    /// Direct dependents by node index.
    dependents: Vec<Vec<usize>>,
    order: Vec<usize>,
    layers: Vec<Vec<usize>>,
}

impl TaskGraph {
    /// Build and validate a graph.
    ///
    /// Fails on duplicate names, unresolved dependencies and cycles. No
    /// partially-built graph is ever returned.
    pub fn new(nodes: Vec<TaskNode>) -> Result<Self, GraphError> {
        let mut index: HashMap<TaskName, usize> = HashMap::with_capacity(nodes.len());
        for (i, node) in nodes.iter().enumerate() {
            if index.insert(node.name.clone(), i).is_some() {
                return Err(GraphError::DuplicateTask(node.name.clone()));
            }
        }

        let mut deps: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];

        for (i, node) in nodes.iter().enumerate() {
            for dep in &node.deps {
                let j = *index.get(dep).ok_or_else(|| GraphError::UnknownDependency {
                    task: node.name.clone(),
                    dependency: dep.clone(),
                })?;
                if !deps[i].contains(&j) {
                    deps[i].push(j);
                    dependents[j].push(i);
                }
            }
        }

        let names: Vec<&str> = nodes.iter().map(|n| n.name.as_str()).collect();
        let order = resolver::topological_order(&names, &deps, &dependents)?;
        let layers = resolver::layers(&deps, &order);

        debug!(
            tasks = nodes.len(),
            layers = layers.len(),
            "task graph validated"
        );

        Ok(Self {
            nodes,
            index,
            deps,
            dependents,
            order,
            layers,
        })
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&TaskNode> {
        self.index.get(name).map(|&i| &self.nodes[i])
    }

    /// All nodes in declaration order.
    pub fn tasks(&self) -> impl Iterator<Item = &TaskNode> {
        self.nodes.iter()
    }

    /// Immediate dependencies of a task (the names it was declared `after`).
    pub fn dependencies_of(&self, name: &str) -> &[TaskName] {
        self.get(name).map(|n| n.deps.as_slice()).unwrap_or(&[])
    }

    /// Immediate dependents of a task, in declaration order.
    pub fn dependents_of(&self, name: &str) -> Vec<&str> {
        let Some(&i) = self.index.get(name) else {
            return Vec::new();
        };
        let mut out: Vec<usize> = self.dependents[i].clone();
        out.sort_unstable();
        out.into_iter().map(|j| self.nodes[j].name.as_str()).collect()
    }

    /// Nodes in resolved execution order.
    pub fn order(&self) -> impl Iterator<Item = &TaskNode> {
        self.order.iter().map(|&i| &self.nodes[i])
    }

    pub fn order_names(&self) -> Vec<&str> {
        self.order().map(|n| n.name.as_str()).collect()
    }

    /// Independent groups: every dependency of a group member lies in a
    /// strictly earlier group. Members are in declaration order.
    pub fn layers(&self) -> Vec<Vec<&str>> {
        self.layers
            .iter()
            .map(|layer| layer.iter().map(|&i| self.nodes[i].name.as_str()).collect())
            .collect()
    }

    pub(crate) fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub(crate) fn dep_indices(&self, i: usize) -> &[usize] {
        &self.deps[i]
    }

    pub(crate) fn name_at(&self, i: usize) -> &str {
        &self.nodes[i].name
    }
}
