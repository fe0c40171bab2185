// src/task/node.rs

//! Task nodes: an action plus its scheduling metadata.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::task::action::Action;
use crate::task::guard::Guard;
use crate::types::TaskName;

/// An externally-checkable location used as a staleness input or output.
///
/// The meaning is up to the freshness provider: the filesystem providers
/// resolve it as a path relative to their root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Location(String);

impl Location {
    pub fn new(loc: impl Into<String>) -> Self {
        Self(loc.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_path(&self) -> &Path {
        Path::new(&self.0)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Location {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Location {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Named unit of scheduling.
#[derive(Clone)]
pub struct TaskNode {
    pub name: TaskName,
    /// Direct dependencies (names of other nodes in the same graph).
    pub deps: Vec<TaskName>,
    pub guard: Option<Guard>,
    pub inputs: Vec<Location>,
    /// Declared outputs. A node without outputs is never skipped by the cache.
    pub outputs: Vec<Location>,
    pub action: Arc<dyn Action>,
}

impl TaskNode {
    pub fn new(name: impl Into<TaskName>, action: Arc<dyn Action>) -> Self {
        Self {
            name: name.into(),
            deps: Vec::new(),
            guard: None,
            inputs: Vec::new(),
            outputs: Vec::new(),
            action,
        }
    }

    pub fn after(mut self, dep: impl Into<TaskName>) -> Self {
        self.deps.push(dep.into());
        self
    }

    pub fn guard(mut self, guard: Guard) -> Self {
        self.guard = Some(guard);
        self
    }

    pub fn input(mut self, loc: impl Into<Location>) -> Self {
        self.inputs.push(loc.into());
        self
    }

    pub fn output(mut self, loc: impl Into<Location>) -> Self {
        self.outputs.push(loc.into());
        self
    }
}

impl fmt::Debug for TaskNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskNode")
            .field("name", &self.name)
            .field("deps", &self.deps)
            .field("guard", &self.guard)
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .field("action", &self.action.name())
            .finish()
    }
}
