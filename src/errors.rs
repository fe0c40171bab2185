// src/errors.rs

//! Crate-wide error types and aliases.

use thiserror::Error;

use crate::types::TaskName;

/// Structural problems with a task graph or parallel plan.
///
/// These are always fatal and surface before any action runs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("cycle detected in task graph involving: {}", members.join(", "))]
    Cycle { members: Vec<TaskName> },

    #[error("task '{task}' has unknown dependency '{dependency}'")]
    UnknownDependency { task: TaskName, dependency: TaskName },

    #[error("task '{0}' is declared more than once")]
    DuplicateTask(TaskName),

    #[error("unknown task '{0}'")]
    UnknownTask(TaskName),

    #[error("parallel task '{task}' depends on '{depends_on}' from the same parallel set")]
    NotIndependent { task: TaskName, depends_on: TaskName },

    #[error("gate of '{step}' names '{gate}', which is not in the parallel set")]
    GateOutsideSet { step: TaskName, gate: TaskName },

    #[error("downstream step '{0}' is also a member of the parallel set")]
    DownstreamInSet(TaskName),

    #[error("downstream step '{step}' depends on '{dependency}', which runs after the parallel phase")]
    DownstreamAfterPhase { step: TaskName, dependency: TaskName },
}

#[derive(Error, Debug)]
pub enum ProvdagError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, ProvdagError>;
