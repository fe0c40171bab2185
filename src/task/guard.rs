// src/task/guard.rs

use std::fmt;
use std::sync::Arc;

use tracing::trace;

use crate::config::RunConfig;

/// Eligibility predicate for a task in this invocation.
///
/// A guard that evaluates false means "not wanted this time", never
/// "failed": the task is recorded `NotRun` and its dependents are not
/// blocked by it.
#[derive(Clone)]
pub enum Guard {
    /// Enabled only when the run opted in to this name.
    OptIn(String),
    /// Enabled only when the environment variable is set and non-empty.
    EnvSet(String),
    /// Arbitrary predicate over the run configuration.
    Predicate(Arc<dyn Fn(&RunConfig) -> bool + Send + Sync>),
    /// Every inner guard must allow the task.
    All(Vec<Guard>),
}

impl Guard {
    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&RunConfig) -> bool + Send + Sync + 'static,
    {
        Guard::Predicate(Arc::new(f))
    }

    pub fn evaluate(&self, config: &RunConfig) -> bool {
        let allowed = match self {
            Guard::OptIn(name) => config.is_opted_in(name),
            Guard::EnvSet(var) => std::env::var(var)
                .map(|v| !v.trim().is_empty())
                .unwrap_or(false),
            Guard::Predicate(f) => f(config),
            Guard::All(guards) => guards.iter().all(|g| g.evaluate(config)),
        };
        trace!(guard = ?self, allowed, "evaluated guard");
        allowed
    }
}

impl fmt::Debug for Guard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Guard::OptIn(name) => f.debug_tuple("OptIn").field(name).finish(),
            Guard::EnvSet(var) => f.debug_tuple("EnvSet").field(var).finish(),
            Guard::Predicate(_) => f.write_str("Predicate(..)"),
            Guard::All(guards) => f.debug_tuple("All").field(guards).finish(),
        }
    }
}
