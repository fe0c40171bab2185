// src/config/settings.rs

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::time::Duration;

use crate::types::{FailurePolicy, FreshnessMode};

pub const DEFAULT_MAX_PARALLEL: usize = 4;
pub const DEFAULT_LOG_DIR: &str = ".provdag/logs";

/// Immutable settings for one invocation.
///
/// Built once (from the `[config]` and `[versions]` sections plus CLI
/// overrides) and passed by reference into graph construction, guards and
/// executors. Nothing mutates it during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub failure_policy: FailurePolicy,
    /// Upper bound on concurrently running parallel workers (>= 1).
    pub max_parallel: usize,
    /// Per-action bound; `None` waits indefinitely.
    pub task_timeout: Option<Duration>,
    /// Cache toggle. When off, every eligible task runs.
    pub incremental: bool,
    pub freshness: FreshnessMode,
    /// Directory receiving one log file per parallel worker.
    pub log_dir: PathBuf,
    /// Opt-in names that enable optional tasks.
    pub opt_in: BTreeSet<String>,
    /// Version pins keyed by task name.
    pub versions: BTreeMap<String, String>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            failure_policy: FailurePolicy::default(),
            max_parallel: DEFAULT_MAX_PARALLEL,
            task_timeout: None,
            incremental: true,
            freshness: FreshnessMode::default(),
            log_dir: PathBuf::from(DEFAULT_LOG_DIR),
            opt_in: BTreeSet::new(),
            versions: BTreeMap::new(),
        }
    }
}

impl RunConfig {
    /// Opt-in names compare case-insensitively.
    pub fn is_opted_in(&self, name: &str) -> bool {
        self.opt_in.iter().any(|o| o.eq_ignore_ascii_case(name))
    }

    pub fn version_for(&self, task: &str) -> Option<&str> {
        self.versions.get(task).map(|s| s.as_str())
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn with_max_parallel(mut self, max: usize) -> Self {
        self.max_parallel = max.max(1);
        self
    }

    pub fn with_task_timeout(mut self, timeout: Duration) -> Self {
        self.task_timeout = Some(timeout);
        self
    }

    pub fn with_incremental(mut self, incremental: bool) -> Self {
        self.incremental = incremental;
        self
    }

    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = dir.into();
        self
    }

    pub fn with_opt_in(mut self, name: impl Into<String>) -> Self {
        self.opt_in.insert(name.into());
        self
    }
}
