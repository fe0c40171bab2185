// src/report/outcome.rs

use std::path::PathBuf;
use std::time::Duration;

use crate::task::ActionOutput;
use crate::types::TaskName;

/// Why a task was not attempted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotRunReason {
    /// The task's guard evaluated false.
    GuardFalse,
    /// A (transitive) dependency failed; names the direct dependency.
    Blocked(TaskName),
    /// The run was aborted after this task failed.
    Aborted(TaskName),
    /// The gate of a downstream step contained failed tasks.
    GateFailed(Vec<TaskName>),
}

/// Outcome of one task in one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Succeeded,
    /// The incremental cache found the outputs fresh.
    Skipped,
    Failed,
    /// The action exceeded the configured bound and was stopped.
    TimedOut,
    NotRun(NotRunReason),
}

impl Outcome {
    /// Failed, timed out, or withheld because something upstream failed.
    ///
    /// Dependents of such a task are not attempted. Guard skips and cache
    /// skips do not block.
    pub fn blocks_dependents(&self) -> bool {
        match self {
            Outcome::Failed | Outcome::TimedOut => true,
            Outcome::NotRun(NotRunReason::GuardFalse) => false,
            Outcome::NotRun(_) => true,
            Outcome::Succeeded | Outcome::Skipped => false,
        }
    }

    /// Whether this outcome makes the whole run unsuccessful.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Outcome::Failed | Outcome::TimedOut | Outcome::NotRun(NotRunReason::GateFailed(_))
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Succeeded => "succeeded",
            Outcome::Skipped => "skipped",
            Outcome::Failed => "failed",
            Outcome::TimedOut => "timed out",
            Outcome::NotRun(_) => "not run",
        }
    }
}

/// Per-task record handed to reporters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskResult {
    pub name: TaskName,
    pub outcome: Outcome,
    pub detail: Option<String>,
    pub source: Option<String>,
    pub version: Option<String>,
    pub duration: Option<Duration>,
    /// Captured output of a parallel worker.
    pub log: Option<PathBuf>,
}

impl TaskResult {
    pub fn new(name: impl Into<TaskName>, outcome: Outcome) -> Self {
        Self {
            name: name.into(),
            outcome,
            detail: None,
            source: None,
            version: None,
            duration: None,
            log: None,
        }
    }

    pub fn not_run(name: impl Into<TaskName>, reason: NotRunReason) -> Self {
        let detail = match &reason {
            NotRunReason::GuardFalse => "guard not satisfied".to_string(),
            NotRunReason::Blocked(dep) => format!("blocked by failed dependency '{dep}'"),
            NotRunReason::Aborted(first) => format!("run aborted after '{first}' failed"),
            NotRunReason::GateFailed(gate) => {
                format!("gate failed: {}", gate.join(", "))
            }
        };
        Self::new(name, Outcome::NotRun(reason)).with_detail(detail)
    }

    /// Build a result from an action's output.
    pub fn from_action(name: impl Into<TaskName>, output: ActionOutput, elapsed: Duration) -> Self {
        let outcome = if output.success {
            Outcome::Succeeded
        } else {
            Outcome::Failed
        };
        Self {
            name: name.into(),
            outcome,
            detail: output.detail,
            source: output.source,
            version: output.version,
            duration: Some(elapsed),
            log: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_duration(mut self, elapsed: Duration) -> Self {
        self.duration = Some(elapsed);
        self
    }

    pub fn with_log(mut self, log: PathBuf) -> Self {
        self.log = Some(log);
        self
    }
}

/// Ordered results of a run plus the overall verdict.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub results: Vec<TaskResult>,
    pub success: bool,
}

impl RunReport {
    pub fn from_results(results: Vec<TaskResult>) -> Self {
        let success = !results.iter().any(|r| r.outcome.is_fatal());
        Self { results, success }
    }

    pub fn get(&self, name: &str) -> Option<&TaskResult> {
        self.results.iter().find(|r| r.name == name)
    }

    pub fn outcome_of(&self, name: &str) -> Option<&Outcome> {
        self.get(name).map(|r| &r.outcome)
    }

    pub fn names(&self) -> Vec<&str> {
        self.results.iter().map(|r| r.name.as_str()).collect()
    }

    pub fn count(&self, pred: impl Fn(&Outcome) -> bool) -> usize {
        self.results.iter().filter(|r| pred(&r.outcome)).count()
    }

    /// Append another phase's results and recompute the verdict.
    pub fn merge(mut self, other: RunReport) -> Self {
        self.results.extend(other.results);
        Self::from_results(self.results)
    }
}
