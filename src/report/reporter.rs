// src/report/reporter.rs

use tracing::{info, warn};

use crate::report::outcome::{Outcome, TaskResult};

/// Consumer of per-task outcome records.
///
/// Executors call [`Reporter::record`] exactly once per task: in resolution
/// order for sequential runs, in completion order for parallel workers.
/// Formatting and serialization belong to the implementation.
pub trait Reporter: Send {
    fn record(&mut self, result: &TaskResult);
}

/// Keeps every record in memory, in the order received.
#[derive(Debug, Default, Clone)]
pub struct MemoryReporter {
    pub records: Vec<TaskResult>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn names(&self) -> Vec<&str> {
        self.records.iter().map(|r| r.name.as_str()).collect()
    }
}

impl Reporter for MemoryReporter {
    fn record(&mut self, result: &TaskResult) {
        self.records.push(result.clone());
    }
}

/// Emits one structured log line per record.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn record(&mut self, result: &TaskResult) {
        let detail = result.detail.as_deref().unwrap_or("");
        let source = result.source.as_deref().unwrap_or("");
        let version = result.version.as_deref().unwrap_or("");
        let elapsed_ms = result.duration.map(|d| d.as_millis() as u64);

        match result.outcome {
            Outcome::Failed | Outcome::TimedOut => warn!(
                task = %result.name,
                outcome = result.outcome.label(),
                detail,
                source,
                version,
                elapsed_ms,
                log = ?result.log,
                "task finished"
            ),
            _ => info!(
                task = %result.name,
                outcome = result.outcome.label(),
                detail,
                source,
                version,
                elapsed_ms,
                "task finished"
            ),
        }
    }
}

/// Forwards each record to two reporters.
pub struct Tee<'a> {
    first: &'a mut dyn Reporter,
    second: &'a mut dyn Reporter,
}

impl<'a> Tee<'a> {
    pub fn new(first: &'a mut dyn Reporter, second: &'a mut dyn Reporter) -> Self {
        Self { first, second }
    }
}

impl Reporter for Tee<'_> {
    fn record(&mut self, result: &TaskResult) {
        self.first.record(result);
        self.second.record(result);
    }
}
