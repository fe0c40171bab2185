// src/exec/sequential.rs

use std::collections::HashSet;

use tracing::{error, info, warn};

use crate::cache::IncrementalCache;
use crate::config::RunConfig;
use crate::dag::TaskGraph;
use crate::exec::step;
use crate::report::{NotRunReason, Outcome, Reporter, RunReport, TaskResult};
use crate::types::{FailurePolicy, TaskName};

/// Runs tasks one at a time in resolution order.
///
/// Each task is recorded exactly once, in order. A task whose dependency
/// failed (or was itself withheld) is recorded `NotRun(Blocked)` without
/// being invoked; with [`FailurePolicy::AbortRun`] every task after the
/// first failure is recorded `NotRun(Aborted)`.
#[derive(Debug)]
pub struct SequentialExecutor<'a> {
    config: &'a RunConfig,
    cache: &'a IncrementalCache,
}

impl<'a> SequentialExecutor<'a> {
    pub fn new(config: &'a RunConfig, cache: &'a IncrementalCache) -> Self {
        Self { config, cache }
    }

    pub async fn run(&self, graph: &TaskGraph, reporter: &mut dyn Reporter) -> RunReport {
        self.run_filtered(graph, None, None, reporter).await
    }

    /// Run only the tasks in `only`, still in resolution order.
    ///
    /// Dependencies outside the subset count as satisfied unless `prior`
    /// (an earlier phase of the same run) recorded them as failed or
    /// withheld.
    pub async fn run_subset(
        &self,
        graph: &TaskGraph,
        only: &HashSet<TaskName>,
        prior: Option<&RunReport>,
        reporter: &mut dyn Reporter,
    ) -> RunReport {
        self.run_filtered(graph, Some(only), prior, reporter).await
    }

    async fn run_filtered(
        &self,
        graph: &TaskGraph,
        only: Option<&HashSet<TaskName>>,
        prior: Option<&RunReport>,
        reporter: &mut dyn Reporter,
    ) -> RunReport {
        let mut results: Vec<TaskResult> = Vec::new();
        let mut blocking: HashSet<TaskName> = prior
            .map(|p| {
                p.results
                    .iter()
                    .filter(|r| r.outcome.blocks_dependents())
                    .map(|r| r.name.clone())
                    .collect()
            })
            .unwrap_or_default();
        let mut aborted_by: Option<TaskName> = match self.config.failure_policy {
            FailurePolicy::AbortRun => prior.and_then(first_failure),
            FailurePolicy::BlockDependents => None,
        };

        info!(
            tasks = only.map_or(graph.len(), |o| o.len()),
            policy = ?self.config.failure_policy,
            "sequential run started"
        );

        for node in graph.order() {
            if only.is_some_and(|o| !o.contains(&node.name)) {
                continue;
            }

            let result = if let Some(first) = &aborted_by {
                TaskResult::not_run(node.name.clone(), NotRunReason::Aborted(first.clone()))
            } else if let Some(dep) = node.deps.iter().find(|d| blocking.contains(*d)) {
                warn!(task = %node.name, dependency = %dep, "dependency failed; not running");
                TaskResult::not_run(node.name.clone(), NotRunReason::Blocked(dep.clone()))
            } else {
                step::execute(node, self.config, self.cache).await
            };

            if result.outcome.blocks_dependents() {
                blocking.insert(node.name.clone());
            }

            if matches!(result.outcome, Outcome::Failed | Outcome::TimedOut) {
                error!(
                    task = %node.name,
                    detail = result.detail.as_deref().unwrap_or(""),
                    "task failed"
                );
                if self.config.failure_policy == FailurePolicy::AbortRun && aborted_by.is_none() {
                    warn!(task = %node.name, "aborting remaining tasks");
                    aborted_by = Some(node.name.clone());
                }
            }

            reporter.record(&result);
            results.push(result);
        }

        let report = RunReport::from_results(results);
        info!(success = report.success, "sequential run finished");
        report
    }
}

/// First task of a report that failed or timed out.
pub(crate) fn first_failure(report: &RunReport) -> Option<TaskName> {
    report
        .results
        .iter()
        .find(|r| matches!(r.outcome, Outcome::Failed | Outcome::TimedOut))
        .map(|r| r.name.clone())
}
