// src/exec/phases.rs

use std::collections::HashSet;

use tracing::{info, warn};

use crate::cache::IncrementalCache;
use crate::config::RunConfig;
use crate::dag::{ancestors, TaskGraph};
use crate::errors::GraphError;
use crate::exec::parallel::{ParallelExecutor, ParallelPlan};
use crate::exec::sequential::{first_failure, SequentialExecutor};
use crate::report::{NotRunReason, Reporter, RunReport, TaskResult};
use crate::types::{FailurePolicy, TaskName};

/// Run a whole graph, optionally with one parallel phase.
///
/// Without a plan this is a plain sequential run. With a plan, tasks are
/// split into three phases:
/// 1. sequential: tasks outside the plan that do not depend on it,
/// 2. parallel: the plan (workers, barrier, gated steps),
/// 3. sequential: tasks outside the plan that depend on it.
///
/// Failures carry across phases: a later task whose dependency failed in
/// an earlier phase is blocked, and under [`FailurePolicy::AbortRun`] the
/// first failure aborts everything after it.
pub async fn run_phased(
    graph: &TaskGraph,
    plan: Option<&ParallelPlan>,
    config: &RunConfig,
    cache: &IncrementalCache,
    reporter: &mut dyn Reporter,
) -> Result<RunReport, GraphError> {
    let sequential = SequentialExecutor::new(config, cache);

    let Some(plan) = plan else {
        return Ok(sequential.run(graph, reporter).await);
    };
    plan.validate(graph)?;

    let members = plan.members();
    let (before, after): (HashSet<TaskName>, HashSet<TaskName>) = graph
        .tasks()
        .filter(|n| !members.contains(&n.name))
        .map(|n| n.name.clone())
        .partition(|name| {
            !ancestors(graph, name)
                .iter()
                .any(|a| members.contains(*a))
        });

    info!(
        before = before.len(),
        parallel = members.len(),
        after = after.len(),
        "phased run planned"
    );

    let first = sequential.run_subset(graph, &before, None, reporter).await;

    let aborted_by = match config.failure_policy {
        FailurePolicy::AbortRun => first_failure(&first),
        FailurePolicy::BlockDependents => None,
    };

    let second = match aborted_by {
        Some(failed) => {
            warn!(task = %failed, "run aborted before the parallel phase");
            let results = plan
                .tasks
                .iter()
                .chain(plan.ordered_downstream(graph).into_iter().map(|s| &s.task))
                .map(|name| {
                    let result =
                        TaskResult::not_run(name.clone(), NotRunReason::Aborted(failed.clone()));
                    reporter.record(&result);
                    result
                })
                .collect();
            RunReport::from_results(results)
        }
        None => {
            ParallelExecutor::new(config, cache)
                .run(graph, plan, Some(&first), reporter)
                .await?
        }
    };

    let so_far = first.merge(second);
    if after.is_empty() {
        return Ok(so_far);
    }
    let third = sequential
        .run_subset(graph, &after, Some(&so_far), reporter)
        .await;
    Ok(so_far.merge(third))
}
