// src/exec/parallel.rs

//! Bounded fan-out over a statically declared independent set.
//!
//! All members of a [`ParallelPlan`] are launched as workers (at most
//! `max_parallel` at a time), each writing to its own log sink. The
//! executor waits for every worker (a join barrier), then runs the
//! gated downstream steps one after another.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::cache::IncrementalCache;
use crate::config::RunConfig;
use crate::dag::{ancestors, check_independent, TaskGraph};
use crate::errors::GraphError;
use crate::exec::step;
use crate::report::{NotRunReason, Outcome, Reporter, RunReport, TaskResult};
use crate::task::Action;
use crate::types::{FailurePolicy, TaskName};

/// A downstream step and the parallel members it depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatedStep {
    pub task: TaskName,
    /// Runs only if none of these failed.
    pub gate: Vec<TaskName>,
}

/// Independent set plus the steps gated on it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParallelPlan {
    pub tasks: Vec<TaskName>,
    pub downstream: Vec<GatedStep>,
}

impl ParallelPlan {
    pub fn new<I, S>(tasks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<TaskName>,
    {
        Self {
            tasks: tasks.into_iter().map(Into::into).collect(),
            downstream: Vec::new(),
        }
    }

    pub fn with_downstream<I, S>(mut self, task: impl Into<TaskName>, gate: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<TaskName>,
    {
        self.downstream.push(GatedStep {
            task: task.into(),
            gate: gate.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// Every task this plan runs, workers and downstream steps alike.
    pub fn members(&self) -> HashSet<TaskName> {
        self.tasks
            .iter()
            .cloned()
            .chain(self.downstream.iter().map(|s| s.task.clone()))
            .collect()
    }

    /// Reject plans that cannot run as one phase.
    ///
    /// Workers must be independent of each other and of the downstream
    /// steps. Each downstream step is listed once, gates only on workers,
    /// and depends only on plan members or on tasks that run before the
    /// plan.
    pub fn validate(&self, graph: &TaskGraph) -> Result<(), GraphError> {
        let mut seen: HashSet<&str> = HashSet::new();
        for name in &self.tasks {
            if !seen.insert(name.as_str()) {
                return Err(GraphError::DuplicateTask(name.clone()));
            }
        }

        check_independent(graph, &self.tasks)?;

        let mut steps: HashSet<&str> = HashSet::new();
        for step in &self.downstream {
            if !graph.contains(&step.task) {
                return Err(GraphError::UnknownTask(step.task.clone()));
            }
            if seen.contains(step.task.as_str()) {
                return Err(GraphError::DownstreamInSet(step.task.clone()));
            }
            if !steps.insert(step.task.as_str()) {
                return Err(GraphError::DuplicateTask(step.task.clone()));
            }
            for gate in &step.gate {
                if !seen.contains(gate.as_str()) {
                    return Err(GraphError::GateOutsideSet {
                        step: step.task.clone(),
                        gate: gate.clone(),
                    });
                }
            }
        }

        for name in &self.tasks {
            if let Some(step) = ancestors(graph, name).into_iter().find(|a| steps.contains(*a)) {
                return Err(GraphError::NotIndependent {
                    task: name.clone(),
                    depends_on: step.to_string(),
                });
            }
        }

        let members = self.members();
        for step in &self.downstream {
            for dep in ancestors(graph, &step.task) {
                if members.contains(dep) {
                    continue;
                }
                if ancestors(graph, dep).iter().any(|a| members.contains(*a)) {
                    return Err(GraphError::DownstreamAfterPhase {
                        step: step.task.clone(),
                        dependency: dep.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Downstream steps in resolution order.
    pub(crate) fn ordered_downstream<'p>(&'p self, graph: &TaskGraph) -> Vec<&'p GatedStep> {
        let position: HashMap<&str, usize> = graph
            .order()
            .enumerate()
            .map(|(i, node)| (node.name.as_str(), i))
            .collect();
        let mut steps: Vec<&GatedStep> = self.downstream.iter().collect();
        steps.sort_by_key(|s| position.get(s.task.as_str()).copied().unwrap_or(usize::MAX));
        steps
    }
}

/// Runs a [`ParallelPlan`] with bounded concurrency.
#[derive(Debug)]
pub struct ParallelExecutor<'a> {
    config: &'a RunConfig,
    cache: &'a IncrementalCache,
}

impl<'a> ParallelExecutor<'a> {
    pub fn new(config: &'a RunConfig, cache: &'a IncrementalCache) -> Self {
        Self { config, cache }
    }

    /// Run the plan.
    ///
    /// `prior` carries results of an earlier phase; a worker whose
    /// dependency failed there is recorded `NotRun(Blocked)` and never
    /// launched. Results are reported as they become final: withheld
    /// members first, then workers in completion order, then downstream
    /// steps in resolution order. A downstream step is blocked by a failed
    /// dependency from this phase too, and under
    /// [`FailurePolicy::AbortRun`] any failure aborts the remaining steps.
    pub async fn run(
        &self,
        graph: &TaskGraph,
        plan: &ParallelPlan,
        prior: Option<&RunReport>,
        reporter: &mut dyn Reporter,
    ) -> Result<RunReport, GraphError> {
        plan.validate(graph)?;

        let run_id = Uuid::new_v4().simple().to_string();
        let limit = self.config.max_parallel.max(1);
        let permits = Arc::new(Semaphore::new(limit));
        let mut workers: JoinSet<TaskResult> = JoinSet::new();
        let mut launched: Vec<(TaskName, PathBuf)> = Vec::new();
        let mut results: Vec<TaskResult> = Vec::new();

        info!(
            tasks = plan.tasks.len(),
            max_parallel = limit,
            run_id = %run_id,
            "parallel phase started"
        );

        for name in &plan.tasks {
            let node = graph
                .get(name)
                .ok_or_else(|| GraphError::UnknownTask(name.clone()))?;

            if let Some(dep) = prior.and_then(|p| failed_dependency(&node.deps, p)) {
                warn!(task = %name, dependency = %dep, "dependency failed; not launching");
                let result = TaskResult::not_run(name.clone(), NotRunReason::Blocked(dep));
                reporter.record(&result);
                results.push(result);
                continue;
            }

            if let Some(result) = step::precheck(node, self.config, self.cache) {
                reporter.record(&result);
                results.push(result);
                continue;
            }

            let log = log_path(&self.config.log_dir, name, &run_id);
            launched.push((name.clone(), log.clone()));

            let permits = Arc::clone(&permits);
            let action = Arc::clone(&node.action);
            let timeout = self.config.task_timeout;
            let task_name = name.clone();
            workers.spawn(async move {
                let _permit = match permits.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        return TaskResult::new(task_name, Outcome::Failed)
                            .with_detail("worker pool closed before the task started")
                            .with_log(log);
                    }
                };
                run_worker(task_name, action, log, timeout).await
            });
        }

        // Join barrier: nothing downstream starts until every worker is done.
        let mut finished: HashSet<TaskName> = HashSet::new();
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(result) => {
                    if let Some(node) = graph.get(&result.name) {
                        step::mark_fresh(node, self.cache, &result);
                    }
                    finished.insert(result.name.clone());
                    reporter.record(&result);
                    results.push(result);
                }
                Err(err) => error!(error = %err, "parallel worker was lost"),
            }
        }

        for (name, log) in launched {
            if !finished.contains(&name) {
                let result = TaskResult::new(name, Outcome::Failed)
                    .with_detail("worker ended without reporting a result")
                    .with_log(log);
                reporter.record(&result);
                results.push(result);
            }
        }

        let mut phase: HashMap<TaskName, Outcome> = results
            .iter()
            .map(|r| (r.name.clone(), r.outcome.clone()))
            .collect();
        let mut aborted_by: Option<TaskName> = match self.config.failure_policy {
            FailurePolicy::AbortRun => results
                .iter()
                .find(|r| matches!(r.outcome, Outcome::Failed | Outcome::TimedOut))
                .map(|r| r.name.clone()),
            FailurePolicy::BlockDependents => None,
        };

        for gated in plan.ordered_downstream(graph) {
            let failed_gate: Vec<TaskName> = gated
                .gate
                .iter()
                .filter(|g| phase.get(*g).is_some_and(Outcome::blocks_dependents))
                .cloned()
                .collect();

            let node = graph
                .get(&gated.task)
                .ok_or_else(|| GraphError::UnknownTask(gated.task.clone()))?;

            let result = if !failed_gate.is_empty() {
                error!(
                    task = %gated.task,
                    gate = ?failed_gate,
                    "gate failed; downstream step not run"
                );
                TaskResult::not_run(gated.task.clone(), NotRunReason::GateFailed(failed_gate))
            } else if let Some(failed) = &aborted_by {
                warn!(task = %gated.task, failed = %failed, "run aborted; downstream step not run");
                TaskResult::not_run(gated.task.clone(), NotRunReason::Aborted(failed.clone()))
            } else if let Some(dep) = blocking_dependency(&node.deps, &phase, prior) {
                warn!(task = %gated.task, dependency = %dep, "dependency failed; not running");
                TaskResult::not_run(gated.task.clone(), NotRunReason::Blocked(dep))
            } else {
                debug!(task = %gated.task, "gate passed");
                step::execute(node, self.config, self.cache).await
            };

            if self.config.failure_policy == FailurePolicy::AbortRun
                && aborted_by.is_none()
                && matches!(result.outcome, Outcome::Failed | Outcome::TimedOut)
            {
                aborted_by = Some(result.name.clone());
            }
            phase.insert(result.name.clone(), result.outcome.clone());
            reporter.record(&result);
            results.push(result);
        }

        let report = RunReport::from_results(results);
        info!(success = report.success, run_id = %run_id, "parallel phase finished");
        Ok(report)
    }
}

/// One worker: the action runs in its own task so that a panic or a
/// timeout only ever takes down that task.
async fn run_worker(
    name: TaskName,
    action: Arc<dyn Action>,
    log: PathBuf,
    timeout: Option<Duration>,
) -> TaskResult {
    let start = Instant::now();
    info!(task = %name, log = ?log, "worker started");

    let sink = log.clone();
    let mut handle = tokio::spawn(async move { action.invoke_captured(&sink).await });

    let joined = match timeout {
        Some(limit) => match tokio::time::timeout(limit, &mut handle).await {
            Ok(joined) => joined,
            Err(_) => {
                handle.abort();
                warn!(task = %name, timeout = ?limit, "worker timed out");
                return step::timed_out(&name, limit, start.elapsed()).with_log(log);
            }
        },
        None => (&mut handle).await,
    };

    match joined {
        Ok(output) => TaskResult::from_action(name, output, start.elapsed()).with_log(log),
        Err(err) if err.is_panic() => {
            error!(task = %name, "worker panicked");
            TaskResult::new(name, Outcome::Failed)
                .with_detail("action panicked")
                .with_duration(start.elapsed())
                .with_log(log)
        }
        Err(err) => TaskResult::new(name, Outcome::Failed)
            .with_detail(format!("worker cancelled: {err}"))
            .with_duration(start.elapsed())
            .with_log(log),
    }
}

fn failed_dependency(deps: &[TaskName], prior: &RunReport) -> Option<TaskName> {
    deps.iter()
        .find(|d| prior.outcome_of(d).is_some_and(Outcome::blocks_dependents))
        .cloned()
}

/// First dependency that failed, in this phase or an earlier one.
fn blocking_dependency(
    deps: &[TaskName],
    phase: &HashMap<TaskName, Outcome>,
    prior: Option<&RunReport>,
) -> Option<TaskName> {
    deps.iter()
        .find(|d| phase.get(*d).is_some_and(Outcome::blocks_dependents))
        .cloned()
        .or_else(|| prior.and_then(|p| failed_dependency(deps, p)))
}

/// `<log_dir>/<task>-<run id>.log`, with the task name made filename-safe.
fn log_path(dir: &Path, task: &str, run_id: &str) -> PathBuf {
    let safe: String = task
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect();
    dir.join(format!("{safe}-{run_id}.log"))
}
