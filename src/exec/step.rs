// src/exec/step.rs

//! Per-task steps shared by both executors.

use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::cache::IncrementalCache;
use crate::config::RunConfig;
use crate::report::{NotRunReason, Outcome, TaskResult};
use crate::task::{Action, TaskNode};

/// Guard first, then cache.
///
/// Returns the final result when the task should not be invoked.
pub(crate) fn precheck(
    node: &TaskNode,
    config: &RunConfig,
    cache: &IncrementalCache,
) -> Option<TaskResult> {
    if let Some(guard) = &node.guard {
        if !guard.evaluate(config) {
            info!(task = %node.name, "guard not satisfied; not running");
            return Some(TaskResult::not_run(
                node.name.clone(),
                NotRunReason::GuardFalse,
            ));
        }
    }

    if !cache.should_run(node) {
        info!(task = %node.name, "outputs are fresh; skipping");
        return Some(TaskResult::new(node.name.clone(), Outcome::Skipped));
    }

    None
}

/// Invoke an action once, bounded by `timeout`.
///
/// When the bound is hit the action's future is dropped, which kills any
/// child process it owns.
async fn invoke(name: &str, action: &dyn Action, timeout: Option<Duration>) -> TaskResult {
    let start = Instant::now();
    debug!(task = %name, action = %action.name(), "invoking action");

    let fut = action.invoke();

    let output = match timeout {
        Some(limit) => match tokio::time::timeout(limit, fut).await {
            Ok(output) => output,
            Err(_) => {
                warn!(task = %name, timeout = ?limit, "action timed out");
                return timed_out(name, limit, start.elapsed());
            }
        },
        None => fut.await,
    };

    TaskResult::from_action(name, output, start.elapsed())
}

pub(crate) fn timed_out(name: &str, limit: Duration, elapsed: Duration) -> TaskResult {
    TaskResult::new(name, Outcome::TimedOut)
        .with_detail(format!("timed out after {}", humanize(limit)))
        .with_duration(elapsed)
}

/// Record outputs of a succeeded task as fresh.
///
/// A failure here is logged and does not change the task's outcome; the
/// next run simply re-runs the task.
pub(crate) fn mark_fresh(node: &TaskNode, cache: &IncrementalCache, result: &TaskResult) {
    if result.outcome != Outcome::Succeeded {
        return;
    }
    if let Err(err) = cache.mark_fresh(node) {
        warn!(
            task = %node.name,
            error = %err,
            "failed to record outputs as fresh"
        );
    }
}

/// Full step for one eligible task: precheck, invoke, mark.
pub(crate) async fn execute(
    node: &TaskNode,
    config: &RunConfig,
    cache: &IncrementalCache,
) -> TaskResult {
    if let Some(result) = precheck(node, config, cache) {
        return result;
    }
    let result = invoke(&node.name, node.action.as_ref(), config.task_timeout).await;
    mark_fresh(node, cache, &result);
    result
}

fn humanize(d: Duration) -> String {
    if d.subsec_millis() == 0 {
        format!("{}s", d.as_secs())
    } else {
        format!("{}ms", d.as_millis())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn humanize_prefers_whole_seconds() {
        assert_eq!(humanize(Duration::from_secs(30)), "30s");
        assert_eq!(humanize(Duration::from_millis(150)), "150ms");
    }
}
