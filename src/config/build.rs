// src/config/build.rs

//! Turn a validated [`ConfigFile`] into runtime structures.

use std::sync::Arc;

use tracing::debug;

use crate::config::model::{ConfigFile, TaskConfig};
use crate::config::settings::RunConfig;
use crate::dag::TaskGraph;
use crate::errors::{ProvdagError, Result};
use crate::exec::{ParallelPlan, ShellAction};
use crate::task::{Action, FallbackAction, Guard, TaskNode};
use crate::types::parse_duration;

/// Settings for this invocation, before CLI overrides.
pub fn run_config(cfg: &ConfigFile) -> Result<RunConfig> {
    let task_timeout = match cfg.config.task_timeout.as_deref() {
        Some(raw) => Some(parse_duration(raw).map_err(|e| {
            ProvdagError::ConfigError(format!("invalid [config].task_timeout: {e}"))
        })?),
        None => None,
    };

    Ok(RunConfig {
        failure_policy: cfg.config.failure_policy,
        max_parallel: cfg.config.max_parallel.max(1),
        task_timeout,
        incremental: cfg.config.incremental,
        freshness: cfg.config.freshness,
        log_dir: cfg.config.log_dir.clone(),
        opt_in: cfg.config.opt_in.iter().cloned().collect(),
        versions: cfg.versions.clone(),
    })
}

/// Build the execution graph, one node per `[task.*]` in declaration order.
pub fn build_graph(cfg: &ConfigFile, run: &RunConfig) -> Result<TaskGraph> {
    let nodes = cfg
        .tasks
        .iter()
        .map(|(name, task)| build_node(name, task, run))
        .collect::<Vec<_>>();
    Ok(TaskGraph::new(nodes)?)
}

/// The `[parallel]` section as a plan, if present.
pub fn parallel_plan(cfg: &ConfigFile) -> Option<ParallelPlan> {
    let section = cfg.parallel.as_ref()?;
    let plan = section
        .downstream
        .iter()
        .fold(ParallelPlan::new(section.tasks.iter().cloned()), |plan, step| {
            plan.with_downstream(step.task.clone(), step.gate.iter().cloned())
        });
    Some(plan)
}

fn build_node(name: &str, task: &TaskConfig, run: &RunConfig) -> TaskNode {
    let version = task
        .version
        .as_deref()
        .or_else(|| run.version_for(name))
        .map(str::to_string);

    let shell = |label: String, cmd: &str| -> ShellAction {
        ShellAction::new(label, substitute_version(cmd, version.as_deref()))
            .with_source(task.source.clone())
            .with_version(version.clone())
    };

    let action: Arc<dyn Action> = if task.fallback.is_empty() {
        Arc::new(shell(name.to_string(), &task.cmd))
    } else {
        let mut chain: Vec<Arc<dyn Action>> = Vec::with_capacity(task.fallback.len() + 1);
        chain.push(Arc::new(shell(name.to_string(), &task.cmd)));
        for (i, cmd) in task.fallback.iter().enumerate() {
            chain.push(Arc::new(shell(format!("{name}#fallback{}", i + 1), cmd)));
        }
        Arc::new(FallbackAction::new(name, chain))
    };

    let mut node = TaskNode::new(name, action);
    for dep in &task.after {
        node = node.after(dep.clone());
    }
    for input in &task.inputs {
        node = node.input(input.as_str());
    }
    for output in &task.outputs {
        node = node.output(output.as_str());
    }
    if let Some(guard) = build_guard(name, task) {
        node = node.guard(guard);
    }

    debug!(task = %name, ?version, "built task node");
    node
}

fn build_guard(name: &str, task: &TaskConfig) -> Option<Guard> {
    let mut guards = Vec::new();
    if let Some(opt_in) = task.effective_opt_in(name) {
        guards.push(Guard::OptIn(opt_in.to_string()));
    }
    if let Some(var) = &task.only_if_env {
        guards.push(Guard::EnvSet(var.clone()));
    }
    match guards.len() {
        0 => None,
        1 => guards.pop(),
        _ => Some(Guard::All(guards)),
    }
}

fn substitute_version(cmd: &str, version: Option<&str>) -> String {
    match version {
        Some(v) => cmd.replace("{version}", v),
        None => cmd.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_placeholder_is_replaced_only_when_pinned() {
        assert_eq!(
            substitute_version("install-node {version}", Some("20.11.0")),
            "install-node 20.11.0"
        );
        assert_eq!(
            substitute_version("install-node {version}", None),
            "install-node {version}"
        );
    }

    #[test]
    fn optional_and_env_guards_are_combined() {
        let task = TaskConfig {
            cmd: "true".into(),
            optional: true,
            only_if_env: Some("CI".into()),
            ..TaskConfig::default()
        };
        match build_guard("Docker", &task) {
            Some(Guard::All(inner)) => assert_eq!(inner.len(), 2),
            other => panic!("expected combined guard, got {other:?}"),
        }
    }
}
