// src/config/validate.rs

use std::collections::{HashMap, HashSet};

use crate::config::model::ConfigFile;
use crate::dag::resolver::topological_order;
use crate::errors::{GraphError, ProvdagError, Result};
use crate::types::parse_duration;

/// Run semantic validation against a loaded configuration.
///
/// This checks:
/// - there is at least one task, and no task has an empty `cmd`
/// - `[config]` values are sane (`max_parallel >= 1`, parseable
///   `task_timeout`)
/// - all `after` dependencies refer to existing tasks
/// - the task graph has no cycles
/// - the `[parallel]` section only names known tasks
///
/// Independence of the parallel set is checked later, against the built
/// graph (see [`crate::exec::ParallelPlan::validate`]).
pub fn validate_config(cfg: &ConfigFile) -> Result<()> {
    ensure_has_tasks(cfg)?;
    validate_global_config(cfg)?;
    validate_task_dependencies(cfg)?;
    validate_dag(cfg)?;
    validate_parallel_section(cfg)?;
    Ok(())
}

fn ensure_has_tasks(cfg: &ConfigFile) -> Result<()> {
    if cfg.tasks.is_empty() {
        return Err(ProvdagError::ConfigError(
            "config must contain at least one [task.<name>] section".to_string(),
        ));
    }
    for (name, task) in &cfg.tasks {
        if task.cmd.trim().is_empty() {
            return Err(ProvdagError::ConfigError(format!(
                "task '{name}' has an empty `cmd`"
            )));
        }
    }
    Ok(())
}

fn validate_global_config(cfg: &ConfigFile) -> Result<()> {
    if cfg.config.max_parallel == 0 {
        return Err(ProvdagError::ConfigError(
            "[config].max_parallel must be >= 1 (got 0)".to_string(),
        ));
    }

    if let Some(ref timeout) = cfg.config.task_timeout {
        parse_duration(timeout).map_err(|e| {
            ProvdagError::ConfigError(format!("invalid [config].task_timeout: {e}"))
        })?;
    }

    Ok(())
}

fn validate_task_dependencies(cfg: &ConfigFile) -> Result<()> {
    let mut seen: HashSet<&str> = HashSet::new();
    for (name, _) in &cfg.tasks {
        if !seen.insert(name.as_str()) {
            return Err(GraphError::DuplicateTask(name.clone()).into());
        }
    }

    for (name, task) in &cfg.tasks {
        for dep in &task.after {
            if !seen.contains(dep.as_str()) {
                return Err(ProvdagError::ConfigError(format!(
                    "task '{}' has unknown dependency '{}' in `after`",
                    name, dep
                )));
            }
        }
    }
    Ok(())
}

fn validate_dag(cfg: &ConfigFile) -> Result<()> {
    let index: HashMap<&str, usize> = cfg
        .tasks
        .iter()
        .enumerate()
        .map(|(i, (name, _))| (name.as_str(), i))
        .collect();

    let mut deps: Vec<Vec<usize>> = vec![Vec::new(); cfg.tasks.len()];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); cfg.tasks.len()];
    for (i, (_, task)) in cfg.tasks.iter().enumerate() {
        for dep in &task.after {
            if let Some(&j) = index.get(dep.as_str()) {
                if !deps[i].contains(&j) {
                    deps[i].push(j);
                    dependents[j].push(i);
                }
            }
        }
    }

    let names: Vec<&str> = cfg.tasks.iter().map(|(n, _)| n.as_str()).collect();
    topological_order(&names, &deps, &dependents)?;
    Ok(())
}

fn validate_parallel_section(cfg: &ConfigFile) -> Result<()> {
    let Some(ref parallel) = cfg.parallel else {
        return Ok(());
    };

    let known = |name: &str| cfg.tasks.iter().any(|(n, _)| n == name);

    for name in &parallel.tasks {
        if !known(name) {
            return Err(ProvdagError::ConfigError(format!(
                "[parallel].tasks names unknown task '{name}'"
            )));
        }
    }

    let mut steps = HashSet::new();
    for step in &parallel.downstream {
        if !known(&step.task) {
            return Err(ProvdagError::ConfigError(format!(
                "[[parallel.downstream]] names unknown task '{}'",
                step.task
            )));
        }
        if !steps.insert(step.task.as_str()) {
            return Err(ProvdagError::ConfigError(format!(
                "[[parallel.downstream]] lists '{}' more than once",
                step.task
            )));
        }
        for gate in &step.gate {
            if !known(gate) {
                return Err(ProvdagError::ConfigError(format!(
                    "gate of '{}' names unknown task '{gate}'",
                    step.task
                )));
            }
        }
    }

    Ok(())
}
