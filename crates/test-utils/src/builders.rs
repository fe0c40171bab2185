#![allow(dead_code)]

use std::collections::BTreeMap;

use provdag::config::{ConfigFile, ConfigSection, DownstreamConfig, ParallelSection, TaskConfig};
use provdag::errors::Result;
use provdag::types::FailurePolicy;

/// Builder for `ConfigFile` to simplify test setup.
///
/// Tasks keep the order in which they are added.
pub struct ConfigFileBuilder {
    config: ConfigSection,
    versions: BTreeMap<String, String>,
    tasks: Vec<(String, TaskConfig)>,
    parallel: Option<ParallelSection>,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: ConfigSection::default(),
            versions: BTreeMap::new(),
            tasks: Vec::new(),
            parallel: None,
        }
    }

    pub fn with_task(mut self, name: &str, task: TaskConfig) -> Self {
        self.tasks.push((name.to_string(), task));
        self
    }

    pub fn with_version(mut self, task: &str, version: &str) -> Self {
        self.versions.insert(task.to_string(), version.to_string());
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.config.failure_policy = policy;
        self
    }

    pub fn with_max_parallel(mut self, max: usize) -> Self {
        self.config.max_parallel = max;
        self
    }

    pub fn with_task_timeout(mut self, timeout: &str) -> Self {
        self.config.task_timeout = Some(timeout.to_string());
        self
    }

    pub fn with_parallel(mut self, tasks: &[&str]) -> Self {
        let section = self.parallel.get_or_insert_with(ParallelSection::default);
        section.tasks = tasks.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn with_downstream(mut self, task: &str, gate: &[&str]) -> Self {
        let section = self.parallel.get_or_insert_with(ParallelSection::default);
        section.downstream.push(DownstreamConfig {
            task: task.to_string(),
            gate: gate.iter().map(|g| g.to_string()).collect(),
        });
        self
    }

    pub fn try_build(self) -> Result<ConfigFile> {
        ConfigFile::from_parts(self.config, self.versions, self.tasks, self.parallel)
    }

    pub fn build(self) -> ConfigFile {
        self.try_build()
            .expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `TaskConfig`.
pub struct TaskConfigBuilder {
    task: TaskConfig,
}

impl TaskConfigBuilder {
    pub fn new(cmd: &str) -> Self {
        Self {
            task: TaskConfig {
                cmd: cmd.to_string(),
                ..TaskConfig::default()
            },
        }
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.task.after.push(dep.to_string());
        self
    }

    pub fn fallback(mut self, cmd: &str) -> Self {
        self.task.fallback.push(cmd.to_string());
        self
    }

    pub fn input(mut self, loc: &str) -> Self {
        self.task.inputs.push(loc.to_string());
        self
    }

    pub fn output(mut self, loc: &str) -> Self {
        self.task.outputs.push(loc.to_string());
        self
    }

    pub fn optional(mut self) -> Self {
        self.task.optional = true;
        self
    }

    pub fn opt_in(mut self, name: &str) -> Self {
        self.task.opt_in = Some(name.to_string());
        self
    }

    pub fn only_if_env(mut self, var: &str) -> Self {
        self.task.only_if_env = Some(var.to_string());
        self
    }

    pub fn version(mut self, v: &str) -> Self {
        self.task.version = Some(v.to_string());
        self
    }

    pub fn source(mut self, s: &str) -> Self {
        self.task.source = Some(s.to_string());
        self
    }

    pub fn build(self) -> TaskConfig {
        self.task
    }
}
