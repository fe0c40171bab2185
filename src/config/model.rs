// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

use crate::config::settings::{DEFAULT_LOG_DIR, DEFAULT_MAX_PARALLEL};
use crate::errors::ProvdagError;
use crate::types::{FailurePolicy, FreshnessMode, TaskName};

/// Configuration exactly as read from a TOML file.
///
/// ```toml
/// [config]
/// max_parallel = 4
///
/// [versions]
/// node = "20.11.0"
///
/// [task.Init]
/// cmd = "echo init"
///
/// [task.node]
/// cmd = "install-node {version}"
/// after = ["Init"]
///
/// [parallel]
/// tasks = ["Nox", "Uvicorn"]
///
/// [[parallel.downstream]]
/// task = "FastAPI"
/// gate = ["Uvicorn"]
/// ```
///
/// `task` is kept as a raw table so that declaration order survives
/// deserialization; it drives tie-breaking in the resolver.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: ConfigSection,

    #[serde(default)]
    pub versions: BTreeMap<String, String>,

    #[serde(default)]
    pub task: toml::Table,

    #[serde(default)]
    pub parallel: Option<ParallelSection>,
}

/// Validated configuration.
///
/// Construct via `ConfigFile::try_from(raw)` or [`ConfigFile::from_parts`];
/// both run the checks in [`crate::config::validate`].
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub config: ConfigSection,
    pub versions: BTreeMap<String, String>,
    /// Tasks in declaration order.
    pub tasks: Vec<(TaskName, TaskConfig)>,
    pub parallel: Option<ParallelSection>,
}

impl ConfigFile {
    pub fn from_parts(
        config: ConfigSection,
        versions: BTreeMap<String, String>,
        tasks: Vec<(TaskName, TaskConfig)>,
        parallel: Option<ParallelSection>,
    ) -> Result<Self, ProvdagError> {
        let cfg = Self {
            config,
            versions,
            tasks,
            parallel,
        };
        crate::config::validate::validate_config(&cfg)?;
        Ok(cfg)
    }

    pub fn task(&self, name: &str) -> Option<&TaskConfig> {
        self.tasks.iter().find(|(n, _)| n == name).map(|(_, t)| t)
    }
}

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = ProvdagError;

    fn try_from(raw: RawConfigFile) -> Result<Self, Self::Error> {
        let mut tasks = Vec::with_capacity(raw.task.len());
        for (name, value) in raw.task {
            let task: TaskConfig = value.try_into().map_err(|e: toml::de::Error| {
                ProvdagError::ConfigError(format!("invalid [task.{name}]: {e}"))
            })?;
            tasks.push((name, task));
        }
        Self::from_parts(raw.config, raw.versions, tasks, raw.parallel)
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// `"block_dependents"` (default) or `"abort_run"`.
    #[serde(default)]
    pub failure_policy: FailurePolicy,

    #[serde(default = "default_max_parallel")]
    pub max_parallel: usize,

    /// Duration string such as `"30s"` or `"10m"`.
    #[serde(default)]
    pub task_timeout: Option<String>,

    #[serde(default = "default_incremental")]
    pub incremental: bool,

    #[serde(default)]
    pub freshness: FreshnessMode,

    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,

    #[serde(default)]
    pub opt_in: Vec<String>,
}

fn default_max_parallel() -> usize {
    DEFAULT_MAX_PARALLEL
}

fn default_incremental() -> bool {
    true
}

fn default_log_dir() -> PathBuf {
    PathBuf::from(DEFAULT_LOG_DIR)
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            failure_policy: FailurePolicy::default(),
            max_parallel: default_max_parallel(),
            task_timeout: None,
            incremental: default_incremental(),
            freshness: FreshnessMode::default(),
            log_dir: default_log_dir(),
            opt_in: Vec::new(),
        }
    }
}

/// `[task.<name>]` section.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct TaskConfig {
    /// Shell command to run. `{version}` is replaced by the pinned version.
    pub cmd: String,

    /// Alternative commands tried in order when `cmd` fails.
    #[serde(default)]
    pub fallback: Vec<String>,

    /// Dependency list: this task waits for all tasks listed here.
    #[serde(default)]
    pub after: Vec<String>,

    #[serde(default)]
    pub inputs: Vec<String>,

    /// Marker locations. Without outputs the task runs every time.
    #[serde(default)]
    pub outputs: Vec<String>,

    /// Skip unless the run opts in (under `opt_in`, or the task name).
    #[serde(default)]
    pub optional: bool,

    #[serde(default)]
    pub opt_in: Option<String>,

    /// Skip unless this environment variable is set and non-empty.
    #[serde(default)]
    pub only_if_env: Option<String>,

    /// Label forwarded to reporters (e.g. `"winget"`).
    #[serde(default)]
    pub source: Option<String>,

    /// Version pin; overrides `[versions]`.
    #[serde(default)]
    pub version: Option<String>,
}

impl TaskConfig {
    /// Opt-in name that enables this task, if it is optional.
    pub fn effective_opt_in<'a>(&'a self, task_name: &'a str) -> Option<&'a str> {
        if self.optional || self.opt_in.is_some() {
            Some(self.opt_in.as_deref().unwrap_or(task_name))
        } else {
            None
        }
    }
}

/// `[parallel]` section: a statically declared independent set.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ParallelSection {
    pub tasks: Vec<String>,

    #[serde(default)]
    pub downstream: Vec<DownstreamConfig>,
}

/// `[[parallel.downstream]]`: a step that only runs if its gate succeeded.
#[derive(Debug, Clone, Deserialize)]
pub struct DownstreamConfig {
    pub task: String,
    #[serde(default)]
    pub gate: Vec<String>,
}
