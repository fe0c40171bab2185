// src/exec/shell.rs

//! Shell-command actions.

use std::collections::VecDeque;
use std::fs::{self, OpenOptions};
use std::path::Path;
use std::process::Stdio;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, error, info};

use crate::task::{Action, ActionFuture, ActionOutput};

/// Number of trailing stderr lines kept as failure detail.
const STDERR_TAIL: usize = 5;

/// Runs a command through the platform shell as a child process.
///
/// The child is killed if the returned future is dropped (timeouts, aborted
/// workers), so a hanging command never outlives its task.
#[derive(Debug, Clone)]
pub struct ShellAction {
    name: String,
    cmd: String,
    source: Option<String>,
    version: Option<String>,
}

impl ShellAction {
    pub fn new(name: impl Into<String>, cmd: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cmd: cmd.into(),
            source: None,
            version: None,
        }
    }

    pub fn with_source(mut self, source: Option<String>) -> Self {
        self.source = source;
        self
    }

    pub fn with_version(mut self, version: Option<String>) -> Self {
        self.version = version;
        self
    }

    pub fn cmd(&self) -> &str {
        &self.cmd
    }

    fn command(&self) -> Command {
        let mut c = if cfg!(windows) {
            let mut c = Command::new("cmd");
            c.arg("/C").arg(&self.cmd);
            c
        } else {
            let mut c = Command::new("sh");
            c.arg("-c").arg(&self.cmd);
            c
        };
        c.stdin(Stdio::null()).kill_on_drop(true);
        c
    }

    async fn run(&self, log: Option<&Path>) -> ActionOutput {
        let output = match self.run_inner(log).await {
            Ok(output) => output,
            Err(err) => {
                error!(action = %self.name, error = %err, "shell action error");
                ActionOutput::failed(format!("{err:#}"))
            }
        };

        let output = match &self.source {
            Some(src) => output.with_source(src.clone()),
            None => output,
        };
        match &self.version {
            Some(v) => output.with_version(v.clone()),
            None => output,
        }
    }

    async fn run_inner(&self, log: Option<&Path>) -> Result<ActionOutput> {
        info!(action = %self.name, cmd = %self.cmd, "starting process");

        let mut cmd = self.command();

        let piped = match log {
            Some(path) => {
                // Combined output goes to the sink; nothing to collect here.
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent)
                        .with_context(|| format!("creating log dir {:?}", parent))?;
                }
                let out = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .with_context(|| format!("opening log sink {:?}", path))?;
                let err = out
                    .try_clone()
                    .with_context(|| format!("duplicating log sink {:?}", path))?;
                cmd.stdout(Stdio::from(out)).stderr(Stdio::from(err));
                false
            }
            None => {
                cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
                true
            }
        };

        let mut child = cmd
            .spawn()
            .with_context(|| format!("spawning process for '{}'", self.name))?;

        let mut tail_handle = None;
        if piped {
            if let Some(stdout) = child.stdout.take() {
                let name = self.name.clone();
                tokio::spawn(async move {
                    let mut lines = BufReader::new(stdout).lines();
                    while let Ok(Some(line)) = lines.next_line().await {
                        debug!(action = %name, "stdout: {}", line);
                    }
                });
            }
            if let Some(stderr) = child.stderr.take() {
                let name = self.name.clone();
                tail_handle = Some(tokio::spawn(async move {
                    let mut tail: VecDeque<String> = VecDeque::with_capacity(STDERR_TAIL);
                    let mut lines = BufReader::new(stderr).lines();
                    while let Ok(Some(line)) = lines.next_line().await {
                        debug!(action = %name, "stderr: {}", line);
                        if tail.len() == STDERR_TAIL {
                            tail.pop_front();
                        }
                        tail.push_back(line);
                    }
                    tail.into_iter().collect::<Vec<_>>().join("\n")
                }));
            }
        }

        let status = child
            .wait()
            .await
            .with_context(|| format!("waiting for process of '{}'", self.name))?;

        let code = status.code().unwrap_or(-1);
        info!(
            action = %self.name,
            exit_code = code,
            success = status.success(),
            "process exited"
        );

        if status.success() {
            return Ok(ActionOutput::succeeded());
        }

        let tail = match tail_handle {
            Some(h) => h.await.unwrap_or_default(),
            None => String::new(),
        };
        let detail = if tail.trim().is_empty() {
            format!("exit code {code}")
        } else {
            format!("exit code {code}: {}", tail.trim())
        };
        Ok(ActionOutput::failed(detail))
    }
}

impl Action for ShellAction {
    fn name(&self) -> &str {
        &self.name
    }

    fn invoke(&self) -> ActionFuture<'_> {
        Box::pin(self.run(None))
    }

    fn invoke_captured<'a>(&'a self, log: &'a Path) -> ActionFuture<'a> {
        Box::pin(self.run(Some(log)))
    }
}
