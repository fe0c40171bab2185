// src/task/action.rs

//! The opaque unit of work a task wraps.
//!
//! The core never looks inside an [`Action`]: it invokes it at most once per
//! run and reads back an [`ActionOutput`]. Shell commands live in
//! [`crate::exec::shell`]; [`FnAction`] adapts closures and
//! [`FallbackAction`] chains alternatives for one logical task.

use std::fmt;
use std::fs;
use std::future::Future;
use std::io::Write;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

pub type ActionFuture<'a> = Pin<Box<dyn Future<Output = ActionOutput> + Send + 'a>>;

/// What an action reports back after running.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionOutput {
    pub success: bool,
    pub detail: Option<String>,
    /// Where the thing came from (e.g. `"winget"`), forwarded to reporters.
    pub source: Option<String>,
    pub version: Option<String>,
}

impl ActionOutput {
    pub fn succeeded() -> Self {
        Self {
            success: true,
            ..Self::default()
        }
    }

    pub fn failed(detail: impl Into<String>) -> Self {
        Self {
            success: false,
            detail: Some(detail.into()),
            ..Self::default()
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }
}

/// An opaque, possibly side-effecting operation with a stable name.
pub trait Action: Send + Sync {
    fn name(&self) -> &str;

    /// Run the action once.
    fn invoke(&self) -> ActionFuture<'_>;

    /// Run the action with its output captured into the log sink at `log`.
    ///
    /// The default runs [`Action::invoke`] and writes the outcome to the
    /// sink. Implementations that own a child process should redirect the
    /// child's output there instead.
    fn invoke_captured<'a>(&'a self, log: &'a Path) -> ActionFuture<'a> {
        Box::pin(async move {
            let output = self.invoke().await;
            if let Err(err) = write_outcome_to_sink(log, self.name(), &output) {
                warn!(
                    action = %self.name(),
                    log = ?log,
                    error = %err,
                    "failed to write action output to log sink"
                );
            }
            output
        })
    }
}

impl fmt::Debug for dyn Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action").field("name", &self.name()).finish()
    }
}

fn write_outcome_to_sink(log: &Path, name: &str, output: &ActionOutput) -> Result<()> {
    if let Some(parent) = log.parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating log dir {:?}", parent))?;
    }
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log)
        .with_context(|| format!("opening log sink {:?}", log))?;

    let status = if output.success { "succeeded" } else { "failed" };
    writeln!(file, "{name}: {status}")?;
    if let Some(detail) = &output.detail {
        writeln!(file, "{detail}")?;
    }
    Ok(())
}

/// Action backed by an async closure.
pub struct FnAction<F> {
    name: String,
    f: F,
}

impl<F, Fut> FnAction<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = ActionOutput> + Send + 'static,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<F, Fut> Action for FnAction<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = ActionOutput> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn invoke(&self) -> ActionFuture<'_> {
        Box::pin((self.f)())
    }
}

/// Ordered alternatives for one logical task.
///
/// Each alternative is tried in turn until one succeeds. If all of them fail,
/// the last failure is returned.
pub struct FallbackAction {
    name: String,
    chain: Vec<Arc<dyn Action>>,
}

impl FallbackAction {
    pub fn new(name: impl Into<String>, chain: Vec<Arc<dyn Action>>) -> Self {
        Self {
            name: name.into(),
            chain,
        }
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    async fn run_chain(&self, log: Option<&Path>) -> ActionOutput {
        let mut last = ActionOutput::failed(format!("'{}' has no alternatives to try", self.name));

        for (idx, alt) in self.chain.iter().enumerate() {
            debug!(
                action = %self.name,
                alternative = %alt.name(),
                attempt = idx + 1,
                of = self.chain.len(),
                "trying alternative"
            );

            let output = match log {
                Some(log) => alt.invoke_captured(log).await,
                None => alt.invoke().await,
            };

            if output.success {
                if idx > 0 {
                    info!(
                        action = %self.name,
                        alternative = %alt.name(),
                        "fallback alternative succeeded"
                    );
                }
                return output;
            }

            warn!(
                action = %self.name,
                alternative = %alt.name(),
                detail = output.detail.as_deref().unwrap_or(""),
                "alternative failed"
            );
            last = output;
        }

        last
    }
}

impl Action for FallbackAction {
    fn name(&self) -> &str {
        &self.name
    }

    fn invoke(&self) -> ActionFuture<'_> {
        Box::pin(self.run_chain(None))
    }

    fn invoke_captured<'a>(&'a self, log: &'a Path) -> ActionFuture<'a> {
        Box::pin(self.run_chain(Some(log)))
    }
}
