// src/cache/mod.rs

//! Incremental cache: decides whether a task must run or can be skipped.
//!
//! The decision only compares [`Freshness`] values handed out by a
//! [`FreshnessProvider`]:
//! - [`mtime`] uses filesystem modification times,
//! - [`hash`] uses blake3 content hashes and a generation ledger,
//! - [`memory`] keeps logical versions in memory.

pub mod freshness;
pub mod hash;
pub mod memory;
pub mod mtime;

use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, warn};

use crate::task::TaskNode;

pub use freshness::{Freshness, FreshnessProvider, Version};
pub use hash::{compute_file_hash, compute_hash_for_paths, HashFreshness};
pub use memory::MemoryFreshness;
pub use mtime::MtimeFreshness;

/// Staleness policy over a freshness provider.
#[derive(Debug, Clone)]
pub struct IncrementalCache {
    provider: Arc<dyn FreshnessProvider>,
    enabled: bool,
}

impl IncrementalCache {
    pub fn new(provider: Arc<dyn FreshnessProvider>) -> Self {
        Self {
            provider,
            enabled: true,
        }
    }

    /// A disabled cache runs every task and never marks anything.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Whether `task` has to run.
    ///
    /// - no outputs: always
    /// - outputs only: when any output is missing
    /// - inputs and outputs: when any output is missing or older than any
    ///   input
    ///
    /// Missing inputs are left out of the comparison. A provider error counts
    /// as "must run".
    pub fn should_run(&self, task: &TaskNode) -> bool {
        if !self.enabled || task.outputs.is_empty() {
            return true;
        }

        let mut oldest_output = None;
        for out in &task.outputs {
            match self.provider.freshness(out) {
                Ok(Freshness::Missing) => {
                    debug!(task = %task.name, output = %out, "output missing; task must run");
                    return true;
                }
                Ok(Freshness::Present(v)) => {
                    oldest_output = Some(oldest_output.map_or(v, |o: Version| o.min(v)));
                }
                Err(err) => {
                    warn!(
                        task = %task.name,
                        output = %out,
                        error = %err,
                        "could not check output freshness; task must run"
                    );
                    return true;
                }
            }
        }

        let mut newest_input = None;
        for inp in &task.inputs {
            match self.provider.freshness(inp) {
                Ok(Freshness::Missing) => {
                    warn!(
                        task = %task.name,
                        input = %inp,
                        "declared input does not exist; ignoring it for staleness"
                    );
                }
                Ok(Freshness::Present(v)) => {
                    newest_input = Some(newest_input.map_or(v, |n: Version| n.max(v)));
                }
                Err(err) => {
                    warn!(
                        task = %task.name,
                        input = %inp,
                        error = %err,
                        "could not check input freshness; task must run"
                    );
                    return true;
                }
            }
        }

        match (oldest_output, newest_input) {
            (Some(out), Some(inp)) if out < inp => {
                debug!(task = %task.name, "outputs older than inputs; task must run");
                true
            }
            _ => false,
        }
    }

    /// Record a successful run's outputs as fresh.
    pub fn mark_fresh(&self, task: &TaskNode) -> Result<()> {
        if !self.enabled || task.outputs.is_empty() {
            return Ok(());
        }
        self.provider.mark_fresh(&task.outputs, &task.inputs)
    }
}
