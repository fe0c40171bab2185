// src/exec/mod.rs

//! Execution layer.
//!
//! - [`sequential`] runs the whole graph one task at a time.
//! - [`parallel`] fans an independent set out to bounded workers.
//! - [`phases`] combines both into one run.
//! - [`shell`] provides the [`ShellAction`] used for declared commands.

pub mod parallel;
pub mod phases;
pub mod sequential;
pub mod shell;
mod step;

pub use parallel::{GatedStep, ParallelExecutor, ParallelPlan};
pub use phases::run_phased;
pub use sequential::SequentialExecutor;
pub use shell::ShellAction;
