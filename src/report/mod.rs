// src/report/mod.rs

//! Run results and the reporting boundary.

pub mod outcome;
pub mod reporter;
pub mod summary;

pub use outcome::{NotRunReason, Outcome, RunReport, TaskResult};
pub use reporter::{MemoryReporter, Reporter, Tee, TracingReporter};
