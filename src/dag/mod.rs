// src/dag/mod.rs

//! Execution graph and dependency resolution.
//!
//! - [`graph`] holds the validated, immutable [`TaskGraph`].
//! - [`resolver`] computes the execution order and layering, reports
//!   cycles, and checks that a parallel set is mutually independent.

pub mod graph;
pub mod resolver;

pub use graph::TaskGraph;
pub use resolver::{ancestors, check_independent};
