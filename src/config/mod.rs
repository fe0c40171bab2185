// src/config/mod.rs

//! Declaration file loading, validation and run settings.
//!
//! - [`model`] mirrors the TOML layout.
//! - [`loader`] reads a file into the model and validates it.
//! - [`validate`] holds the semantic checks.
//! - [`settings`] defines the immutable [`RunConfig`].
//! - [`build`] turns a validated file into a graph and a parallel plan.

pub mod build;
pub mod loader;
pub mod model;
pub mod settings;
pub mod validate;

pub use build::{build_graph, parallel_plan, run_config};
pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{
    ConfigFile, ConfigSection, DownstreamConfig, ParallelSection, RawConfigFile, TaskConfig,
};
pub use settings::RunConfig;
