// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `provdag`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "provdag",
    version,
    about = "Provision a machine by running a dependency graph of tasks.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the declaration file (TOML).
    ///
    /// Default: `Provdag.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value = "Provdag.toml")]
    pub config: String,

    /// Parse + validate, print the execution order and parallel plan, but
    /// don't run anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Enable optional tasks under this name. Repeatable; merged with
    /// `[config].opt_in`.
    #[arg(long = "opt-in", value_name = "NAME")]
    pub opt_in: Vec<String>,

    /// Ignore the incremental cache and run every eligible task.
    #[arg(long)]
    pub force: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `PROVDAG_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
