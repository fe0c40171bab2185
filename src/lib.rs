// src/lib.rs

pub mod cache;
pub mod cli;
pub mod config;
pub mod dag;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod report;
pub mod task;
pub mod types;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Result};
use tracing::{debug, info};

use crate::cache::{FreshnessProvider, HashFreshness, IncrementalCache, MtimeFreshness};
use crate::cli::CliArgs;
use crate::config::{build_graph, load_and_validate, parallel_plan, run_config, RunConfig};
use crate::dag::TaskGraph;
use crate::exec::{run_phased, ParallelPlan};
use crate::report::{MemoryReporter, Tee, TracingReporter};
use crate::types::FreshnessMode;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - declaration loading and CLI overrides
/// - graph + parallel plan construction
/// - the incremental cache
/// - the phased executor and reporting
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)?;

    let mut settings = run_config(&cfg)?;
    settings.opt_in.extend(args.opt_in.iter().cloned());
    if args.force {
        settings.incremental = false;
    }

    let graph = build_graph(&cfg, &settings)?;
    let plan = parallel_plan(&cfg);
    if let Some(ref plan) = plan {
        plan.validate(&graph)?;
    }

    if args.dry_run {
        print_dry_run(&graph, plan.as_ref(), &settings);
        return Ok(());
    }

    let root = config_root_dir(&config_path);
    let provider: Arc<dyn FreshnessProvider> = match settings.freshness {
        FreshnessMode::Mtime => Arc::new(MtimeFreshness::new(&root)),
        FreshnessMode::Hash => Arc::new(HashFreshness::open(&root)?),
    };
    let cache = IncrementalCache::new(provider).with_enabled(settings.incremental);

    info!(
        tasks = graph.len(),
        parallel = plan.is_some(),
        incremental = settings.incremental,
        "starting run"
    );

    let mut log_reporter = TracingReporter;
    let mut collected = MemoryReporter::new();
    let report = {
        let mut reporter = Tee::new(&mut log_reporter, &mut collected);
        run_phased(&graph, plan.as_ref(), &settings, &cache, &mut reporter).await?
    };
    debug!(records = collected.records.len(), "run finished");

    println!("{report}");

    if !report.success {
        bail!("run failed");
    }
    Ok(())
}

/// Directory the declared input/output locations are relative to.
///
/// - If the config path has a non-empty parent (e.g. "machines/Provdag.toml"),
///   we use that directory.
/// - If it's just a bare filename like "Provdag.toml" (parent = ""),
///   we fall back to the current working directory "."
fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

/// Print the execution order, layers and parallel plan without running.
fn print_dry_run(graph: &TaskGraph, plan: Option<&ParallelPlan>, settings: &RunConfig) {
    println!("provdag dry-run");
    println!("  config.failure_policy = {:?}", settings.failure_policy);
    println!("  config.max_parallel = {}", settings.max_parallel);
    println!("  config.incremental = {}", settings.incremental);
    if let Some(t) = settings.task_timeout {
        println!("  config.task_timeout = {t:?}");
    }
    println!();

    println!("order ({}):", graph.len());
    for (i, node) in graph.order().enumerate() {
        println!("  {:>2}. {}", i + 1, node.name);
        if !node.deps.is_empty() {
            println!("        after: {:?}", node.deps);
        }
        if let Some(ref guard) = node.guard {
            let enabled = guard.evaluate(settings);
            println!("        guard: {guard:?} ({})", if enabled { "enabled" } else { "disabled" });
        }
        if !node.outputs.is_empty() {
            let outputs: Vec<&str> = node.outputs.iter().map(|o| o.as_str()).collect();
            println!("        outputs: {outputs:?}");
        }
    }
    println!();

    println!("layers:");
    for (depth, layer) in graph.layers().iter().enumerate() {
        println!("  {depth}: {}", layer.join(", "));
    }

    if let Some(plan) = plan {
        println!();
        println!("parallel: {}", plan.tasks.join(", "));
        for step in &plan.downstream {
            println!("  then {} (gate: {})", step.task, step.gate.join(", "));
        }
    }

    debug!("dry-run complete (no execution)");
}
