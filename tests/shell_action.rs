#![cfg(unix)]

use std::sync::Arc;
use std::time::Duration;

use provdag::config::{build_graph, run_config};
use provdag::dag::TaskGraph;
use provdag::exec::{ParallelExecutor, ParallelPlan, SequentialExecutor, ShellAction};
use provdag::report::{MemoryReporter, Outcome};
use provdag::task::{Action, TaskNode};
use provdag_test_utils::builders::{ConfigFileBuilder, TaskConfigBuilder};
use provdag_test_utils::{init_tracing, memory_cache, run_config_in, with_timeout};
use tempfile::TempDir;

#[tokio::test]
async fn test_exit_status_maps_to_outcome() {
    init_tracing();
    let ok = ShellAction::new("ok", "true").invoke().await;
    assert!(ok.success);

    let bad = ShellAction::new("bad", "echo 'no such package' >&2; exit 3")
        .invoke()
        .await;
    assert!(!bad.success);
    let detail = bad.detail.unwrap();
    assert!(detail.contains("exit code 3"), "{detail}");
    assert!(detail.contains("no such package"), "{detail}");
}

#[tokio::test]
async fn test_source_and_version_are_attached() {
    let out = ShellAction::new("git", "true")
        .with_source(Some("apt".into()))
        .with_version(Some("2.44.0".into()))
        .invoke()
        .await;
    assert_eq!(out.source.as_deref(), Some("apt"));
    assert_eq!(out.version.as_deref(), Some("2.44.0"));
}

#[tokio::test]
async fn test_captured_output_goes_to_log_sink() {
    let dir = TempDir::new().unwrap();
    let log = dir.path().join("logs").join("nox.log");

    let out = ShellAction::new("nox", "echo installing nox; echo warn >&2")
        .invoke_captured(&log)
        .await;

    assert!(out.success);
    let contents = std::fs::read_to_string(&log).unwrap();
    assert!(contents.contains("installing nox"));
    assert!(contents.contains("warn"));
}

#[tokio::test]
async fn test_timeout_kills_child_process() {
    let dir = TempDir::new().unwrap();
    let marker = dir.path().join("finished");
    let cmd = format!("sleep 2 && touch {}", marker.display());
    let graph = TaskGraph::new(vec![TaskNode::new(
        "slow",
        Arc::new(ShellAction::new("slow", cmd)),
    )])
    .unwrap();
    let config = run_config_in(dir.path()).with_task_timeout(Duration::from_millis(100));
    let (cache, _) = memory_cache();
    let mut reporter = MemoryReporter::new();

    let report = with_timeout(SequentialExecutor::new(&config, &cache).run(&graph, &mut reporter)).await;
    assert_eq!(report.outcome_of("slow"), Some(&Outcome::TimedOut));

    tokio::time::sleep(Duration::from_millis(2500)).await;
    assert!(!marker.exists(), "child process outlived its timeout");
}

#[tokio::test]
async fn test_declared_fallback_and_version_substitution() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("installed");
    let cfg = ConfigFileBuilder::new()
        .with_version("node", "20.11.0")
        .with_task(
            "node",
            TaskConfigBuilder::new("exit 1")
                .fallback(&format!("echo {{version}} > {}", out.display()))
                .build(),
        )
        .build();

    let settings = run_config(&cfg).unwrap();
    let graph = build_graph(&cfg, &settings).unwrap();
    let (cache, _) = memory_cache();
    let mut reporter = MemoryReporter::new();

    let report = SequentialExecutor::new(&settings, &cache)
        .run(&graph, &mut reporter)
        .await;

    assert_eq!(report.outcome_of("node"), Some(&Outcome::Succeeded));
    assert_eq!(report.get("node").unwrap().version.as_deref(), Some("20.11.0"));
    assert_eq!(std::fs::read_to_string(&out).unwrap().trim(), "20.11.0");
}

#[tokio::test]
async fn test_parallel_shell_workers_write_separate_logs() {
    let dir = TempDir::new().unwrap();
    let graph = TaskGraph::new(vec![
        TaskNode::new("Nox", Arc::new(ShellAction::new("Nox", "echo nox-out"))),
        TaskNode::new("Aider", Arc::new(ShellAction::new("Aider", "echo aider-out; exit 1"))),
    ])
    .unwrap();
    let config = run_config_in(&dir.path().join("logs"));
    let (cache, _) = memory_cache();
    let mut reporter = MemoryReporter::new();

    let report = with_timeout(ParallelExecutor::new(&config, &cache).run(
        &graph,
        &ParallelPlan::new(["Nox", "Aider"]),
        None,
        &mut reporter,
    ))
    .await
    .unwrap();

    let nox = std::fs::read_to_string(report.get("Nox").unwrap().log.as_ref().unwrap()).unwrap();
    let aider = std::fs::read_to_string(report.get("Aider").unwrap().log.as_ref().unwrap()).unwrap();
    assert!(nox.contains("nox-out") && !nox.contains("aider-out"));
    assert!(aider.contains("aider-out"));
    assert_eq!(report.outcome_of("Aider"), Some(&Outcome::Failed));
}
