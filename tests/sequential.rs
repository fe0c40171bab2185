use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use provdag::cache::IncrementalCache;
use provdag::config::RunConfig;
use provdag::dag::TaskGraph;
use provdag::exec::SequentialExecutor;
use provdag::report::{MemoryReporter, NotRunReason, Outcome};
use provdag::task::{ActionOutput, FallbackAction, FnAction, Guard, TaskNode};
use provdag::types::FailurePolicy;
use provdag_test_utils::fake_action::{FakeAction, Journal};
use provdag_test_utils::{init_tracing, memory_cache, with_timeout};

/// Init -> A -> B, Init -> C, with A replaced by `a`.
fn provision_graph(journal: &Journal, a: FakeAction) -> TaskGraph {
    TaskGraph::new(vec![
        FakeAction::succeed("Init").journal(journal).node(),
        a.journal(journal).node().after("Init"),
        FakeAction::succeed("B").journal(journal).node().after("A"),
        FakeAction::succeed("C").journal(journal).node().after("Init"),
    ])
    .unwrap()
}

#[tokio::test]
async fn test_all_tasks_succeed() {
    init_tracing();
    let journal = Journal::new();
    let graph = provision_graph(&journal, FakeAction::succeed("A"));
    let config = RunConfig::default();
    let (cache, _) = memory_cache();
    let mut reporter = MemoryReporter::new();

    let report = with_timeout(SequentialExecutor::new(&config, &cache).run(&graph, &mut reporter)).await;

    assert!(report.success);
    assert_eq!(report.count(|o| *o == Outcome::Succeeded), 4);
    assert_eq!(journal.entries(), vec!["Init", "A", "B", "C"]);
    assert_eq!(reporter.names(), vec!["Init", "A", "B", "C"]);
}

#[tokio::test]
async fn test_failure_blocks_only_dependents() {
    init_tracing();
    let journal = Journal::new();
    let graph = provision_graph(&journal, FakeAction::fail("A", "exit code 1"));
    let config = RunConfig::default();
    let (cache, _) = memory_cache();
    let mut reporter = MemoryReporter::new();

    let report = with_timeout(SequentialExecutor::new(&config, &cache).run(&graph, &mut reporter)).await;

    assert!(!report.success);
    assert_eq!(report.outcome_of("Init"), Some(&Outcome::Succeeded));
    assert_eq!(report.outcome_of("A"), Some(&Outcome::Failed));
    assert_eq!(
        report.outcome_of("B"),
        Some(&Outcome::NotRun(NotRunReason::Blocked("A".into())))
    );
    assert_eq!(report.outcome_of("C"), Some(&Outcome::Succeeded));
    assert_eq!(report.get("A").unwrap().detail.as_deref(), Some("exit code 1"));

    // B was never invoked; everything is still reported exactly once.
    assert_eq!(journal.entries(), vec!["Init", "A", "C"]);
    assert_eq!(reporter.names(), vec!["Init", "A", "B", "C"]);
}

#[tokio::test]
async fn test_blocked_propagates_transitively() {
    let graph = TaskGraph::new(vec![
        FakeAction::fail("A", "boom").node(),
        FakeAction::succeed("B").node().after("A"),
        FakeAction::succeed("D").node().after("B"),
    ])
    .unwrap();
    let config = RunConfig::default();
    let (cache, _) = memory_cache();
    let mut reporter = MemoryReporter::new();

    let report = SequentialExecutor::new(&config, &cache).run(&graph, &mut reporter).await;

    assert_eq!(
        report.outcome_of("D"),
        Some(&Outcome::NotRun(NotRunReason::Blocked("B".into())))
    );
}

#[tokio::test]
async fn test_abort_policy_stops_everything_after_first_failure() {
    init_tracing();
    let journal = Journal::new();
    let graph = provision_graph(&journal, FakeAction::fail("A", "boom"));
    let config = RunConfig::default().with_failure_policy(FailurePolicy::AbortRun);
    let (cache, _) = memory_cache();
    let mut reporter = MemoryReporter::new();

    let report = SequentialExecutor::new(&config, &cache).run(&graph, &mut reporter).await;

    assert!(!report.success);
    assert_eq!(
        report.outcome_of("C"),
        Some(&Outcome::NotRun(NotRunReason::Aborted("A".into())))
    );
    assert_eq!(
        report.outcome_of("B"),
        Some(&Outcome::NotRun(NotRunReason::Aborted("A".into())))
    );
    assert_eq!(journal.entries(), vec!["Init", "A"]);
}

#[tokio::test]
async fn test_false_guard_is_not_a_failure() {
    init_tracing();
    let docker = FakeAction::succeed("Docker");
    let calls = docker.calls();
    let graph = TaskGraph::new(vec![
        FakeAction::succeed("Init").node(),
        docker.node().after("Init").guard(Guard::OptIn("docker".into())),
        FakeAction::succeed("Compose").node().after("Docker"),
    ])
    .unwrap();
    let config = RunConfig::default();
    let (cache, _) = memory_cache();
    let mut reporter = MemoryReporter::new();

    let report = SequentialExecutor::new(&config, &cache).run(&graph, &mut reporter).await;

    assert!(report.success);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(
        report.outcome_of("Docker"),
        Some(&Outcome::NotRun(NotRunReason::GuardFalse))
    );
    // A guard skip does not block dependents.
    assert_eq!(report.outcome_of("Compose"), Some(&Outcome::Succeeded));

    // Opting in (case-insensitively) enables it.
    let config = RunConfig::default().with_opt_in("Docker");
    let report = SequentialExecutor::new(&config, &cache).run(&graph, &mut reporter).await;
    assert_eq!(report.outcome_of("Docker"), Some(&Outcome::Succeeded));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_predicate_guard_sees_run_config() {
    let graph = TaskGraph::new(vec![FakeAction::succeed("Pinned")
        .node()
        .guard(Guard::predicate(|cfg: &RunConfig| cfg.version_for("Pinned").is_some()))])
    .unwrap();
    let (cache, _) = memory_cache();
    let mut reporter = MemoryReporter::new();

    let config = RunConfig::default();
    let report = SequentialExecutor::new(&config, &cache).run(&graph, &mut reporter).await;
    assert_eq!(
        report.outcome_of("Pinned"),
        Some(&Outcome::NotRun(NotRunReason::GuardFalse))
    );

    let mut config = RunConfig::default();
    config.versions.insert("Pinned".into(), "1.2.3".into());
    let report = SequentialExecutor::new(&config, &cache).run(&graph, &mut reporter).await;
    assert_eq!(report.outcome_of("Pinned"), Some(&Outcome::Succeeded));
}

#[tokio::test]
async fn test_second_run_skips_fresh_tasks() {
    init_tracing();
    let node_install = FakeAction::succeed("node");
    let calls = node_install.calls();
    let graph = TaskGraph::new(vec![node_install
        .node()
        .input("versions.lock")
        .output("markers/node")])
    .unwrap();
    let config = RunConfig::default();
    let (cache, provider) = memory_cache();
    provider.touch("versions.lock");
    let mut reporter = MemoryReporter::new();
    let exec = SequentialExecutor::new(&config, &cache);

    let first = exec.run(&graph, &mut reporter).await;
    assert_eq!(first.outcome_of("node"), Some(&Outcome::Succeeded));

    let second = exec.run(&graph, &mut reporter).await;
    assert_eq!(second.outcome_of("node"), Some(&Outcome::Skipped));
    assert!(second.success);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // Input edited after the marker: stale again.
    provider.touch("versions.lock");
    let third = exec.run(&graph, &mut reporter).await;
    assert_eq!(third.outcome_of("node"), Some(&Outcome::Succeeded));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_failed_task_is_not_marked_fresh() {
    let graph = TaskGraph::new(vec![FakeAction::fail("node", "boom")
        .node()
        .output("markers/node")])
    .unwrap();
    let config = RunConfig::default();
    let (cache, _) = memory_cache();
    let mut reporter = MemoryReporter::new();
    let exec = SequentialExecutor::new(&config, &cache);

    exec.run(&graph, &mut reporter).await;
    let second = exec.run(&graph, &mut reporter).await;
    assert_eq!(second.outcome_of("node"), Some(&Outcome::Failed));
}

#[tokio::test]
async fn test_task_without_outputs_always_runs() {
    let action = FakeAction::succeed("echo");
    let calls = action.calls();
    let graph = TaskGraph::new(vec![action.node().input("anything")]).unwrap();
    let config = RunConfig::default();
    let (cache, _) = memory_cache();
    let mut reporter = MemoryReporter::new();
    let exec = SequentialExecutor::new(&config, &cache);

    exec.run(&graph, &mut reporter).await;
    exec.run(&graph, &mut reporter).await;
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_disabled_cache_runs_fresh_tasks() {
    let action = FakeAction::succeed("node");
    let calls = action.calls();
    let graph = TaskGraph::new(vec![action.node().output("markers/node")]).unwrap();
    let config = RunConfig::default();
    let (cache, provider) = memory_cache();
    provider.touch("markers/node");
    let cache = cache.with_enabled(false);
    let mut reporter = MemoryReporter::new();

    SequentialExecutor::new(&config, &cache).run(&graph, &mut reporter).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_hanging_action_times_out_and_blocks_dependents() {
    init_tracing();
    let graph = TaskGraph::new(vec![
        FakeAction::hang("Stuck").node(),
        FakeAction::succeed("After").node().after("Stuck"),
        FakeAction::succeed("Other").node(),
    ])
    .unwrap();
    let config = RunConfig::default().with_task_timeout(Duration::from_millis(50));
    let (cache, _) = memory_cache();
    let mut reporter = MemoryReporter::new();

    let report = with_timeout(SequentialExecutor::new(&config, &cache).run(&graph, &mut reporter)).await;

    assert!(!report.success);
    assert_eq!(report.outcome_of("Stuck"), Some(&Outcome::TimedOut));
    assert_eq!(
        report.outcome_of("After"),
        Some(&Outcome::NotRun(NotRunReason::Blocked("Stuck".into())))
    );
    assert_eq!(report.outcome_of("Other"), Some(&Outcome::Succeeded));
}

#[tokio::test]
async fn test_fallback_chain_uses_first_success() {
    let journal = Journal::new();
    let chain = FallbackAction::new(
        "nodejs",
        vec![
            Arc::new(FakeAction::fail("winget", "not found").journal(&journal)),
            Arc::new(FakeAction::succeed("choco").journal(&journal)),
            Arc::new(FakeAction::succeed("scoop").journal(&journal)),
        ],
    );
    let graph = TaskGraph::new(vec![TaskNode::new("nodejs", Arc::new(chain))]).unwrap();
    let config = RunConfig::default();
    let (cache, _) = memory_cache();
    let mut reporter = MemoryReporter::new();

    let report = SequentialExecutor::new(&config, &cache).run(&graph, &mut reporter).await;

    assert_eq!(report.outcome_of("nodejs"), Some(&Outcome::Succeeded));
    assert_eq!(journal.entries(), vec!["winget", "choco"]);
}

#[tokio::test]
async fn test_exhausted_fallback_reports_last_failure() {
    let chain = FallbackAction::new(
        "nodejs",
        vec![
            Arc::new(FakeAction::fail("winget", "not found")),
            Arc::new(FakeAction::fail("choco", "checksum mismatch")),
        ],
    );
    let graph = TaskGraph::new(vec![TaskNode::new("nodejs", Arc::new(chain))]).unwrap();
    let config = RunConfig::default();
    let (cache, _) = memory_cache();
    let mut reporter = MemoryReporter::new();

    let report = SequentialExecutor::new(&config, &cache).run(&graph, &mut reporter).await;

    let result = report.get("nodejs").unwrap();
    assert_eq!(result.outcome, Outcome::Failed);
    assert_eq!(result.detail.as_deref(), Some("checksum mismatch"));
}

#[tokio::test]
async fn test_action_metadata_reaches_the_report() {
    let action = FnAction::new("git", || async {
        ActionOutput::succeeded()
            .with_source("winget")
            .with_version("2.44.0")
    });
    let graph = TaskGraph::new(vec![TaskNode::new("git", Arc::new(action))]).unwrap();
    let config = RunConfig::default();
    let cache = IncrementalCache::new(Arc::new(provdag::cache::MemoryFreshness::new()));
    let mut reporter = MemoryReporter::new();

    SequentialExecutor::new(&config, &cache).run(&graph, &mut reporter).await;

    let record = &reporter.records[0];
    assert_eq!(record.source.as_deref(), Some("winget"));
    assert_eq!(record.version.as_deref(), Some("2.44.0"));
    assert!(record.duration.is_some());
}
