pub mod builders;
pub mod fake_action;

use std::path::Path;
use std::sync::{Arc, Once};

use provdag::cache::{IncrementalCache, MemoryFreshness};
use provdag::config::RunConfig;
use tracing_subscriber::{fmt, EnvFilter};

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// - Uses `with_test_writer()`, so logs are captured per-test.
/// - The Rust test harness only prints captured output for **failing** tests
///   (unless you run with `-- --nocapture`).
///
/// Enable levels with e.g.:
/// `RUST_LOG=provdag=debug cargo test`
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer() // print only for failing tests unless --nocapture
            .with_target(true)
            .init();
    });
}

/// Run a future with a 5-second timeout.
#[allow(dead_code)]
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(std::time::Duration::from_secs(5), f)
        .await
        .expect("Test timed out after 5 seconds")
}

/// Run settings for tests: logs under `log_dir`, no timeout.
pub fn run_config_in(log_dir: &Path) -> RunConfig {
    RunConfig::default().with_log_dir(log_dir)
}

/// Cache backed by an in-memory provider; the provider handle is returned
/// so tests can touch locations between runs.
pub fn memory_cache() -> (IncrementalCache, Arc<MemoryFreshness>) {
    let provider = Arc::new(MemoryFreshness::new());
    let cache = IncrementalCache::new(provider.clone());
    (cache, provider)
}
