use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

/// Canonical task name type used throughout the crate.
pub type TaskName = String;

/// What the sequential executor does with the rest of the run once a task
/// has failed.
///
/// - `BlockDependents`: only tasks that (transitively) depend on the failed
///   task are withheld; independent tasks still run (default).
/// - `AbortRun`: every task after the first failure is withheld.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    #[default]
    BlockDependents,
    AbortRun,
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "block_dependents" => Ok(FailurePolicy::BlockDependents),
            "abort_run" => Ok(FailurePolicy::AbortRun),
            other => Err(format!(
                "invalid failure_policy: {other} (expected \"block_dependents\" or \"abort_run\")"
            )),
        }
    }
}

/// Which freshness signal backs the incremental cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FreshnessMode {
    /// Filesystem modification times.
    #[default]
    Mtime,
    /// blake3 content hashes tracked in `.provdag/hashes`.
    Hash,
}

impl FromStr for FreshnessMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mtime" => Ok(FreshnessMode::Mtime),
            "hash" => Ok(FreshnessMode::Hash),
            other => Err(format!(
                "invalid freshness: {other} (expected \"mtime\" or \"hash\")"
            )),
        }
    }
}

/// Parse a simple duration string like `"3s"`, `"250ms"`, `"1m"`, `"2h"`.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| "duration missing unit suffix".to_string())?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{}': {}", num_part, e))?;
    let unit = unit_part.trim().to_lowercase();

    match unit.as_str() {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        "m" => Ok(Duration::from_secs(value * 60)),
        "h" => Ok(Duration::from_secs(value * 60 * 60)),
        _ => Err(format!(
            "unsupported duration unit '{}'; expected ms, s, m, or h",
            unit
        )),
    }
}
