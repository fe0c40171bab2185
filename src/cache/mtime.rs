// src/cache/mtime.rs

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use tracing::debug;

use crate::cache::freshness::{Freshness, FreshnessProvider, Version};
use crate::task::Location;

/// Freshness from filesystem modification times.
///
/// Locations are paths relative to `root` (absolute paths are used as-is).
/// Outputs that are still missing after a successful action are created as
/// empty marker files. A directory output is marked through a
/// [`DIR_MARKER`] file inside it, and its version is the newer of the two
/// modification times.
pub const DIR_MARKER: &str = ".provdag-fresh";

#[derive(Debug, Clone)]
pub struct MtimeFreshness {
    root: PathBuf,
}

impl MtimeFreshness {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, location: &Location) -> PathBuf {
        self.root.join(location.as_path())
    }
}

fn modified_version(path: &Path) -> Result<Version> {
    let modified = fs::metadata(path)
        .and_then(|m| m.modified())
        .with_context(|| format!("reading modification time of {:?}", path))?;
    let nanos = modified
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    Ok(Version(nanos))
}

impl FreshnessProvider for MtimeFreshness {
    fn freshness(&self, location: &Location) -> Result<Freshness> {
        let path = self.resolve(location);
        if !path.exists() {
            return Ok(Freshness::Missing);
        }
        let mut version = modified_version(&path)?;
        if path.is_dir() {
            let marker = path.join(DIR_MARKER);
            if marker.exists() {
                version = version.max(modified_version(&marker)?);
            }
        }
        Ok(Freshness::Present(version))
    }

    fn mark_fresh(&self, outputs: &[Location], _inputs: &[Location]) -> Result<()> {
        let now = SystemTime::now();

        for loc in outputs {
            let mut path = self.resolve(loc);
            if path.is_dir() {
                path.push(DIR_MARKER);
            }

            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("creating marker dir {:?}", parent))?;
            }

            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("opening marker {:?}", path))?;
            file.set_modified(now)
                .with_context(|| format!("touching marker {:?}", path))?;

            debug!(location = %loc, "marked output fresh (mtime)");
        }

        Ok(())
    }
}
