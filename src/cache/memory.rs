// src/cache/memory.rs

use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::{anyhow, Result};

use crate::cache::freshness::{Freshness, FreshnessProvider, Version};
use crate::task::Location;

#[derive(Debug, Default)]
struct Registry {
    versions: HashMap<Location, Version>,
    clock: u128,
}

/// Logical versions held in memory.
///
/// Stands in for external registries (package databases and the like) and
/// keeps tests off the filesystem.
#[derive(Debug, Default)]
pub struct MemoryFreshness {
    inner: Mutex<Registry>,
}

impl MemoryFreshness {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a location to an explicit version.
    pub fn set(&self, location: impl Into<Location>, version: u128) {
        if let Ok(mut reg) = self.inner.lock() {
            reg.clock = reg.clock.max(version);
            reg.versions.insert(location.into(), Version(version));
        }
    }

    /// Bump a location past every version seen so far (e.g. "input edited").
    pub fn touch(&self, location: impl Into<Location>) {
        if let Ok(mut reg) = self.inner.lock() {
            reg.clock += 1;
            let v = Version(reg.clock);
            reg.versions.insert(location.into(), v);
        }
    }

    pub fn remove(&self, location: &Location) {
        if let Ok(mut reg) = self.inner.lock() {
            reg.versions.remove(location);
        }
    }
}

impl FreshnessProvider for MemoryFreshness {
    fn freshness(&self, location: &Location) -> Result<Freshness> {
        let reg = self
            .inner
            .lock()
            .map_err(|_| anyhow!("freshness registry lock poisoned"))?;
        Ok(match reg.versions.get(location) {
            Some(v) => Freshness::Present(*v),
            None => Freshness::Missing,
        })
    }

    fn mark_fresh(&self, outputs: &[Location], _inputs: &[Location]) -> Result<()> {
        let mut reg = self
            .inner
            .lock()
            .map_err(|_| anyhow!("freshness registry lock poisoned"))?;
        reg.clock += 1;
        let v = Version(reg.clock);
        for loc in outputs {
            reg.versions.insert(loc.clone(), v);
        }
        Ok(())
    }
}
