// src/cache/freshness.rs

use std::fmt::Debug;

use anyhow::Result;

use crate::task::Location;

/// Comparable freshness marker for a location.
///
/// What the number means is up to the provider: nanoseconds since the epoch,
/// a ledger generation, or a logical registry version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Version(pub u128);

/// Result of probing a location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    Missing,
    Present(Version),
}

impl Freshness {
    pub fn exists(&self) -> bool {
        matches!(self, Freshness::Present(_))
    }

    pub fn version(&self) -> Option<Version> {
        match self {
            Freshness::Missing => None,
            Freshness::Present(v) => Some(*v),
        }
    }
}

/// Source of existence and freshness information.
pub trait FreshnessProvider: Send + Sync + Debug {
    /// Look up a location. Must not change any state.
    fn freshness(&self, location: &Location) -> Result<Freshness>;

    /// Record that `outputs` were just produced from `inputs`, so that a
    /// subsequent lookup sees every output at least as fresh as every input.
    fn mark_fresh(&self, outputs: &[Location], inputs: &[Location]) -> Result<()>;
}
