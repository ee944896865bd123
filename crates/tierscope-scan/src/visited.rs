//! Symlink loop guard.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashSet;

/// Canonical paths of directories already descended into.
///
/// A `Local` set belongs to a single walker; a loop target reachable from two
/// workers' subtrees may then be walked once per worker. A `Shared` set is
/// one concurrent set for the whole run and gives exactly-once descent
/// across workers.
#[derive(Debug, Clone)]
pub enum VisitedSet {
    Local(HashSet<PathBuf>),
    Shared(Arc<DashSet<PathBuf>>),
}

impl VisitedSet {
    /// Create an empty set owned by one walker.
    pub fn local() -> Self {
        Self::Local(HashSet::new())
    }

    /// Wrap a set shared between workers.
    pub fn shared(set: Arc<DashSet<PathBuf>>) -> Self {
        Self::Shared(set)
    }

    /// Record a canonical path. Returns `true` if it had not been seen.
    pub fn insert(&mut self, canonical: PathBuf) -> bool {
        match self {
            Self::Local(set) => set.insert(canonical),
            Self::Shared(set) => set.insert(canonical),
        }
    }

    /// Check if a canonical path has been seen (without recording it).
    pub fn contains(&self, canonical: &Path) -> bool {
        match self {
            Self::Local(set) => set.contains(canonical),
            Self::Shared(set) => set.contains(canonical),
        }
    }

    /// Get the number of paths recorded.
    pub fn len(&self) -> usize {
        match self {
            Self::Local(set) => set.len(),
            Self::Shared(set) => set.len(),
        }
    }

    /// Check if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for VisitedSet {
    fn default() -> Self {
        Self::local()
    }
}
