//! Per-run state shared read-only by every walker of a scan.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use dashmap::DashSet;
use tokio::sync::broadcast;

use tierscope_core::{ScanConfig, ScanError};

use crate::filter::PathFilter;
use crate::progress::{ProgressTracker, ScanProgress};
use crate::visited::VisitedSet;

/// Immutable inputs and thread-safe counters for one scan run.
///
/// Nothing here is global: a new context is built for every run and dropped
/// with it.
#[derive(Debug)]
pub struct ScanContext {
    config: ScanConfig,
    root: PathBuf,
    filter: PathFilter,
    pub(crate) progress: ProgressTracker,
    cancel: Arc<AtomicBool>,
    shared_visited: Option<Arc<DashSet<PathBuf>>>,
}

impl ScanContext {
    /// Build a standalone context for `config`, with its own cancel flag and
    /// no progress listeners.
    pub fn new(config: &ScanConfig) -> Result<Self, ScanError> {
        let root = config
            .root
            .canonicalize()
            .map_err(|e| ScanError::io(&config.root, e))?;
        let (tx, _) = broadcast::channel(1);
        Self::build(config, root, tx, Arc::new(AtomicBool::new(false)))
    }

    pub(crate) fn build(
        config: &ScanConfig,
        root: PathBuf,
        progress_tx: broadcast::Sender<ScanProgress>,
        cancel: Arc<AtomicBool>,
    ) -> Result<Self, ScanError> {
        let filter = PathFilter::new(config, &root)?;
        let shared_visited = config.shared_visited.then(|| Arc::new(DashSet::new()));
        Ok(Self {
            config: config.clone(),
            root,
            filter,
            progress: ProgressTracker::new(progress_tx),
            cancel,
            shared_visited,
        })
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Canonical scan root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn filter(&self) -> &PathFilter {
        &self.filter
    }

    /// A fresh visited set for one walker: private, or a handle to the
    /// run-wide shared set.
    pub fn visited_set(&self) -> VisitedSet {
        match &self.shared_visited {
            Some(set) => VisitedSet::shared(Arc::clone(set)),
            None => VisitedSet::local(),
        }
    }

    /// Raise the cancel flag.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    /// Current progress counters.
    pub fn progress(&self) -> ScanProgress {
        self.progress.snapshot(false)
    }
}
