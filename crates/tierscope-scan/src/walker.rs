//! Sequential, depth-bounded directory walker.
//!
//! A walker owns its [`Aggregate`] and [`VisitedSet`] exclusively. Problems
//! with single entries or directories are counted in the aggregate and
//! logged; nothing is ever returned as an error.

use std::fs::{self, ReadDir};
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, trace, warn};

use tierscope_core::{Aggregate, FileRecord, ScanPhase, WarningKind};

use crate::context::ScanContext;
use crate::filter::DirVerdict;
use crate::visited::VisitedSet;

/// A subdirectory that passed the filter and the loop guard.
#[derive(Debug, Clone)]
pub struct Candidate {
    /// Path as listed (used for display and further listing).
    pub path: PathBuf,
    /// Canonical path recorded in the visited set.
    pub canonical: PathBuf,
}

/// Walks one subtree, recursing sequentially.
pub struct Walker<'a> {
    ctx: &'a ScanContext,
    visited: VisitedSet,
}

impl<'a> Walker<'a> {
    /// Create a walker with a fresh visited set from the context.
    pub fn new(ctx: &'a ScanContext) -> Self {
        Self::with_visited(ctx, ctx.visited_set())
    }

    /// Create a walker over an existing visited set.
    pub fn with_visited(ctx: &'a ScanContext, visited: VisitedSet) -> Self {
        Self { ctx, visited }
    }

    /// Mark a canonical directory as already visited, e.g. the scan root.
    pub fn seed(&mut self, canonical: PathBuf) {
        self.visited.insert(canonical);
    }

    pub fn visited(&self) -> &VisitedSet {
        &self.visited
    }

    /// Walk `dir`, which sits at `depth` below the scan root.
    ///
    /// The directory itself is vetted first: if its name is excluded, it
    /// lies under a system prefix, or it was already visited, the result is
    /// empty. An unresolvable path counts one error.
    pub fn walk(&mut self, dir: &Path, depth: u32) -> Aggregate {
        if self.ctx.config().beyond_depth(depth) {
            return Aggregate::new();
        }

        match self.ctx.filter().vet_dir(dir, &mut self.visited) {
            DirVerdict::Descend(_) => self.walk_vetted(dir, depth),
            DirVerdict::Unresolvable(err) => {
                let mut aggregate = Aggregate::new();
                self.warn(
                    &mut aggregate,
                    dir,
                    WarningKind::SymlinkResolution,
                    ScanPhase::Resolve,
                    &err,
                );
                aggregate
            }
            verdict => {
                debug!(path = %dir.display(), ?verdict, "skipping directory");
                Aggregate::new()
            }
        }
    }

    /// Walk a directory that has already been vetted and recorded.
    pub fn walk_vetted(&mut self, dir: &Path, depth: u32) -> Aggregate {
        let mut aggregate = Aggregate::new();

        // Hard cutoff: nothing at or below this directory is listed.
        if self.ctx.config().beyond_depth(depth) || self.ctx.is_cancelled() {
            return aggregate;
        }

        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(err) => {
                self.warn(
                    &mut aggregate,
                    dir,
                    WarningKind::DirectoryOpen,
                    ScanPhase::List,
                    &err,
                );
                return aggregate;
            }
        };
        self.ctx.progress.record_dir();

        let subdirs = self.scan_entries(dir, depth, entries, &mut aggregate);
        for subdir in subdirs {
            if self.ctx.is_cancelled() {
                break;
            }
            aggregate += self.walk_vetted(&subdir.path, depth + 1);
        }

        aggregate
    }

    /// Fold the regular files of one listing into `aggregate` and return the
    /// subdirectories worth descending into.
    ///
    /// `depth` is the depth of `dir`. Subdirectories beyond the depth limit
    /// are neither returned nor recorded as visited, so a link past the
    /// cutoff cannot claim a directory that is reachable within it.
    ///
    /// The listing is consumed here, so its handle is closed before the
    /// caller recurses.
    pub fn scan_entries(
        &mut self,
        dir: &Path,
        depth: u32,
        entries: ReadDir,
        aggregate: &mut Aggregate,
    ) -> Vec<Candidate> {
        let reference = self.ctx.config().reference_time;
        let follow = self.ctx.filter().follow_symlinks();
        let descend = !self.ctx.config().beyond_depth(depth.saturating_add(1));
        let mut subdirs = Vec::new();

        for entry in entries {
            let entry = match entry {
                Ok(e) => e,
                Err(err) => {
                    self.warn(aggregate, dir, WarningKind::EntryAccess, ScanPhase::List, &err);
                    continue;
                }
            };
            let path = entry.path();

            let file_type = match entry.file_type() {
                Ok(t) => t,
                Err(err) => {
                    self.warn(aggregate, &path, WarningKind::EntryAccess, ScanPhase::Stat, &err);
                    continue;
                }
            };
            let is_symlink = file_type.is_symlink();
            if is_symlink && !follow {
                continue;
            }

            // The listing may be stale, so the type is re-read from metadata.
            let metadata = if is_symlink {
                fs::metadata(&path)
            } else {
                entry.metadata()
            };
            let metadata = match metadata {
                Ok(m) => m,
                Err(err) if is_symlink => {
                    self.warn(
                        aggregate,
                        &path,
                        WarningKind::SymlinkResolution,
                        ScanPhase::Resolve,
                        &err,
                    );
                    continue;
                }
                Err(err) => {
                    self.warn(aggregate, &path, WarningKind::EntryAccess, ScanPhase::Stat, &err);
                    continue;
                }
            };

            if metadata.is_file() {
                let record = FileRecord::from_metadata(&metadata, reference);
                let category = aggregate.record(record);
                self.ctx.progress.record_file(record.size);
                trace!(path = %path.display(), size = record.size, %category, "file");
            } else if metadata.is_dir() && descend {
                match self.ctx.filter().vet_dir(&path, &mut self.visited) {
                    DirVerdict::Descend(canonical) => subdirs.push(Candidate { path, canonical }),
                    DirVerdict::Unresolvable(err) => self.warn(
                        aggregate,
                        &path,
                        WarningKind::SymlinkResolution,
                        ScanPhase::Resolve,
                        &err,
                    ),
                    DirVerdict::AlreadyVisited(canonical) => {
                        debug!(
                            path = %path.display(),
                            target = %canonical.display(),
                            "directory already visited, not descending"
                        );
                    }
                    verdict => {
                        debug!(path = %path.display(), ?verdict, "skipping directory");
                    }
                }
            }
        }

        subdirs
    }

    fn warn(
        &self,
        aggregate: &mut Aggregate,
        path: &Path,
        kind: WarningKind,
        phase: ScanPhase,
        err: &io::Error,
    ) {
        aggregate.record_error();
        self.ctx.progress.record_error();
        warn!(path = %path.display(), %kind, %phase, error = %err, "scan warning");
    }
}
