//! Scan scheduler: fans top-level subdirectories out over a worker pool.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use rayon::prelude::*;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use tierscope_core::{Aggregate, ScanConfig, ScanError, ScanPhase, ScanSummary, WarningKind};

use crate::context::ScanContext;
use crate::estimate::{DEFAULT_ESTIMATE_LIMIT, estimate_file_count};
use crate::progress::ScanProgress;
use crate::walker::{Candidate, Walker};

/// Runs scans, publishing progress and honouring a cancel flag.
///
/// The cancel flag is sticky: once raised, every later `scan` on this
/// scanner returns [`ScanError::Interrupted`].
pub struct TierScanner {
    progress_tx: broadcast::Sender<ScanProgress>,
    cancel: Arc<AtomicBool>,
}

impl TierScanner {
    /// Create a new scanner.
    pub fn new() -> Self {
        let (progress_tx, _) = broadcast::channel(100);
        Self {
            progress_tx,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Subscribe to scan progress updates.
    pub fn subscribe(&self) -> broadcast::Receiver<ScanProgress> {
        self.progress_tx.subscribe()
    }

    /// Handle for raising the cancel flag from elsewhere (e.g. a signal handler).
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Stop dispatching work; in-flight walkers stop at their next directory.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    /// Scan the tree described by `config`.
    ///
    /// Only configuration problems and an unreadable root are fatal. Every
    /// other failure is counted in the returned aggregate.
    pub fn scan(&self, config: &ScanConfig) -> Result<ScanSummary, ScanError> {
        let start = Instant::now();
        if self.is_cancelled() {
            return Err(ScanError::Interrupted);
        }

        let root_path = config
            .root
            .canonicalize()
            .map_err(|e| ScanError::io(&config.root, e))?;
        if !root_path.is_dir() {
            return Err(ScanError::NotADirectory { path: root_path });
        }

        let ctx = ScanContext::build(
            config,
            root_path.clone(),
            self.progress_tx.clone(),
            Arc::clone(&self.cancel),
        )?;

        if config.estimate_total {
            let estimate = estimate_file_count(
                &root_path,
                ctx.filter(),
                config.max_depth,
                DEFAULT_ESTIMATE_LIMIT,
            );
            debug!(count = estimate.count, capped = estimate.capped, "estimated file count");
            ctx.progress.set_estimated_total(estimate.count);
        }

        // The root listing is the one directory failure that aborts the scan.
        let entries =
            std::fs::read_dir(&root_path).map_err(|e| ScanError::io(&root_path, e))?;
        ctx.progress.record_dir();

        let mut root_walker = Walker::new(&ctx);
        root_walker.seed(root_path.clone());
        let mut aggregate = Aggregate::new();
        let candidates = root_walker.scan_entries(&root_path, 0, entries, &mut aggregate);

        let workers = config.resolved_workers();
        let parallel = workers > 1 && candidates.len() >= workers;
        info!(
            root = %root_path.display(),
            subdirs = candidates.len(),
            workers,
            parallel,
            "starting scan"
        );

        if parallel {
            aggregate += run_parallel(&ctx, &candidates, workers)
                .unwrap_or_else(|| run_sequential(&mut root_walker, &candidates));
        } else {
            aggregate += run_sequential(&mut root_walker, &candidates);
        }

        if ctx.is_cancelled() {
            info!("scan interrupted");
            return Err(ScanError::Interrupted);
        }
        ctx.progress.publish(true);

        let scan_duration = start.elapsed();
        info!(
            files = aggregate.total_files(),
            bytes = aggregate.total_bytes(),
            errors = aggregate.error_count(),
            elapsed_ms = scan_duration.as_millis() as u64,
            "scan complete"
        );

        Ok(ScanSummary {
            root_path,
            aggregate,
            reference_time: config.reference_time,
            scan_duration,
            workers: if parallel { workers } else { 1 },
            parallel,
        })
    }
}

impl Default for TierScanner {
    fn default() -> Self {
        Self::new()
    }
}

/// Walk every candidate in the calling thread, sharing one visited set.
fn run_sequential(walker: &mut Walker<'_>, candidates: &[Candidate]) -> Aggregate {
    let mut aggregate = Aggregate::new();
    for candidate in candidates {
        aggregate += walker.walk_vetted(&candidate.path, 1);
    }
    aggregate
}

/// Walk candidates on a dedicated pool of `workers` threads.
///
/// Returns `None` if the pool cannot be started, so the caller can fall
/// back to a sequential walk.
fn run_parallel(ctx: &ScanContext, candidates: &[Candidate], workers: usize) -> Option<Aggregate> {
    run_parallel_with(ctx, candidates, workers, walk_candidate)
}

/// Run `work` once per candidate on the pool and merge the results.
fn run_parallel_with<F>(
    ctx: &ScanContext,
    candidates: &[Candidate],
    workers: usize,
    work: F,
) -> Option<Aggregate>
where
    F: Fn(&ScanContext, &Candidate) -> Aggregate + Sync,
{
    let pool = match rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("tierscope-worker-{i}"))
        .build()
    {
        Ok(pool) => pool,
        Err(err) => {
            warn!(error = %err, "cannot start worker pool, scanning sequentially");
            return None;
        }
    };

    Some(pool.install(|| {
        candidates
            .par_iter()
            .map(|candidate| {
                if ctx.is_cancelled() {
                    return Aggregate::new();
                }
                run_worker(ctx, candidate, &work)
            })
            .reduce(Aggregate::new, Aggregate::merge)
    }))
}

/// One worker: a walker with its own visited set over one subtree.
fn walk_candidate(ctx: &ScanContext, candidate: &Candidate) -> Aggregate {
    let mut visited = ctx.visited_set();
    visited.insert(ctx.root().to_path_buf());
    visited.insert(candidate.canonical.clone());
    Walker::with_visited(ctx, visited).walk_vetted(&candidate.path, 1)
}

/// Run `work` for one candidate, containing a panic as one counted error.
fn run_worker<F>(ctx: &ScanContext, candidate: &Candidate, work: &F) -> Aggregate
where
    F: Fn(&ScanContext, &Candidate) -> Aggregate,
{
    match panic::catch_unwind(AssertUnwindSafe(|| work(ctx, candidate))) {
        Ok(aggregate) => aggregate,
        Err(payload) => {
            ctx.progress.record_error();
            error!(
                path = %candidate.path.display(),
                kind = %WarningKind::WorkerFailure,
                phase = %ScanPhase::Dispatch,
                panic = panic_message(payload.as_ref()),
                "worker failed"
            );
            Aggregate::failed()
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    fn create_test_tree() -> TempDir {
        let temp = TempDir::new().unwrap();
        let root = temp.path();

        fs::create_dir(root.join("dir1")).unwrap();
        fs::create_dir(root.join("dir2")).unwrap();
        fs::create_dir(root.join("dir1/subdir")).unwrap();

        fs::write(root.join("file1.txt"), "hello").unwrap();
        fs::write(root.join("dir1/file2.txt"), "world world world").unwrap();
        fs::write(root.join("dir1/subdir/file3.txt"), "test").unwrap();
        fs::write(root.join("dir2/file4.txt"), "another file here").unwrap();

        temp
    }

    fn config(root: &Path, workers: usize) -> ScanConfig {
        ScanConfig::builder()
            .root(root)
            .workers(workers)
            .system_prefixes(Vec::<PathBuf>::new())
            .estimate_total(false)
            .build()
            .unwrap()
    }

    #[test]
    fn test_basic_scan() {
        let temp = create_test_tree();
        let summary = TierScanner::new().scan(&config(temp.path(), 1)).unwrap();

        assert_eq!(summary.total_files(), 4);
        assert_eq!(summary.total_bytes(), 5 + 17 + 4 + 17);
        assert_eq!(summary.error_count(), 0);
        assert!(!summary.parallel);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let temp = create_test_tree();
        let scanner = TierScanner::new();

        let sequential = scanner.scan(&config(temp.path(), 1)).unwrap();
        let parallel = scanner.scan(&config(temp.path(), 2)).unwrap();

        assert!(parallel.parallel);
        assert_eq!(parallel.workers, 2);
        assert_eq!(parallel.aggregate, sequential.aggregate);
    }

    #[test]
    fn test_missing_root_is_fatal() {
        let temp = TempDir::new().unwrap();
        let err = TierScanner::new()
            .scan(&config(&temp.path().join("nope"), 1))
            .unwrap_err();
        assert!(matches!(err, ScanError::NotFound { .. }));
    }

    #[test]
    fn test_file_root_is_not_a_directory() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("plain.txt");
        fs::write(&file, "x").unwrap();

        let err = TierScanner::new().scan(&config(&file, 1)).unwrap_err();
        assert!(matches!(err, ScanError::NotADirectory { .. }));
    }

    #[test]
    fn test_cancelled_scanner_is_interrupted() {
        let temp = create_test_tree();
        let scanner = TierScanner::new();
        scanner.cancel();

        let err = scanner.scan(&config(temp.path(), 2)).unwrap_err();
        assert!(matches!(err, ScanError::Interrupted));
    }

    #[test]
    fn test_final_progress_is_published() {
        let temp = create_test_tree();
        let scanner = TierScanner::new();
        let mut rx = scanner.subscribe();

        scanner.scan(&config(temp.path(), 1)).unwrap();

        let last = std::iter::from_fn(|| rx.try_recv().ok()).last().unwrap();
        assert!(last.finished);
        assert_eq!(last.files_scanned, 4);
        assert_eq!(last.dirs_scanned, 4);
    }

    #[test]
    fn test_panicking_worker_counts_one_error() {
        let temp = create_test_tree();
        let ctx = ScanContext::new(&config(temp.path(), 2)).unwrap();
        let candidates: Vec<Candidate> = ["dir1", "dir2"]
            .into_iter()
            .map(|name| {
                let path = ctx.root().join(name);
                Candidate {
                    canonical: path.clone(),
                    path,
                }
            })
            .collect();

        let aggregate = run_parallel_with(&ctx, &candidates, 2, |ctx, candidate| {
            if candidate.path.ends_with("dir2") {
                panic!("walker blew up");
            }
            walk_candidate(ctx, candidate)
        })
        .unwrap();

        assert_eq!(aggregate.error_count(), 1);
        // dir1/file2.txt and dir1/subdir/file3.txt survive.
        assert_eq!(aggregate.total_files(), 2);
        assert_eq!(aggregate.total_bytes(), 17 + 4);
        assert_eq!(ctx.progress().errors_count, 1);
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");
        let payload: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic");
    }
}
