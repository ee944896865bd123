//! Quick file-count estimate used as a progress denominator.

use std::path::Path;

use jwalk::{Parallelism, WalkDir};

use crate::filter::PathFilter;

/// Files counted before the estimate gives up and extrapolates.
pub const DEFAULT_ESTIMATE_LIMIT: u64 = 10_000;

/// Result of [`estimate_file_count`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileEstimate {
    /// Exact count, or an extrapolation when `capped`.
    pub count: u64,
    /// The walk stopped at the limit and `count` is a guess.
    pub capped: bool,
}

/// Count regular files under `root` with a parallel jwalk pass.
///
/// Directories the filter skips are pruned, symlinks are not followed.
/// Once `limit` files are seen the walk stops and the count is scaled by
/// 1.5. `max_depth` uses scan depths (files directly in `root` are at 0).
pub fn estimate_file_count(
    root: &Path,
    filter: &PathFilter,
    max_depth: Option<u32>,
    limit: u64,
) -> FileEstimate {
    let prune = filter.clone();
    let walker = WalkDir::new(root)
        .skip_hidden(false)
        .follow_links(false)
        .parallelism(Parallelism::RayonDefaultPool {
            busy_timeout: std::time::Duration::from_millis(100),
        })
        .max_depth(max_depth.map_or(usize::MAX, |d| d as usize + 1))
        .process_read_dir(move |_depth, _path, _state, children| {
            children.retain(|child| match child {
                Ok(entry) if entry.file_type().is_dir() => {
                    !prune.should_skip(&entry.path(), true)
                }
                _ => true,
            });
        });

    let mut count = 0u64;
    for entry in walker.into_iter().flatten() {
        if entry.file_type().is_file() {
            count += 1;
            if count >= limit {
                return FileEstimate {
                    count: count + count / 2,
                    capped: true,
                };
            }
        }
    }

    FileEstimate {
        count,
        capped: false,
    }
}
