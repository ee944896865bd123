//! Exclusion and loop-guard decisions for directory entries.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::warn;

use tierscope_core::{ScanConfig, ScanError};

use crate::visited::VisitedSet;

/// Outcome of vetting a directory before descending into it.
#[derive(Debug)]
pub enum DirVerdict {
    /// Not filtered and not seen before; carries the canonical path.
    Descend(PathBuf),
    /// Name matches the exclusion list.
    Excluded,
    /// Lies under a system prefix.
    System(PathBuf),
    /// Canonical path already descended into (symlink loop or alias).
    AlreadyVisited(PathBuf),
    /// Canonical path could not be resolved.
    Unresolvable(std::io::Error),
}

/// Decides which paths a walk skips.
#[derive(Debug, Clone)]
pub struct PathFilter {
    exclude: GlobSet,
    system_prefixes: Vec<PathBuf>,
    follow_symlinks: bool,
}

impl PathFilter {
    /// Build a filter for a scan rooted at the canonical path `root`.
    ///
    /// System prefixes are canonicalized once here. A prefix that contains
    /// `root` is dropped, since the caller asked to scan beneath it.
    pub fn new(config: &ScanConfig, root: &Path) -> Result<Self, ScanError> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &config.exclude {
            let glob = Glob::new(pattern).map_err(|e| {
                ScanError::invalid_config(format!("bad exclude pattern `{pattern}`: {e}"))
            })?;
            builder.add(glob);
        }
        let exclude = builder
            .build()
            .map_err(|e| ScanError::invalid_config(format!("bad exclude patterns: {e}")))?;

        let mut system_prefixes = Vec::with_capacity(config.system_prefixes.len());
        for prefix in &config.system_prefixes {
            let canonical = prefix.canonicalize().unwrap_or_else(|_| prefix.clone());
            if root.starts_with(&canonical) {
                warn!(
                    root = %root.display(),
                    prefix = %canonical.display(),
                    "scan root lies under a system directory, not excluding it"
                );
                continue;
            }
            system_prefixes.push(canonical);
        }

        Ok(Self {
            exclude,
            system_prefixes,
            follow_symlinks: config.follow_symlinks,
        })
    }

    /// Whether symbolic links are followed.
    pub fn follow_symlinks(&self) -> bool {
        self.follow_symlinks
    }

    /// Check a directory name against the exclusion list.
    pub fn is_excluded_name(&self, name: &OsStr) -> bool {
        self.exclude.is_match(name)
    }

    /// Check whether a canonical path lies under a system prefix.
    ///
    /// Containment is by whole path components, so `/procfiles` is not
    /// under `/proc`.
    pub fn is_system_path(&self, canonical: &Path) -> bool {
        self.system_prefixes
            .iter()
            .any(|prefix| canonical.starts_with(prefix))
    }

    /// Decide whether `path` is skipped, without touching any visited set.
    ///
    /// This is the stateless half of [`vet_dir`](Self::vet_dir): symlinks are
    /// skipped when not following, directories are skipped when their name is
    /// excluded, they lie under a system prefix, or their canonical path cannot
    /// be resolved. The estimate prunes with it; the walker calls `vet_dir`,
    /// which applies the same checks and then the loop guard.
    pub fn should_skip(&self, path: &Path, is_directory: bool) -> bool {
        if !self.follow_symlinks
            && path
                .symlink_metadata()
                .is_ok_and(|m| m.file_type().is_symlink())
        {
            return true;
        }
        is_directory && self.screen_dir(path).is_err()
    }

    /// Vet a directory for descent, recording it in `visited` on success.
    pub fn vet_dir(&self, path: &Path, visited: &mut VisitedSet) -> DirVerdict {
        let canonical = match self.screen_dir(path) {
            Ok(c) => c,
            Err(verdict) => return verdict,
        };
        if !visited.insert(canonical.clone()) {
            return DirVerdict::AlreadyVisited(canonical);
        }
        DirVerdict::Descend(canonical)
    }

    /// Name, resolution and system-prefix checks shared by both entry points.
    fn screen_dir(&self, path: &Path) -> Result<PathBuf, DirVerdict> {
        if path.file_name().is_some_and(|n| self.is_excluded_name(n)) {
            return Err(DirVerdict::Excluded);
        }
        let canonical = path.canonicalize().map_err(DirVerdict::Unresolvable)?;
        if self.is_system_path(&canonical) {
            return Err(DirVerdict::System(canonical));
        }
        Ok(canonical)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn filter_for(root: &Path, exclude: &[&str], prefixes: Vec<PathBuf>) -> PathFilter {
        let config = ScanConfig::builder()
            .root(root)
            .exclude(exclude.iter().map(|s| s.to_string()).collect::<Vec<_>>())
            .system_prefixes(prefixes)
            .build()
            .unwrap();
        PathFilter::new(&config, root).unwrap()
    }

    #[test]
    fn test_excluded_names() {
        let filter = filter_for(Path::new("/data"), &["node_modules", "*.cache"], vec![]);
        assert!(filter.is_excluded_name(OsStr::new("node_modules")));
        assert!(filter.is_excluded_name(OsStr::new("build.cache")));
        assert!(!filter.is_excluded_name(OsStr::new("node_modules_old")));
        assert!(!filter.is_excluded_name(OsStr::new("src")));
    }

    #[test]
    fn test_invalid_pattern_is_config_error() {
        let config = ScanConfig::builder()
            .root("/data")
            .exclude(vec!["[".to_string()])
            .build()
            .unwrap();
        let err = PathFilter::new(&config, Path::new("/data")).unwrap_err();
        assert!(matches!(err, ScanError::InvalidConfig { .. }));
    }

    #[test]
    fn test_system_prefix_is_component_wise() {
        let filter = filter_for(
            Path::new("/data"),
            &[],
            vec![PathBuf::from("/nonexistent-proc")],
        );
        assert!(filter.is_system_path(Path::new("/nonexistent-proc")));
        assert!(filter.is_system_path(Path::new("/nonexistent-proc/1/fd")));
        assert!(!filter.is_system_path(Path::new("/nonexistent-procfiles")));
        assert!(!filter.is_system_path(Path::new("/data/nonexistent-proc")));
    }

    #[test]
    fn test_prefix_containing_root_is_dropped() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().canonicalize().unwrap();
        let parent = root.parent().unwrap().to_path_buf();

        let filter = filter_for(&root, &[], vec![parent]);
        assert!(!filter.is_system_path(&root.join("child")));
    }

    #[test]
    fn test_vet_dir_records_and_detects_repeat() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().canonicalize().unwrap();
        fs::create_dir(root.join("a")).unwrap();
        fs::create_dir(root.join("skipme")).unwrap();

        let filter = filter_for(&root, &["skipme"], vec![]);
        let mut visited = VisitedSet::local();

        assert!(matches!(
            filter.vet_dir(&root.join("a"), &mut visited),
            DirVerdict::Descend(_)
        ));
        assert!(matches!(
            filter.vet_dir(&root.join("a"), &mut visited),
            DirVerdict::AlreadyVisited(_)
        ));
        assert!(matches!(
            filter.vet_dir(&root.join("skipme"), &mut visited),
            DirVerdict::Excluded
        ));
        assert!(matches!(
            filter.vet_dir(&root.join("missing"), &mut visited),
            DirVerdict::Unresolvable(_)
        ));
    }

    #[test]
    fn test_should_skip() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().canonicalize().unwrap();
        fs::create_dir(root.join("keep")).unwrap();
        fs::create_dir(root.join("drop")).unwrap();
        fs::write(root.join("file.txt"), "x").unwrap();

        let filter = filter_for(&root, &["drop"], vec![]);
        assert!(!filter.should_skip(&root.join("keep"), true));
        assert!(filter.should_skip(&root.join("drop"), true));
        assert!(!filter.should_skip(&root.join("file.txt"), false));
        assert!(filter.should_skip(&root.join("gone"), true));
    }

    #[test]
    fn test_should_skip_agrees_with_vet_dir() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().canonicalize().unwrap();
        for dir in ["keep", "drop", "sys"] {
            fs::create_dir(root.join(dir)).unwrap();
        }

        let filter = filter_for(&root, &["drop"], vec![root.join("sys")]);
        let mut visited = VisitedSet::local();
        for name in ["keep", "drop", "sys", "gone"] {
            let path = root.join(name);
            let descends = matches!(
                filter.vet_dir(&path, &mut visited),
                DirVerdict::Descend(_)
            );
            assert_eq!(filter.should_skip(&path, true), !descends, "{name}");
        }
        // A second vet is a repeat, but the stateless check still lets it through.
        assert!(!filter.should_skip(&root.join("keep"), true));
    }

    #[cfg(unix)]
    #[test]
    fn test_should_skip_symlink_unless_following() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().canonicalize().unwrap();
        fs::create_dir(root.join("target")).unwrap();
        std::os::unix::fs::symlink(root.join("target"), root.join("link")).unwrap();

        let filter = filter_for(&root, &[], vec![]);
        assert!(filter.should_skip(&root.join("link"), true));

        let config = ScanConfig::builder()
            .root(&root)
            .follow_symlinks(true)
            .system_prefixes(Vec::<PathBuf>::new())
            .build()
            .unwrap();
        let following = PathFilter::new(&config, &root).unwrap();
        assert!(!following.should_skip(&root.join("link"), true));
    }
}
