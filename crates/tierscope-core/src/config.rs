//! Scan configuration types.

use std::path::PathBuf;
use std::time::SystemTime;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

/// Configuration for one scan run.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct ScanConfig {
    /// Root path to scan.
    pub root: PathBuf,

    /// Directory names to exclude (glob syntax, plain names match exactly).
    #[builder(default)]
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Paths whose subtrees are never entered (virtual and runtime filesystems).
    #[builder(default = "default_system_prefixes()")]
    #[serde(default = "default_system_prefixes")]
    pub system_prefixes: Vec<PathBuf>,

    /// Maximum directory depth to traverse (None = unlimited). The root is depth 0.
    #[builder(default)]
    #[serde(default)]
    pub max_depth: Option<u32>,

    /// Follow symbolic links.
    #[builder(default = "false")]
    #[serde(default)]
    pub follow_symlinks: bool,

    /// Number of parallel workers (0 = auto-detect).
    #[builder(default = "0")]
    #[serde(default)]
    pub workers: usize,

    /// Fixed "now" for every recency calculation in the run.
    #[builder(default = "SystemTime::now()")]
    #[serde(default = "SystemTime::now")]
    pub reference_time: SystemTime,

    /// Share one visited set across all workers instead of one per worker.
    #[builder(default = "false")]
    #[serde(default)]
    pub shared_visited: bool,

    /// Pre-count files so progress snapshots carry an estimated total.
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub estimate_total: bool,
}

fn default_true() -> bool {
    true
}

/// Platform directories that hold no user data.
pub fn default_system_prefixes() -> Vec<PathBuf> {
    if cfg!(unix) {
        ["/proc", "/sys", "/dev", "/run", "/tmp", "/var/run"]
            .into_iter()
            .map(PathBuf::from)
            .collect()
    } else {
        Vec::new()
    }
}

impl ScanConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(ref root) = self.root {
            if root.as_os_str().is_empty() {
                return Err("Root path cannot be empty".to_string());
            }
        } else {
            return Err("Root path is required".to_string());
        }
        Ok(())
    }
}

impl ScanConfig {
    /// Create a new scan config builder.
    pub fn builder() -> ScanConfigBuilder {
        ScanConfigBuilder::default()
    }

    /// Create a simple config for scanning a path.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            exclude: Vec::new(),
            system_prefixes: default_system_prefixes(),
            max_depth: None,
            follow_symlinks: false,
            workers: 0,
            reference_time: SystemTime::now(),
            shared_visited: false,
            estimate_total: true,
        }
    }

    /// Worker count with 0 resolved to the number of logical CPUs.
    pub fn resolved_workers(&self) -> usize {
        match self.workers {
            0 => std::thread::available_parallelism().map_or(1, |n| n.get()),
            n => n,
        }
    }

    /// True when a directory at `depth` lies beyond the depth limit.
    pub fn beyond_depth(&self, depth: u32) -> bool {
        self.max_depth.is_some_and(|max| depth > max)
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self::new(".")
    }
}
