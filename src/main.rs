//! tierscope - a read-only storage tiering cost analyzer.
//!
//! Usage:
//!   tierscope [PATH]                 Scan and print a text report
//!   tierscope [PATH] -f json         Print the report as JSON
//!   tierscope [PATH] -o reports/     Write a timestamped report file
//!   tierscope --help                 Show help

mod logging;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::atomic::Ordering;
use std::thread;

use chrono::Local;
use clap::{Parser, ValueEnum};
use color_eyre::eyre::{Context, Result};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::info;

use tierscope_analyze::{AnalysisReport, CostModel, PricingTable, TierPolicy};
use tierscope_core::Category;
use tierscope_scan::{ScanConfig, ScanError, ScanProgress, ScanSummary, TierScanner};

/// Exit status after Ctrl-C, as a shell reports SIGINT.
const INTERRUPTED_EXIT: u8 = 130;

/// Day counts accepted by `--hot-days` and `--infrequent-days`.
const DAY_BOUNDS: &str = "7, 14, 30, 60, 90, 365, 730";

#[derive(Parser)]
#[command(
    name = "tierscope",
    version,
    about = "Estimate storage tiering savings from file access times",
    long_about = "tierscope walks a directory tree, buckets every file by how long ago it \
                  was last accessed or modified, and prices the result against hot, \
                  infrequent-access and archive storage tiers.\n\n\
                  It only reads metadata and never modifies files."
)]
struct Cli {
    /// Path to analyze (defaults to current directory)
    #[arg(default_value = ".")]
    path: PathBuf,

    /// Number of parallel workers (0 = one per CPU)
    #[arg(short = 'j', long, visible_alias = "parallel", default_value = "0")]
    workers: usize,

    /// Directory names to skip (glob patterns allowed)
    #[arg(short, long, num_args = 1..)]
    exclude: Vec<String>,

    /// Maximum directory depth to descend (root is 0)
    #[arg(short = 'd', long)]
    max_depth: Option<u32>,

    /// Follow symbolic links
    #[arg(short = 'L', long)]
    follow_symlinks: bool,

    /// Skip the file-count estimate that feeds the progress percentage
    #[arg(long)]
    skip_estimate: bool,

    /// Share one visited-directory set across workers
    #[arg(long)]
    shared_visited: bool,

    /// Also descend into /proc, /sys, /dev, /run, /tmp and /var/run
    #[arg(long)]
    include_system: bool,

    /// Output format
    #[arg(short, long, default_value = "text")]
    format: OutputFormat,

    /// Write a timestamped report into this directory instead of stdout
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Also write log lines to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Files last used within this many days stay in the hot tier
    /// (7, 14, 30, 60, 90, 365 or 730)
    #[arg(long, default_value = "7", value_parser = parse_days)]
    hot_days: Category,

    /// Files last used within this many days go to the infrequent tier
    /// (7, 14, 30, 60, 90, 365 or 730)
    #[arg(long, default_value = "30", value_parser = parse_days)]
    infrequent_days: Category,

    /// Hot tier price, USD per GB-month
    #[arg(long, default_value = "0.30")]
    hot_rate: f64,

    /// Infrequent-access tier price, USD per GB-month
    #[arg(long, default_value = "0.025")]
    infrequent_rate: f64,

    /// Archive tier price, USD per GB-month
    #[arg(long, default_value = "0.016")]
    archive_rate: f64,

    /// Do not print the progress line
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl OutputFormat {
    fn extension(self) -> &'static str {
        match self {
            OutputFormat::Text => "txt",
            OutputFormat::Json => "json",
        }
    }
}

fn main() -> Result<ExitCode> {
    color_eyre::install()?;

    let cli = Cli::parse();
    // Held until `main` returns so buffered log lines reach the file.
    let _log_guard = logging::init(cli.log_file.as_deref())?;

    let pricing = PricingTable::new(cli.hot_rate, cli.infrequent_rate, cli.archive_rate)?;
    let policy = TierPolicy::new(cli.hot_days, cli.infrequent_days)?;
    let model = CostModel::new(pricing, policy)?;
    let config = scan_config(&cli)?;

    let scanner = TierScanner::new();
    let cancel = scanner.cancel_flag();
    ctrlc::set_handler(move || {
        eprintln!("\nInterrupt received, stopping scan...");
        cancel.store(true, Ordering::SeqCst);
    })
    .context("Failed to set signal handler")?;

    eprintln!("Scanning {}...", cli.path.display());
    let progress = (!cli.quiet).then(|| spawn_progress(scanner.subscribe()));
    let result = scanner.scan(&config);

    // Dropping the scanner closes the channel, which ends the progress thread.
    drop(scanner);
    if let Some(handle) = progress {
        let _ = handle.join();
    }

    let Some(summary) = scan_outcome(result)? else {
        eprintln!("Scan interrupted, no report written.");
        return Ok(ExitCode::from(INTERRUPTED_EXIT));
    };

    if summary.has_errors() {
        eprintln!(
            "{} entries could not be read and were left out of the totals",
            summary.error_count()
        );
    }

    let report = AnalysisReport::new(summary, &model);
    let rendered = match cli.format {
        OutputFormat::Text => report.render_text(),
        OutputFormat::Json => serde_json::to_string_pretty(&report)?,
    };

    match cli.output_dir {
        Some(dir) => {
            let path = write_report(&dir, cli.format, &rendered)?;
            info!(path = %path.display(), "report written");
            eprintln!("Report written to {}", path.display());
        }
        None => println!("{rendered}"),
    }

    Ok(ExitCode::SUCCESS)
}

/// The scan result, or `None` when the run was interrupted.
fn scan_outcome(result: Result<ScanSummary, ScanError>) -> Result<Option<ScanSummary>> {
    match result {
        Ok(summary) => Ok(Some(summary)),
        Err(ScanError::Interrupted) => Ok(None),
        Err(err) => Err(err).context("Scan failed"),
    }
}

fn scan_config(cli: &Cli) -> Result<ScanConfig> {
    let mut builder = ScanConfig::builder();
    builder
        .root(cli.path.clone())
        .exclude(cli.exclude.clone())
        .max_depth(cli.max_depth)
        .follow_symlinks(cli.follow_symlinks)
        .workers(cli.workers)
        .shared_visited(cli.shared_visited)
        .estimate_total(!cli.skip_estimate);
    if cli.include_system {
        builder.system_prefixes(Vec::<PathBuf>::new());
    }
    builder.build().context("Invalid scan configuration")
}

/// Write `rendered` to `dir/tierscope_report_<timestamp>.<ext>`.
fn write_report(dir: &Path, format: OutputFormat, rendered: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Cannot create output directory {}", dir.display()))?;

    let stamp = Local::now().format("%Y%m%d_%H%M%S");
    let path = dir.join(format!("tierscope_report_{stamp}.{}", format.extension()));
    std::fs::write(&path, rendered)
        .with_context(|| format!("Cannot write report to {}", path.display()))?;
    Ok(path)
}

/// Print progress snapshots on one refreshing stderr line.
fn spawn_progress(mut rx: broadcast::Receiver<ScanProgress>) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut printed = false;
        loop {
            match rx.blocking_recv() {
                Ok(progress) => {
                    eprint!("\r{}", progress_line(&progress));
                    printed = true;
                    if progress.finished {
                        break;
                    }
                }
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
        if printed {
            eprintln!();
        }
    })
}

fn progress_line(progress: &ScanProgress) -> String {
    let percent = progress
        .fraction()
        .map(|f| format!(" ({:.0}%)", f * 100.0))
        .unwrap_or_default();
    format!(
        "{} files{percent}, {} dirs, {}, {} errors, {:.0} files/s   ",
        progress.files_scanned,
        progress.dirs_scanned,
        humansize::format_size(progress.bytes_scanned, humansize::BINARY),
        progress.errors_count,
        progress.files_per_second()
    )
}

/// Parse a day count that ends one of the recency buckets.
///
/// Other counts are rejected rather than rounded up to the enclosing bucket.
fn parse_days(s: &str) -> std::result::Result<Category, String> {
    let days: u64 = s
        .trim()
        .parse()
        .map_err(|_| format!("`{s}` is not a whole number of days"))?;
    Category::ending_at(days)
        .ok_or_else(|| format!("{days} is not a bucket boundary; use one of {DAY_BOUNDS}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_parse_days() {
        assert_eq!(parse_days("7").unwrap(), Category::Days0To7);
        assert_eq!(parse_days("30").unwrap(), Category::Days15To30);
        assert_eq!(parse_days("90").unwrap(), Category::Days61To90);
        assert_eq!(parse_days(" 730 ").unwrap(), Category::Days366To730);
        assert!(parse_days("-1").is_err());
        assert!(parse_days("week").is_err());
    }

    #[test]
    fn test_parse_days_rejects_mid_bucket_counts() {
        for days in ["0", "10", "31", "5000"] {
            let err = parse_days(days).unwrap_err();
            assert!(err.contains("not a bucket boundary"), "{days}: {err}");
        }
        assert!(Cli::try_parse_from(["tierscope", "--hot-days", "10"]).is_err());

        let cli = Cli::try_parse_from(["tierscope", "--hot-days", "14", "--infrequent-days", "90"])
            .unwrap();
        assert_eq!(cli.hot_days, Category::Days8To14);
        assert_eq!(cli.infrequent_days, Category::Days61To90);
    }

    #[test]
    fn test_interrupted_scan_is_not_an_error() {
        assert!(scan_outcome(Err(ScanError::Interrupted)).unwrap().is_none());

        let missing = ScanError::NotFound {
            path: PathBuf::from("/nonexistent"),
        };
        assert!(scan_outcome(Err(missing)).is_err());
    }

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::try_parse_from(["tierscope"]).unwrap();
        assert_eq!(cli.path, PathBuf::from("."));
        assert_eq!(cli.workers, 0);
        assert_eq!(cli.hot_days, Category::Days0To7);
        assert_eq!(cli.infrequent_days, Category::Days15To30);

        let config = scan_config(&cli).unwrap();
        assert!(config.estimate_total);
        assert!(!config.system_prefixes.is_empty() || cfg!(not(unix)));
    }

    #[test]
    fn test_cli_scan_options() {
        let cli = Cli::try_parse_from([
            "tierscope",
            "/mnt/efs",
            "--parallel",
            "8",
            "--exclude",
            ".snapshot",
            "node_modules",
            "--max-depth",
            "5",
            "--skip-estimate",
            "--include-system",
            "-f",
            "json",
        ])
        .unwrap();

        let config = scan_config(&cli).unwrap();
        assert_eq!(config.root, PathBuf::from("/mnt/efs"));
        assert_eq!(config.workers, 8);
        assert_eq!(config.exclude, vec![".snapshot", "node_modules"]);
        assert_eq!(config.max_depth, Some(5));
        assert!(!config.estimate_total);
        assert!(config.system_prefixes.is_empty());
        assert!(matches!(cli.format, OutputFormat::Json));
    }

    #[test]
    fn test_progress_line() {
        let progress = ScanProgress {
            files_scanned: 50,
            dirs_scanned: 3,
            bytes_scanned: 2048,
            estimated_total: Some(200),
            elapsed: Duration::from_secs(2),
            ..ScanProgress::new()
        };
        let line = progress_line(&progress);
        assert!(line.starts_with("50 files (25%), 3 dirs, "));
        assert!(line.contains("0 errors, 25 files/s"));
    }

    #[test]
    fn test_write_report_uses_timestamped_name() {
        let temp = std::env::temp_dir().join(format!("tierscope-report-{}", std::process::id()));
        let path = write_report(&temp, OutputFormat::Json, "{}").unwrap();

        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("tierscope_report_"));
        assert!(name.ends_with(".json"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}");
        std::fs::remove_dir_all(&temp).unwrap();
    }
}
