use crate::error::{Result, SplitError};
use crate::split::{FileReport, FileSplitter};
use console::style;
use futures::stream::{FuturesUnordered, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

/// Result of processing a single source file.
#[derive(Debug, Serialize)]
pub struct FileOutcome {
    pub index: usize,
    pub source: PathBuf,
    pub report: Option<FileReport>,
    pub error: Option<String>,
    pub elapsed_ms: u64,
}

impl FileOutcome {
    pub fn is_success(&self) -> bool {
        self.report.is_some()
    }
}

/// Statistics from a batch run.
#[derive(Debug, Clone, Serialize)]
pub struct BatchStats {
    pub total_files: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub segments_written: usize,
    pub audio_duration_ms: u64,
    #[serde(serialize_with = "serialize_secs")]
    pub total_time: Duration,
}

/// Outcomes of every dispatched file, in discovery order.
#[derive(Debug, Serialize)]
pub struct BatchResult {
    pub outcomes: Vec<FileOutcome>,
    pub stats: BatchStats,
}

impl BatchResult {
    pub fn failures(&self) -> impl Iterator<Item = &FileOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    /// Write the full result as pretty-printed JSON.
    pub fn write_report(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        info!("Wrote batch report to {}", path.display());
        Ok(())
    }
}

fn serialize_secs<S: serde::Serializer>(d: &Duration, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64())
}

/// Recursively collect files under `root` whose extension matches, sorted by path.
///
/// Only `root` itself must be readable. Unreadable subdirectories are logged
/// and skipped, and symlinked directories are not descended into.
pub fn discover_files(root: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(SplitError::FileNotFound(root.display().to_string()));
    }

    let wanted = extension.trim_start_matches('.').to_lowercase();
    let mut files = Vec::new();
    let mut pending = Vec::new();

    collect_dir(root, &wanted, &mut files, &mut pending)?;
    while let Some(dir) = pending.pop() {
        if let Err(e) = collect_dir(&dir, &wanted, &mut files, &mut pending) {
            warn!("Skipping unreadable directory {}: {}", dir.display(), e);
        }
    }

    files.sort();
    Ok(files)
}

fn collect_dir(
    dir: &Path,
    wanted: &str,
    files: &mut Vec<PathBuf>,
    pending: &mut Vec<PathBuf>,
) -> std::io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry in {}: {}", dir.display(), e);
                continue;
            }
        };
        let file_type = match entry.file_type() {
            Ok(file_type) => file_type,
            Err(e) => {
                warn!("Skipping {}: {}", entry.path().display(), e);
                continue;
            }
        };
        let path = entry.path();

        if file_type.is_dir() {
            pending.push(path);
        } else if path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| ext.to_lowercase() == wanted)
            && (file_type.is_file() || path.is_file())
        {
            files.push(path);
        }
    }
    Ok(())
}

/// Runs one [`FileSplitter`] per file on a bounded pool of blocking workers.
pub struct BatchOrchestrator {
    splitter: Arc<FileSplitter>,
    max_workers: usize,
    show_progress: bool,
}

impl BatchOrchestrator {
    /// `max_workers` must be non-zero; [`Config::validate`](crate::Config::validate) enforces this.
    pub fn new(splitter: FileSplitter, max_workers: usize) -> Self {
        debug_assert!(max_workers > 0, "max_workers must be at least 1");
        Self {
            splitter: Arc::new(splitter),
            max_workers,
            show_progress: true,
        }
    }

    /// Enable or disable progress bar display.
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Discover files under `input_root` and split all of them.
    pub async fn run(&self, input_root: &Path, extension: &str) -> Result<BatchResult> {
        let files = discover_files(input_root, extension)?;
        Ok(self.process_files(files).await)
    }

    /// Split every file, waiting for all of them. Per-file failures never abort the batch.
    pub async fn process_files(&self, files: Vec<PathBuf>) -> BatchResult {
        let total_files = files.len();
        let start_time = Instant::now();

        info!(
            "Processing {} files with {} workers",
            total_files, self.max_workers
        );

        let progress_bar = if self.show_progress && total_files > 0 {
            let pb = ProgressBar::new(total_files as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files ({eta})")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("#>-"),
            );
            Some(pb)
        } else {
            None
        };

        let semaphore = Arc::new(Semaphore::new(self.max_workers));
        let mut futures = FuturesUnordered::new();

        for (index, source) in files.into_iter().enumerate() {
            let sem = semaphore.clone();
            let splitter = self.splitter.clone();
            let pb = progress_bar.clone();

            futures.push(async move {
                let file_start = Instant::now();

                let result = match sem.acquire_owned().await {
                    Ok(permit) => {
                        debug!("Starting file {}: {}", index, source.display());
                        let path = source.clone();
                        let joined = tokio::task::spawn_blocking(move || {
                            let _permit = permit;
                            splitter.split(&path)
                        })
                        .await;

                        match joined {
                            Ok(result) => result,
                            Err(e) => Err(SplitError::Worker(e.to_string())),
                        }
                    }
                    Err(e) => Err(SplitError::Worker(e.to_string())),
                };

                let elapsed_ms = file_start.elapsed().as_millis() as u64;

                if let Some(ref pb) = pb {
                    pb.inc(1);
                }

                match result {
                    Ok(report) => FileOutcome {
                        index,
                        source,
                        report: Some(report),
                        error: None,
                        elapsed_ms,
                    },
                    Err(e) => {
                        warn!("File {} failed: {}", source.display(), e);
                        FileOutcome {
                            index,
                            source,
                            report: None,
                            error: Some(e.to_string()),
                            elapsed_ms,
                        }
                    }
                }
            });
        }

        let mut outcomes: Vec<FileOutcome> = Vec::with_capacity(total_files);
        while let Some(outcome) = futures.next().await {
            outcomes.push(outcome);
        }

        if let Some(pb) = progress_bar {
            pb.finish_with_message("Splitting complete");
        }

        outcomes.sort_by_key(|o| o.index);

        let reports = outcomes.iter().filter_map(|o| o.report.as_ref());
        let succeeded = reports.clone().count();
        let stats = BatchStats {
            total_files,
            succeeded,
            failed: total_files - succeeded,
            segments_written: reports.clone().map(|r| r.segments.len()).sum(),
            audio_duration_ms: reports.map(|r| r.total_duration_ms).sum(),
            total_time: start_time.elapsed(),
        };

        info!(
            "Batch complete: {}/{} files split into {} segments in {:.2}s",
            stats.succeeded,
            stats.total_files,
            stats.segments_written,
            stats.total_time.as_secs_f64()
        );

        BatchResult { outcomes, stats }
    }
}

/// Print a summary of the batch results.
pub fn print_summary(result: &BatchResult) {
    let stats = &result.stats;

    println!();
    println!("═══════════════════════════════════════════════════════════════");
    println!("                      Splitting Complete                        ");
    println!("═══════════════════════════════════════════════════════════════");
    println!();
    println!("  Files:      {}", stats.total_files);
    println!("  Succeeded:  {}", style(stats.succeeded).green());
    if stats.failed > 0 {
        println!("  Failed:     {}", style(stats.failed).red());
    }
    println!("  Segments:   {}", stats.segments_written);
    println!(
        "  Audio:      {:.1}s",
        stats.audio_duration_ms as f64 / 1000.0
    );
    println!("  Time:       {:.2}s", stats.total_time.as_secs_f64());

    let failures: Vec<_> = result.failures().collect();
    if !failures.is_empty() {
        println!();
        println!("  {}", style("Failures:").bold());
        for outcome in failures {
            println!(
                "    {} {}: {}",
                style("✗").red(),
                outcome.source.display(),
                outcome.error.as_deref().unwrap_or("unknown error")
            );
        }
    }
    println!();
    println!("═══════════════════════════════════════════════════════════════");
}
