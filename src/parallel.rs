use crate::data_models::CellRecord;
use crate::file_processor;
use crate::identity::IdentityResolver;
use crate::metrics::METRICS;
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Result of processing a single file
#[derive(Debug)]
pub struct FileProcessResult {
    pub file_path: PathBuf,
    pub records: Vec<CellRecord>,
    pub error: Option<String>,
    pub processing_time_ms: u128,
}

/// File processor that runs sequentially or on a rayon pool. Results always
/// come back in input order.
pub struct ParallelProcessor {
    num_workers: usize,
    show_progress: bool,
}

impl ParallelProcessor {
    /// One worker: files are parsed one after another.
    pub fn sequential() -> Self {
        Self {
            num_workers: 1,
            show_progress: false,
        }
    }

    pub fn new() -> Self {
        Self::with_workers(num_cpus::get())
    }

    pub fn with_workers(num_workers: usize) -> Self {
        let num_workers = num_workers.max(1);
        info!("Initializing ParallelProcessor with {} workers", num_workers);
        Self {
            num_workers,
            show_progress: false,
        }
    }

    /// Maps a `--jobs` value: 0 is one worker per CPU core, 1 is sequential.
    pub fn for_jobs(jobs: usize) -> Self {
        match jobs {
            0 => Self::new(),
            1 => Self::sequential(),
            n => Self::with_workers(n),
        }
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn num_workers(&self) -> usize {
        self.num_workers
    }

    pub fn process_files(&self, paths: &[PathBuf], resolver: &IdentityResolver) -> Vec<FileProcessResult> {
        let total_files = paths.len();
        info!("Starting processing of {} files with {} workers", total_files, self.num_workers);

        let progress = if self.show_progress {
            let bar = ProgressBar::new(total_files as u64);
            match ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
            {
                Ok(style) => bar.set_style(style.progress_chars("#>-")),
                Err(e) => warn!("Progress bar template rejected: {}", e),
            }
            bar
        } else {
            ProgressBar::hidden()
        };

        let run = |path: &PathBuf| {
            let result = process_one(path, resolver);
            progress.inc(1);
            result
        };

        let results: Vec<FileProcessResult> = if self.num_workers <= 1 {
            paths.iter().map(run).collect()
        } else {
            match rayon::ThreadPoolBuilder::new().num_threads(self.num_workers).build() {
                Ok(pool) => pool.install(|| paths.par_iter().map(run).collect()),
                Err(e) => {
                    warn!("Could not build worker pool ({}), processing sequentially", e);
                    paths.iter().map(run).collect()
                }
            }
        };

        progress.finish_with_message("File processing completed");
        results
    }
}

impl Default for ParallelProcessor {
    fn default() -> Self {
        Self::sequential()
    }
}

fn process_one(path: &Path, resolver: &IdentityResolver) -> FileProcessResult {
    let start = Instant::now();
    METRICS.lock().record_file_attempt();

    match file_processor::process_file(path, resolver) {
        Ok(records) => {
            let processing_time = start.elapsed().as_millis();
            info!(
                "Successfully processed {} records from {} in {}ms",
                records.len(),
                path.display(),
                processing_time
            );
            METRICS.lock().record_file_success(records.len() as u64);
            FileProcessResult {
                file_path: path.to_path_buf(),
                records,
                error: None,
                processing_time_ms: processing_time,
            }
        }
        Err(e) => {
            let processing_time = start.elapsed().as_millis();
            error!("Failed to process {}: {}", path.display(), e);
            METRICS.lock().record_file_failure();
            FileProcessResult {
                file_path: path.to_path_buf(),
                records: Vec::new(),
                error: Some(e.to_string()),
                processing_time_ms: processing_time,
            }
        }
    }
}

/// Expands inputs into the list of files to process, keeping input order.
///
/// Directories are walked recursively for `*.xml` files (sorted), patterns
/// containing `*` or `?` are globbed, and plain paths are kept as given so a
/// missing file is reported by the processor.
pub fn expand_inputs(inputs: &[PathBuf]) -> Vec<PathBuf> {
    inputs
        .iter()
        .flat_map(|input| {
            let path_str = input.to_string_lossy();
            if input.is_dir() {
                let mut found: Vec<PathBuf> = walkdir::WalkDir::new(input)
                    .into_iter()
                    .filter_map(|e| e.ok())
                    .filter(|e| e.file_type().is_file())
                    .filter(|e| {
                        e.path()
                            .extension()
                            .map_or(false, |ext| ext.eq_ignore_ascii_case("xml"))
                    })
                    .map(|e| e.into_path())
                    .collect();
                found.sort();
                info!("Found {} XML files under {}", found.len(), input.display());
                found
            } else if path_str.contains('*') || path_str.contains('?') {
                match glob::glob(&path_str) {
                    Ok(paths) => {
                        let expanded: Vec<PathBuf> = paths.filter_map(|entry| entry.ok()).collect();
                        info!("Expanded glob {} to {} files", path_str, expanded.len());
                        expanded
                    }
                    Err(e) => {
                        error!("Invalid glob pattern {}: {}", path_str, e);
                        vec![input.clone()]
                    }
                }
            } else {
                vec![input.clone()]
            }
        })
        .collect()
}
