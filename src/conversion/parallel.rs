//! Parallel container conversion using tokio
//!
//! Each conversion is blocking, so jobs run on tokio's blocking pool with a
//! semaphore limiting how many decode at once. The converter itself stays
//! single-threaded per file.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::Semaphore;

use super::convert;
use crate::error::ConvertError;
use crate::settings::ConverterSettings;

/// Worker count for a batch: the requested number, or one based on CPU cores
pub fn calculate_worker_count(requested: Option<usize>) -> usize {
    if let Some(n) = requested.filter(|&n| n > 0) {
        return n;
    }

    let available = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4);

    // Three quarters of the cores, between 2 and 8
    ((available * 3).div_ceil(4)).clamp(2, 8)
}

/// Shared counters for a batch, updated as each file finishes
#[derive(Debug)]
pub struct ConversionProgress {
    converted: AtomicUsize,
    failed: AtomicUsize,
    cancelled: AtomicUsize,
    pub total: usize,
}

impl ConversionProgress {
    pub fn new(total: usize) -> Self {
        Self {
            converted: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
            cancelled: AtomicUsize::new(0),
            total,
        }
    }

    /// Count one finished file; returns how many files have finished so far
    pub fn record(&self, result: &ConversionResult) -> usize {
        let counter = if result.success {
            &self.converted
        } else if result.cancelled {
            &self.cancelled
        } else {
            &self.failed
        };
        counter.fetch_add(1, Ordering::SeqCst);
        self.finished()
    }

    fn record_panic(&self) {
        self.failed.fetch_add(1, Ordering::SeqCst);
    }

    pub fn converted(&self) -> usize {
        self.converted.load(Ordering::SeqCst)
    }

    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::SeqCst)
    }

    /// Files stopped part way by the cancel token
    pub fn cancelled(&self) -> usize {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn finished(&self) -> usize {
        self.converted() + self.failed() + self.cancelled()
    }
}

/// A file to be converted
#[derive(Debug, Clone)]
pub struct ConversionJob {
    pub input_path: PathBuf,
    /// `None` writes next to the input
    pub output_dir: Option<PathBuf>,
}

/// Result of a single job
#[derive(Debug, Clone)]
pub struct ConversionResult {
    pub input_path: PathBuf,
    /// Path to the converted output file
    pub output_path: Option<PathBuf>,
    pub success: bool,
    /// Error message if conversion failed
    pub error: Option<String>,
    pub warnings: Vec<String>,
    pub cancelled: bool,
}

fn run_job(
    job: &ConversionJob,
    settings: &ConverterSettings,
    cancel_token: &AtomicBool,
) -> ConversionResult {
    match convert(
        &job.input_path,
        job.output_dir.as_deref(),
        settings,
        Some(cancel_token),
    ) {
        Ok(conversion) => ConversionResult {
            input_path: job.input_path.clone(),
            output_path: Some(conversion.output_path),
            success: true,
            error: None,
            warnings: conversion.warnings,
            cancelled: false,
        },
        Err(e) => ConversionResult {
            input_path: job.input_path.clone(),
            output_path: None,
            success: false,
            cancelled: matches!(e, ConvertError::Cancelled),
            error: Some(e.to_string()),
            warnings: Vec::new(),
        },
    }
}

/// Convert a batch of containers, `workers` at a time
///
/// `on_file_complete` runs on the worker thread as soon as each file is done.
/// Once `cancel_token` is set no further files start, and files already
/// decoding stop at their next chunk without leaving output behind.
///
/// Returns `(converted, failed, was_cancelled)`. Files stopped by the cancel
/// token count as neither converted nor failed.
pub async fn convert_files_parallel_with_callback<F>(
    jobs: Vec<ConversionJob>,
    settings: ConverterSettings,
    workers: usize,
    progress: Arc<ConversionProgress>,
    cancel_token: Arc<AtomicBool>,
    on_file_complete: F,
) -> (usize, usize, bool)
where
    F: Fn(&ConversionResult) + Send + Sync + 'static,
{
    let worker_count = workers.max(1);
    let slots = Arc::new(Semaphore::new(worker_count));
    let on_file_complete = Arc::new(on_file_complete);
    let settings = Arc::new(settings);

    log::info!(
        "Converting {} file(s) on {} worker(s)",
        jobs.len(),
        worker_count
    );

    let mut running = FuturesUnordered::new();
    let mut was_cancelled = false;

    for job in jobs {
        if cancel_token.load(Ordering::SeqCst) {
            log::info!("Cancel requested, not starting the remaining files");
            was_cancelled = true;
            break;
        }

        let Ok(slot) = slots.clone().acquire_owned().await else {
            break;
        };
        let progress = Arc::clone(&progress);
        let on_file_complete = Arc::clone(&on_file_complete);
        let settings = Arc::clone(&settings);
        let cancel = Arc::clone(&cancel_token);

        running.push(tokio::task::spawn_blocking(move || {
            let _slot = slot;
            let name = job
                .input_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| job.input_path.display().to_string());
            log::debug!("Decoding {}", name);

            let result = run_job(&job, &settings, &cancel);
            let finished = progress.record(&result);

            match (&result.error, result.cancelled) {
                (None, _) => {
                    log::info!("[{}/{}] {}", finished, progress.total, name);
                    for warning in &result.warnings {
                        log::warn!("{}: {}", name, warning);
                    }
                }
                (Some(_), true) => log::info!("Cancelled {}", name),
                (Some(error), false) => log::error!("{}: {}", name, error),
            }

            on_file_complete(&result);
            result
        }));
    }

    // In-flight files still finish (or notice the cancel) before returning
    while let Some(joined) = running.next().await {
        match joined {
            Ok(result) => was_cancelled |= result.cancelled,
            Err(e) => {
                progress.record_panic();
                log::error!("Conversion worker panicked: {}", e);
            }
        }
    }

    (progress.converted(), progress.failed(), was_cancelled)
}
