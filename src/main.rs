//! ncmdump - command line front end
//!
//! Converts `.ncm` containers, or every `.ncm` file below the given
//! directories, several files at a time.

use std::collections::HashSet;
use std::ffi::OsString;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use walkdir::WalkDir;

use ncm_converter::audio::is_ncm_file;
use ncm_converter::conversion::parallel::{
    calculate_worker_count, convert_files_parallel_with_callback,
};
use ncm_converter::conversion::{ConversionJob, ConversionProgress};
use ncm_converter::logging::init_logging;
use ncm_converter::settings::ConverterSettings;

/// Convert NetEase Cloud Music .ncm files to plain audio files.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Container files, or directories to search for .ncm files
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Directory for converted files (defaults to each input's directory)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Do not write title/artist/album tags
    #[arg(long)]
    no_tags: bool,

    /// Do not embed cover art
    #[arg(long)]
    no_cover: bool,

    /// Number of files converted at once
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Show debug output in the terminal
    #[arg(short, long)]
    verbose: bool,
}

/// Expand directories into the .ncm files below them
fn collect_inputs(inputs: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for input in inputs {
        if input.is_dir() {
            files.extend(
                WalkDir::new(input)
                    .follow_links(true)
                    .into_iter()
                    .filter_map(|e| e.ok())
                    .filter(|e| e.file_type().is_file() && is_ncm_file(e.path()))
                    .map(|e| e.into_path()),
            );
        } else {
            // Let the converter report missing or invalid files
            files.push(input.clone());
        }
    }

    files.sort();
    files.dedup();
    files
}

/// Drop inputs whose output name is already taken by an earlier input
///
/// With a shared `--output` directory, `a/song.ncm` and `b/song.ncm` would
/// both become `song.<ext>` and one would silently replace the other.
fn skip_clashing_outputs(files: Vec<PathBuf>) -> Vec<PathBuf> {
    let mut seen: HashSet<OsString> = HashSet::new();
    files
        .into_iter()
        .filter(|file| {
            let stem = file.file_stem().unwrap_or_default().to_os_string();
            if seen.insert(stem) {
                true
            } else {
                log::warn!(
                    "Skipping {}: another input already writes the same output name",
                    file.display()
                );
                false
            }
        })
        .collect()
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    let mut settings = ConverterSettings::load();
    if args.no_tags {
        settings.embed_tags = false;
    }
    if args.no_cover {
        settings.embed_cover = false;
    }

    let mut files = collect_inputs(&args.inputs);
    let mut skipped = 0;
    if args.output.is_some() {
        let total = files.len();
        files = skip_clashing_outputs(files);
        skipped = total - files.len();
    }
    if files.is_empty() {
        log::error!("No .ncm files found");
        std::process::exit(1);
    }

    let cancel_token = Arc::new(AtomicBool::new(false));
    let handler_token = cancel_token.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        handler_token.store(true, Ordering::SeqCst);
    }) {
        log::warn!("Could not install Ctrl-C handler: {}", e);
    }

    let jobs: Vec<ConversionJob> = files
        .into_iter()
        .map(|input_path| ConversionJob {
            input_path,
            output_dir: args.output.clone(),
        })
        .collect();
    let progress = Arc::new(ConversionProgress::new(jobs.len()));

    let (converted, failed, cancelled) = convert_files_parallel_with_callback(
        jobs,
        settings,
        calculate_worker_count(args.jobs),
        progress,
        cancel_token,
        |result| {
            if let Some(path) = &result.output_path {
                println!("{}", path.display());
            }
        },
    )
    .await;

    if cancelled {
        log::warn!("Cancelled: {} converted, {} failed", converted, failed);
    } else {
        log::info!(
            "Done: {} converted, {} failed, {} skipped",
            converted,
            failed,
            skipped
        );
    }

    if failed > 0 || skipped > 0 || cancelled {
        std::process::exit(1);
    }
}
