//! Logger setup for the `ncmdump` binary
//!
//! Messages go to the terminal and to `ncmdump.log` under the platform log
//! directory (`~/Library/Logs/ncmdump` on macOS, the local data directory
//! elsewhere). The library itself only talks to the `log` facade.

use log::LevelFilter;
use simplelog::{
    ColorChoice, CombinedLogger, Config, ConfigBuilder, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

const LOG_FILE: &str = "ncmdump.log";
/// A log larger than this is moved to `ncmdump.log.old` at startup
const ROTATE_AT: u64 = 10 * 1024 * 1024;

pub fn get_log_directory() -> Option<PathBuf> {
    if cfg!(target_os = "macos") {
        dirs::home_dir().map(|home| home.join("Library/Logs/ncmdump"))
    } else {
        dirs::data_local_dir().map(|data| data.join("ncmdump").join("logs"))
    }
}

pub fn get_log_file_path() -> Option<PathBuf> {
    get_log_directory().map(|dir| dir.join(LOG_FILE))
}

fn terminal_level(verbose: bool) -> LevelFilter {
    if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    }
}

fn log_config() -> Config {
    ConfigBuilder::new()
        .set_time_format_rfc3339()
        .set_thread_level(LevelFilter::Off)
        .set_target_level(LevelFilter::Off)
        .build()
}

fn terminal_logger(verbose: bool) -> Box<dyn SharedLogger> {
    TermLogger::new(
        terminal_level(verbose),
        log_config(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )
}

/// Rotate an oversized log, then open `dir/ncmdump.log` for appending
fn open_log_file(dir: &Path) -> io::Result<(PathBuf, File)> {
    fs::create_dir_all(dir)?;
    let path = dir.join(LOG_FILE);

    if fs::metadata(&path).is_ok_and(|m| m.len() > ROTATE_AT) {
        fs::rename(&path, dir.join(format!("{}.old", LOG_FILE)))?;
    }

    let file = OpenOptions::new().create(true).append(true).open(&path)?;
    Ok((path, file))
}

/// Install the global logger
///
/// The terminal shows info (debug with `verbose`); the file always records
/// debug. Falls back to terminal-only output when the log file can't be
/// opened. Returns the log file path when file logging is active.
pub fn init_logging(verbose: bool) -> Option<PathBuf> {
    let opened = get_log_directory()
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no log directory"))
        .and_then(|dir| open_log_file(&dir));

    let mut loggers = vec![terminal_logger(verbose)];
    let log_path = match opened {
        Ok((path, file)) => {
            loggers.push(WriteLogger::new(LevelFilter::Debug, log_config(), file));
            Some(path)
        }
        Err(e) => {
            eprintln!("Warning: file logging disabled: {}", e);
            None
        }
    };

    if CombinedLogger::init(loggers).is_err() {
        eprintln!("Warning: Logger already initialized");
    }

    log::debug!("ncmdump {} starting", env!("CARGO_PKG_VERSION"));
    if let Some(path) = &log_path {
        log::debug!("Log file: {}", path.display());
    }
    log_path
}
