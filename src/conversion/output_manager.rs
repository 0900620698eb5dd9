//! Output path resolution and staged writes
//!
//! Decoded audio goes to a hidden staging file in the output directory and is
//! renamed to `{stem}.{ext}` only once the whole payload has been written. A
//! staging file dropped without `commit` is deleted, so failed or cancelled
//! conversions never leave a half-written file behind.

use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::audio::AudioFormat;
use crate::error::{ConvertError, Result};

/// Pick the directory output goes to, creating it if needed
///
/// `None` or an empty path means "next to the input".
pub fn resolve_output_dir(input: &Path, output_dir: Option<&Path>) -> Result<PathBuf> {
    let dir = match output_dir.filter(|d| !d.as_os_str().is_empty()) {
        Some(dir) => dir.to_path_buf(),
        None => match input.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        },
    };

    if dir.exists() && !dir.is_dir() {
        return Err(ConvertError::InvalidInput(format!(
            "output path {} is not a directory",
            dir.display()
        )));
    }

    if !dir.exists() {
        fs::create_dir_all(&dir)?;
        log::debug!("Created output directory {:?}", dir);
    }

    Ok(dir)
}

/// `{dir}/{input stem}.{ext}`
pub fn output_file_path(dir: &Path, input: &Path, format: AudioFormat) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "output".to_string());
    dir.join(format!("{}.{}", stem, format.extension()))
}

/// A buffered staging file that becomes the real output on `commit`
pub struct StagedOutput {
    writer: BufWriter<NamedTempFile>,
}

impl StagedOutput {
    pub fn create(dir: &Path) -> Result<Self> {
        let file = tempfile::Builder::new()
            .prefix(".ncmdump-")
            .suffix(".part")
            .tempfile_in(dir)?;
        log::debug!("Staging output at {:?}", file.path());
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        self.writer.get_ref().path()
    }

    /// Flush and atomically move the staging file to `target`
    pub fn commit(self, target: &Path) -> Result<PathBuf> {
        let file = self.writer.into_inner().map_err(|e| e.into_error())?;
        file.as_file().sync_all()?;
        file.persist(target).map_err(|e| ConvertError::Io(e.error))?;
        Ok(target.to_path_buf())
    }
}

impl Write for StagedOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writer.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}
