//! Container to audio conversion
//!
//! [`NcmFile::open`] parses the container, unwraps the content key and decodes
//! the metadata. [`NcmFile::dump`] streams the decrypted payload into the
//! output directory and embeds tags. Both run synchronously on the calling
//! thread; [`convert_async`] and [`parallel`] move them onto tokio's blocking
//! pool.

mod output_manager;
pub mod parallel;

pub use output_manager::{StagedOutput, output_file_path, resolve_output_dir};
pub use parallel::{ConversionJob, ConversionProgress, ConversionResult};

use std::fs::File;
use std::io::{ErrorKind, Read, Seek, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::audio::{AudioFormat, TrackMetadata, decode_metadata_block, write_track_tags};
use crate::container::{NcmContainer, read_container};
use crate::crypto::key::{ContentKey, unwrap_content_key};
use crate::crypto::keystream::{KeystreamState, StreamDecryptor};
use crate::error::{ConvertError, Result};
use crate::settings::ConverterSettings;

/// A finished conversion
#[derive(Debug, Clone)]
pub struct Conversion {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub format: AudioFormat,
    pub metadata: TrackMetadata,
    pub bytes_written: u64,
    /// Non-fatal problems: unreadable metadata, failed tag embedding
    pub warnings: Vec<String>,
}

/// An opened container, ready to be dumped once
pub struct NcmFile<R> {
    reader: R,
    source_path: PathBuf,
    container: NcmContainer,
    key: ContentKey,
    metadata: TrackMetadata,
    warnings: Vec<String>,
}

impl NcmFile<File> {
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ConvertError::InvalidInput(format!(
                "input {} does not exist",
                path.display()
            )));
        }
        if path.is_dir() {
            return Err(ConvertError::InvalidInput(format!(
                "input {} is a directory",
                path.display()
            )));
        }

        let file = File::open(path)?;
        Self::from_reader(file, path)
    }
}

impl<R: Read + Seek> NcmFile<R> {
    /// Parse a container from any seekable source
    ///
    /// `source_path` only names the output file; nothing is read from it.
    pub fn from_reader(mut reader: R, source_path: impl Into<PathBuf>) -> Result<Self> {
        let mut container = read_container(&mut reader)?;
        let key = unwrap_content_key(&container.key_block)?;

        let mut warnings = Vec::new();
        let metadata = match decode_metadata_block(&container.metadata_block) {
            Ok(mut metadata) => {
                if let Some(cover) = container.cover_image.take() {
                    metadata.cover = Some(cover);
                }
                metadata
            }
            Err(e) => {
                log::warn!("Ignoring unreadable metadata: {}", e);
                warnings.push(e.to_string());
                TrackMetadata::default()
            }
        };

        Ok(Self {
            reader,
            source_path: source_path.into(),
            container,
            key,
            metadata,
            warnings,
        })
    }

    pub fn metadata(&self) -> &TrackMetadata {
        &self.metadata
    }

    pub fn container(&self) -> &NcmContainer {
        &self.container
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Decrypt the payload into `output_dir` (the input's directory when `None`)
    ///
    /// `cancel` is polled between chunks. On any error, including
    /// cancellation, no output file is left behind.
    pub fn dump(
        self,
        output_dir: Option<&Path>,
        settings: &ConverterSettings,
        cancel: Option<&AtomicBool>,
    ) -> Result<Conversion> {
        let NcmFile {
            mut reader,
            source_path,
            container,
            key,
            metadata,
            mut warnings,
        } = self;

        check_cancelled(cancel)?;
        let out_dir = resolve_output_dir(&source_path, output_dir)?;

        container.seek_payload(&mut reader)?;
        let payload = (&mut reader).take(container.payload_len);
        let mut decryptor = StreamDecryptor::new(payload, KeystreamState::new(key));

        let mut buf = vec![0u8; settings.effective_chunk_size()];
        let head_len = fill_buffer(&mut decryptor, &mut buf)?;
        let format = AudioFormat::detect(&buf[..head_len], metadata.format.as_deref());
        let output_path = output_file_path(&out_dir, &source_path, format);

        let mut staged = StagedOutput::create(&out_dir)?;
        staged.write_all(&buf[..head_len])?;
        let mut bytes_written = head_len as u64;

        loop {
            check_cancelled(cancel)?;
            let n = fill_buffer(&mut decryptor, &mut buf)?;
            if n == 0 {
                break;
            }
            staged.write_all(&buf[..n])?;
            bytes_written += n as u64;
        }

        if bytes_written != container.payload_len {
            return Err(ConvertError::Truncated(format!(
                "payload ended after {} of {} bytes",
                bytes_written, container.payload_len
            )));
        }

        // Tags are written into the staging file so a failed save never
        // touches the committed output
        staged.flush()?;
        if settings.embed_tags && !metadata.is_empty() {
            if let Err(e) = write_track_tags(staged.path(), &metadata, settings.embed_cover) {
                log::warn!("Tag embedding failed for {}: {}", output_path.display(), e);
                warnings.push(format!("tag embedding failed: {}", e));
            }
        }

        let output_path = staged.commit(&output_path)?;
        log::info!(
            "Decoded {} ({} bytes, {})",
            output_path.display(),
            bytes_written,
            format.extension()
        );

        Ok(Conversion {
            input_path: source_path,
            output_path,
            format,
            metadata,
            bytes_written,
            warnings,
        })
    }
}

fn check_cancelled(cancel: Option<&AtomicBool>) -> Result<()> {
    if cancel.is_some_and(|flag| flag.load(Ordering::SeqCst)) {
        log::info!("Conversion cancelled");
        return Err(ConvertError::Cancelled);
    }
    Ok(())
}

/// Read until `buf` is full or the source is exhausted
fn fill_buffer<R: Read>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Convert one container file
pub fn convert(
    input: &Path,
    output_dir: Option<&Path>,
    settings: &ConverterSettings,
    cancel: Option<&AtomicBool>,
) -> Result<Conversion> {
    log::info!("Converting {}", input.display());
    let ncm = NcmFile::open(input)?;
    ncm.dump(output_dir, settings, cancel)
}

/// Run [`convert`] on tokio's blocking pool
pub async fn convert_async(
    input: PathBuf,
    output_dir: Option<PathBuf>,
    settings: ConverterSettings,
    cancel: Arc<AtomicBool>,
) -> Result<Conversion> {
    tokio::task::spawn_blocking(move || {
        convert(&input, output_dir.as_deref(), &settings, Some(cancel.as_ref()))
    })
    .await
    .map_err(|e| ConvertError::Io(std::io::Error::other(format!("conversion task failed: {}", e))))?
}
