//! NCM Converter
//!
//! Decodes NetEase Cloud Music `.ncm` containers into the audio files they
//! wrap (usually MP3 or FLAC) and carries the embedded title, artist, album
//! and cover art over into the output's tags.
//!
//! UI hosts call [`bridge::convert_file`] (or the C ABI in [`ffi`]); Rust
//! callers can use [`convert`] or [`NcmFile`] directly.

pub mod audio;
pub mod bridge;
pub mod container;
pub mod conversion;
pub mod crypto;
pub mod error;
pub mod ffi;
pub mod logging;
pub mod settings;

#[cfg(test)]
mod test_fixtures;

pub use bridge::convert_file;
pub use conversion::{Conversion, NcmFile, convert, convert_async};
pub use error::{ConvertError, Result};
pub use settings::ConverterSettings;
