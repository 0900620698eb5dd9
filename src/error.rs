//! Error types for container decoding and conversion

use thiserror::Error;

/// Everything that can go wrong while converting a container.
///
/// Only [`ConvertError::MetadataParse`] is recoverable: the converter degrades
/// to empty metadata and records a warning instead of aborting.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// Bad magic or inconsistent structure
    #[error("not a valid ncm container: {0}")]
    Format(String),

    /// A declared length runs past the end of the file
    #[error("file is truncated: {0}")]
    Truncated(String),

    /// The key block did not decrypt to a well-formed content key
    #[error("failed to unwrap content key: {0}")]
    KeyDerivation(String),

    #[error("failed to parse metadata: {0}")]
    MetadataParse(String),

    /// Caller supplied unusable paths
    #[error("{0}")]
    InvalidInput(String),

    #[error("conversion cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConvertError {
    /// Whether this error must abort the conversion
    pub fn is_fatal(&self) -> bool {
        !matches!(self, ConvertError::MetadataParse(_))
    }
}

pub type Result<T> = std::result::Result<T, ConvertError>;
