use std::path::Path;

/// Audio formats a decoded payload can turn out to be
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Mp3,
    Flac,
    Ogg,
    Wav,
    M4a,
}

impl AudioFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Flac => "flac",
            AudioFormat::Ogg => "ogg",
            AudioFormat::Wav => "wav",
            AudioFormat::M4a => "m4a",
        }
    }

    /// Identify a format from the first bytes of decoded audio
    pub fn from_signature(head: &[u8]) -> Option<Self> {
        if head.starts_with(b"fLaC") {
            Some(AudioFormat::Flac)
        } else if head.starts_with(b"ID3") {
            Some(AudioFormat::Mp3)
        } else if head.starts_with(b"OggS") {
            Some(AudioFormat::Ogg)
        } else if head.len() >= 12 && head.starts_with(b"RIFF") && &head[8..12] == b"WAVE" {
            Some(AudioFormat::Wav)
        } else if head.len() >= 8 && &head[4..8] == b"ftyp" {
            Some(AudioFormat::M4a)
        } else if head.len() >= 2 && head[0] == 0xFF && head[1] & 0xE0 == 0xE0 {
            // MPEG frame sync
            Some(AudioFormat::Mp3)
        } else {
            None
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim().to_lowercase().as_str() {
            "mp3" => Some(AudioFormat::Mp3),
            "flac" => Some(AudioFormat::Flac),
            "ogg" => Some(AudioFormat::Ogg),
            "wav" => Some(AudioFormat::Wav),
            "m4a" | "aac" => Some(AudioFormat::M4a),
            _ => None,
        }
    }

    /// Signature first, then the declared format, then mp3
    pub fn detect(head: &[u8], declared: Option<&str>) -> Self {
        Self::from_signature(head)
            .or_else(|| declared.and_then(Self::from_extension))
            .unwrap_or(AudioFormat::Mp3)
    }
}

/// Check if a file is an ncm container based on its extension
pub fn is_ncm_file(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case("ncm"))
        .unwrap_or(false)
}
