//! Metadata block decoding
//!
//! The block is `163 key(Don't modify):` followed by base64 text. The base64
//! decodes to AES-128-ECB ciphertext, which decrypts to `music:` (or `dj:` for
//! radio programs) followed by a JSON object describing the track.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;
use serde_json::Value;

use crate::crypto::aes_ecb_decrypt;
use crate::error::{ConvertError, Result};

/// Fixed AES-128 key protecting the metadata block
pub const METADATA_KEY: [u8; 16] = *b"#14ljk_!\\]&0U<'(";

/// Plaintext tag in front of the base64 text
pub const METADATA_TAG: &[u8] = b"163 key(Don't modify):";

pub const MUSIC_PREFIX: &[u8] = b"music:";
pub const DJ_PREFIX: &[u8] = b"dj:";

/// Track information decoded from a container
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackMetadata {
    pub title: Option<String>,
    pub artists: Vec<String>,
    pub album: Option<String>,
    /// Source format as declared by the container (`mp3`, `flac`)
    pub format: Option<String>,
    pub bitrate: Option<u64>,
    pub duration_ms: Option<u64>,
    pub album_pic_url: Option<String>,
    pub aliases: Vec<String>,
    /// Cover art bytes, from the container or a data URI
    pub cover: Option<Vec<u8>>,
}

impl TrackMetadata {
    /// True when there is nothing worth writing into a tag
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.artists.is_empty() && self.album.is_none() && self.cover.is_none()
    }

    /// Artists joined for a single-valued tag field
    pub fn artist_display(&self) -> Option<String> {
        if self.artists.is_empty() {
            None
        } else {
            Some(self.artists.join("/"))
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawMusicInfo {
    #[serde(rename = "musicName")]
    music_name: Option<String>,
    artist: Option<Vec<Vec<Value>>>,
    album: Option<String>,
    #[serde(rename = "albumPic")]
    album_pic: Option<String>,
    format: Option<String>,
    bitrate: Option<Value>,
    duration: Option<Value>,
    alias: Option<Vec<String>>,
    #[serde(rename = "transNames")]
    trans_names: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct RawDjInfo {
    #[serde(rename = "mainMusic")]
    main_music: RawMusicInfo,
}

/// Numbers arrive either as JSON numbers or as numeric strings
fn value_as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

/// Decode the payload of a `data:image/...;base64,` URI
fn decode_data_uri(uri: &str) -> Option<Vec<u8>> {
    let rest = uri.strip_prefix("data:")?;
    let (header, data) = rest.split_once(',')?;
    if !header.ends_with(";base64") {
        return None;
    }
    STANDARD.decode(data.trim()).ok()
}

impl From<RawMusicInfo> for TrackMetadata {
    fn from(raw: RawMusicInfo) -> Self {
        let artists = raw
            .artist
            .unwrap_or_default()
            .iter()
            .filter_map(|entry| entry.first().and_then(Value::as_str))
            .filter(|name| !name.trim().is_empty())
            .map(String::from)
            .collect();

        let mut aliases = raw.alias.unwrap_or_default();
        aliases.extend(raw.trans_names.unwrap_or_default());

        let album_pic = non_empty(raw.album_pic);
        let cover = album_pic.as_deref().and_then(decode_data_uri);
        let album_pic_url = album_pic.filter(|p| !p.starts_with("data:"));

        Self {
            title: non_empty(raw.music_name),
            artists,
            album: non_empty(raw.album),
            format: non_empty(raw.format).map(|f| f.to_lowercase()),
            bitrate: raw.bitrate.as_ref().and_then(value_as_u64),
            duration_ms: raw.duration.as_ref().and_then(value_as_u64),
            album_pic_url,
            aliases,
            cover,
        }
    }
}

/// Parse the decrypted plaintext (`music:{...}` or `dj:{...}`)
pub fn parse_metadata_text(plain: &[u8]) -> Result<TrackMetadata> {
    if let Some(json) = plain.strip_prefix(MUSIC_PREFIX) {
        let raw: RawMusicInfo = serde_json::from_slice(json)
            .map_err(|e| ConvertError::MetadataParse(format!("invalid music JSON: {}", e)))?;
        Ok(raw.into())
    } else if let Some(json) = plain.strip_prefix(DJ_PREFIX) {
        let raw: RawDjInfo = serde_json::from_slice(json)
            .map_err(|e| ConvertError::MetadataParse(format!("invalid dj JSON: {}", e)))?;
        Ok(raw.main_music.into())
    } else {
        Err(ConvertError::MetadataParse(
            "decrypted metadata has an unknown prefix".to_string(),
        ))
    }
}

/// Decode an unmasked metadata block
///
/// An empty block is valid and yields empty metadata.
pub fn decode_metadata_block(block: &[u8]) -> Result<TrackMetadata> {
    if block.is_empty() {
        return Ok(TrackMetadata::default());
    }

    let encoded = block.strip_prefix(METADATA_TAG).ok_or_else(|| {
        ConvertError::MetadataParse("metadata block is missing its tag".to_string())
    })?;

    let ciphertext = STANDARD
        .decode(encoded)
        .map_err(|e| ConvertError::MetadataParse(format!("invalid base64: {}", e)))?;

    let plain = aes_ecb_decrypt(&ciphertext, &METADATA_KEY).ok_or_else(|| {
        ConvertError::MetadataParse("metadata does not decrypt with valid padding".to_string())
    })?;

    parse_metadata_text(&plain)
}
