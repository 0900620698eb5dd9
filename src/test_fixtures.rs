//! Test fixtures for container decoding tests
//!
//! Builds synthetic containers encrypted with the same fixed keys the decoder
//! uses, so tests never need real `.ncm` files.

#![cfg(test)]

use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::audio::metadata::{METADATA_KEY, METADATA_TAG, MUSIC_PREFIX};
use crate::container::{CRC_GAP, KEY_BLOCK_MASK, MAGIC, MAGIC_GAP, METADATA_BLOCK_MASK, unmask};
use crate::crypto::aes_ecb_encrypt;
use crate::crypto::key::{CORE_KEY, ContentKey, KEY_PREFIX};
use crate::crypto::keystream::KeystreamState;

/// Content key shaped like the ones real containers carry
pub const TEST_CONTENT_KEY: &[u8] =
    b"123456789012345E7fT49x7dof9OKCgg9cdvhEuezy3iZCL1nFvBFd1T4uSktAJKmwZXsijPbijliionVUXXg9plTbXEclAE9Lb";

/// Encrypt a metadata plaintext into an unmasked metadata block
pub fn encrypt_metadata(prefix: &[u8], json: &str) -> Vec<u8> {
    let mut plain = prefix.to_vec();
    plain.extend_from_slice(json.as_bytes());
    let encrypted = aes_ecb_encrypt(&plain, &METADATA_KEY);

    let mut block = METADATA_TAG.to_vec();
    block.extend_from_slice(STANDARD.encode(encrypted).as_bytes());
    block
}

/// Encrypt a content key into an unmasked key block
pub fn encrypt_key(prefix: &[u8], key: &[u8]) -> Vec<u8> {
    let mut plain = prefix.to_vec();
    plain.extend_from_slice(key);
    aes_ecb_encrypt(&plain, &CORE_KEY)
}

pub fn sample_music_json() -> String {
    r#"{"musicId":12345,"musicName":"Test Song","artist":[["Artist A",1],["Artist B","2"]],"albumId":9,"album":"Test Album","albumPicDocId":"1","albumPic":"https://example.com/cover.jpg","bitrate":999000,"mp3DocId":"x","duration":215000,"mvId":0,"alias":[],"transNames":[],"format":"flac"}"#
        .to_string()
}

enum MetadataSource {
    Empty,
    Json(String),
    Raw(Vec<u8>),
}

/// Assembles a container byte by byte
pub struct ContainerBuilder {
    content_key: Vec<u8>,
    key_block: Option<Vec<u8>>,
    metadata: MetadataSource,
    cover: Option<Vec<u8>>,
    cover_padding: u32,
    payload: Vec<u8>,
}

impl ContainerBuilder {
    /// `payload` is the plaintext audio; it is encrypted on build
    pub fn new(payload: Vec<u8>) -> Self {
        Self {
            content_key: TEST_CONTENT_KEY.to_vec(),
            key_block: None,
            metadata: MetadataSource::Empty,
            cover: None,
            cover_padding: 0,
            payload,
        }
    }

    pub fn with_music_json(mut self, json: &str) -> Self {
        self.metadata = MetadataSource::Json(json.to_string());
        self
    }

    /// Unmasked metadata bytes used verbatim
    pub fn with_raw_metadata(mut self, block: Vec<u8>) -> Self {
        self.metadata = MetadataSource::Raw(block);
        self
    }

    /// Key block that decrypts cleanly but lacks the expected prefix
    pub fn with_corrupt_key_block(mut self) -> Self {
        self.key_block = Some(encrypt_key(b"notthecloudprefix", &self.content_key));
        self
    }

    pub fn with_cover(mut self, cover: Vec<u8>) -> Self {
        self.cover = Some(cover);
        self
    }

    pub fn with_cover_padding(mut self, padding: u32) -> Self {
        self.cover_padding = padding;
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(MAGIC);
        out.extend(std::iter::repeat_n(0u8, MAGIC_GAP as usize));

        let mut key_block = self
            .key_block
            .clone()
            .unwrap_or_else(|| encrypt_key(KEY_PREFIX, &self.content_key));
        unmask(&mut key_block, KEY_BLOCK_MASK);
        out.extend_from_slice(&(key_block.len() as u32).to_le_bytes());
        out.extend_from_slice(&key_block);

        let mut metadata_block = match &self.metadata {
            MetadataSource::Empty => Vec::new(),
            MetadataSource::Json(json) => encrypt_metadata(MUSIC_PREFIX, json),
            MetadataSource::Raw(raw) => raw.clone(),
        };
        unmask(&mut metadata_block, METADATA_BLOCK_MASK);
        out.extend_from_slice(&(metadata_block.len() as u32).to_le_bytes());
        out.extend_from_slice(&metadata_block);

        out.extend_from_slice(&0xDEADBEEFu32.to_le_bytes());
        out.extend(std::iter::repeat_n(0u8, CRC_GAP as usize));

        let cover = self.cover.clone().unwrap_or_default();
        let frame_len = cover.len() as u32 + self.cover_padding;
        out.extend_from_slice(&frame_len.to_le_bytes());
        out.extend_from_slice(&(cover.len() as u32).to_le_bytes());
        out.extend_from_slice(&cover);
        out.extend(std::iter::repeat_n(0u8, self.cover_padding as usize));

        let mut payload = self.payload.clone();
        let key = ContentKey::new(self.content_key.clone()).expect("test key is not empty");
        KeystreamState::new(key).apply(&mut payload);
        out.extend_from_slice(&payload);

        out
    }
}

/// Build and write a container into `dir`
pub fn write_container(dir: &Path, name: &str, builder: &ContainerBuilder) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, builder.build()).expect("Failed to write test container");
    path
}

/// Length of the trailing PADDING block in [`flac_payload`]
pub const FLAC_PADDING_LEN: usize = 32;

/// STREAMINFO block body: 44.1 kHz stereo, 16 bits per sample, 0 samples
fn streaminfo_body() -> Vec<u8> {
    let mut body = Vec::with_capacity(34);
    body.extend_from_slice(&4096u16.to_be_bytes());
    body.extend_from_slice(&4096u16.to_be_bytes());
    body.extend_from_slice(&[0, 0, 0]);
    body.extend_from_slice(&[0, 0, 0]);
    let packed: u64 = (44_100u64 << 44) | (1u64 << 41) | (15u64 << 36);
    body.extend_from_slice(&packed.to_be_bytes());
    body.extend_from_slice(&[0u8; 16]);
    body
}

/// Minimal FLAC stream laid out like an encoder writes it: STREAMINFO, a
/// final PADDING block, then filler standing in for frames
pub fn flac_payload() -> Vec<u8> {
    let mut out = b"fLaC".to_vec();
    // type 0 (STREAMINFO), length 34
    out.extend_from_slice(&[0x00, 0x00, 0x00, 0x22]);
    out.extend_from_slice(&streaminfo_body());
    // last-metadata-block flag, type 1 (PADDING)
    out.push(0x81);
    out.extend_from_slice(&(FLAC_PADDING_LEN as u32).to_be_bytes()[1..]);
    out.extend(std::iter::repeat_n(0u8, FLAC_PADDING_LEN));
    out.extend(std::iter::repeat_n(0u8, 64));
    out
}

/// FLAC whose only metadata block is STREAMINFO, flagged as the last one
pub fn flac_streaminfo_only() -> Vec<u8> {
    let mut out = b"fLaC".to_vec();
    out.extend_from_slice(&[0x80, 0x00, 0x00, 0x22]);
    out.extend_from_slice(&streaminfo_body());
    out.extend(std::iter::repeat_n(0u8, 64));
    out
}

/// A 1x1 transparent PNG
pub fn png_cover() -> Vec<u8> {
    vec![
        0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
        0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F,
        0x15, 0xC4, 0x89, 0x00, 0x00, 0x00, 0x0A, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00,
        0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49,
        0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
    ]
}

/// Bytes that start with an MPEG frame sync, followed by a pattern
pub fn mp3_payload(len: usize) -> Vec<u8> {
    let mut out: Vec<u8> = (0..len).map(|i| (i * 7 % 253) as u8).collect();
    if len >= 2 {
        out[0] = 0xFF;
        out[1] = 0xFB;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_builder_output_parses() {
        let bytes = ContainerBuilder::new(mp3_payload(10))
            .with_music_json(&sample_music_json())
            .build();
        let container = crate::container::read_container(&mut Cursor::new(bytes)).unwrap();
        assert_eq!(container.payload_len, 10);
    }

    #[test]
    fn test_flac_payload_layout() {
        let flac = flac_payload();
        assert!(flac.starts_with(b"fLaC"));
        // STREAMINFO is not the last block; PADDING is
        assert_eq!(flac[4] & 0x80, 0);
        assert_eq!(flac[4 + 4 + 34], 0x81);
        assert_eq!(flac.len(), 4 + 4 + 34 + 4 + FLAC_PADDING_LEN + 64);
        assert_eq!(flac_streaminfo_only()[4], 0x80);
        assert!(png_cover().starts_with(b"\x89PNG"));
    }
}
