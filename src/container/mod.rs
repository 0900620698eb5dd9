//! Container parsing for `.ncm` files
//!
//! On-disk layout, all integers little-endian u32:
//! - magic `CTENFDAM` followed by a 2 byte gap
//! - key block length + key block (masked with `0x64`)
//! - metadata block length + metadata block (masked with `0x63`)
//! - CRC32 followed by a 5 byte gap
//! - cover frame length, cover image length, cover image, frame padding
//! - encrypted audio payload until end of file
//!
//! The payload is never loaded here; only its offset and length are recorded.

mod reader;

pub use reader::read_container;

use std::io::{self, Seek, SeekFrom};

pub const MAGIC: &[u8; 8] = b"CTENFDAM";
pub const MAGIC_GAP: u64 = 2;
pub const KEY_BLOCK_MASK: u8 = 0x64;
pub const METADATA_BLOCK_MASK: u8 = 0x63;
pub const CRC_GAP: u64 = 5;

/// A parsed container with its blocks unmasked but still encrypted
#[derive(Debug, Clone)]
pub struct NcmContainer {
    /// AES-encrypted content key
    pub key_block: Vec<u8>,
    /// Tagged, base64-wrapped, AES-encrypted metadata (may be empty)
    pub metadata_block: Vec<u8>,
    pub crc32: u32,
    /// Cover art stored in the container itself
    pub cover_image: Option<Vec<u8>>,
    pub payload_offset: u64,
    pub payload_len: u64,
}

impl NcmContainer {
    /// Position `reader` at the first payload byte
    pub fn seek_payload<S: Seek>(&self, reader: &mut S) -> io::Result<()> {
        reader.seek(SeekFrom::Start(self.payload_offset))?;
        Ok(())
    }
}

/// XOR every byte of a block with the fixed mask
pub(crate) fn unmask(block: &mut [u8], mask: u8) {
    for byte in block.iter_mut() {
        *byte ^= mask;
    }
}
