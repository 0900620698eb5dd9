use std::io::{Read, Seek, SeekFrom};

use super::{
    CRC_GAP, KEY_BLOCK_MASK, MAGIC, MAGIC_GAP, METADATA_BLOCK_MASK, NcmContainer, unmask,
};
use crate::error::{ConvertError, Result};

/// Reader that refuses to go past the known end of the source
struct BoundedReader<'a, R> {
    inner: &'a mut R,
    position: u64,
    len: u64,
}

impl<'a, R: Read + Seek> BoundedReader<'a, R> {
    fn remaining(&self) -> u64 {
        self.len.saturating_sub(self.position)
    }

    fn ensure(&self, needed: u64, what: &str) -> Result<()> {
        if needed > self.remaining() {
            return Err(ConvertError::Truncated(format!(
                "{} needs {} bytes at offset {} but only {} remain",
                what,
                needed,
                self.position,
                self.remaining()
            )));
        }
        Ok(())
    }

    fn read_bytes(&mut self, len: u64, what: &str) -> Result<Vec<u8>> {
        self.ensure(len, what)?;
        let mut buf = vec![0u8; len as usize];
        self.inner.read_exact(&mut buf)?;
        self.position += len;
        Ok(buf)
    }

    fn read_u32(&mut self, what: &str) -> Result<u32> {
        let bytes = self.read_bytes(4, what)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn skip(&mut self, len: u64, what: &str) -> Result<()> {
        self.ensure(len, what)?;
        self.inner.seek(SeekFrom::Current(len as i64))?;
        self.position += len;
        Ok(())
    }
}

/// Parse the container header and locate the payload
///
/// The reader is left positioned at the start of the payload.
pub fn read_container<R: Read + Seek>(reader: &mut R) -> Result<NcmContainer> {
    let len = reader.seek(SeekFrom::End(0))?;
    reader.seek(SeekFrom::Start(0))?;

    if len < MAGIC.len() as u64 {
        return Err(ConvertError::Format(format!(
            "file is only {} bytes, too small for the header",
            len
        )));
    }

    let mut bounded = BoundedReader {
        inner: reader,
        position: 0,
        len,
    };

    let magic = bounded.read_bytes(MAGIC.len() as u64, "magic")?;
    if magic.as_slice() != MAGIC {
        return Err(ConvertError::Format(format!(
            "unexpected magic bytes {:02x?}",
            magic
        )));
    }
    bounded.skip(MAGIC_GAP, "header gap")?;

    let key_len = bounded.read_u32("key block length")?;
    let mut key_block = bounded.read_bytes(key_len as u64, "key block")?;
    unmask(&mut key_block, KEY_BLOCK_MASK);

    let metadata_len = bounded.read_u32("metadata block length")?;
    let mut metadata_block = bounded.read_bytes(metadata_len as u64, "metadata block")?;
    unmask(&mut metadata_block, METADATA_BLOCK_MASK);

    let crc32 = bounded.read_u32("crc32")?;
    bounded.skip(CRC_GAP, "cover gap")?;

    let frame_len = bounded.read_u32("cover frame length")?;
    let image_len = bounded.read_u32("cover image length")?;
    if image_len > frame_len {
        return Err(ConvertError::Format(format!(
            "cover image ({} bytes) is larger than its frame ({} bytes)",
            image_len, frame_len
        )));
    }
    let cover_image = if image_len > 0 {
        Some(bounded.read_bytes(image_len as u64, "cover image")?)
    } else {
        None
    };
    bounded.skip((frame_len - image_len) as u64, "cover frame padding")?;

    let container = NcmContainer {
        key_block,
        metadata_block,
        crc32,
        cover_image,
        payload_offset: bounded.position,
        payload_len: bounded.remaining(),
    };

    log::debug!(
        "Parsed container: key {} bytes, metadata {} bytes, cover {} bytes, payload {} bytes at offset {}",
        container.key_block.len(),
        container.metadata_block.len(),
        image_len,
        container.payload_len,
        container.payload_offset
    );

    Ok(container)
}
