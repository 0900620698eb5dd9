//! Content key unwrapping
//!
//! The key block decrypts to `neteasecloudmusic` followed by the content key.
//! The prefix doubles as an integrity check: if it is missing the file is
//! corrupt or not an ncm container.

use std::fmt;

use super::aes_ecb_decrypt;
use crate::error::{ConvertError, Result};

/// Fixed AES-128 key protecting the key block
pub const CORE_KEY: [u8; 16] = *b"hzHRAmso5kInbaxW";

/// Plaintext prefix every valid key block starts with
pub const KEY_PREFIX: &[u8] = b"neteasecloudmusic";

/// The per-file key that seeds the payload keystream
///
/// Never cloned or persisted; it is consumed when the keystream table is built.
pub struct ContentKey(Vec<u8>);

impl ContentKey {
    pub fn new(bytes: Vec<u8>) -> Result<Self> {
        if bytes.is_empty() {
            return Err(ConvertError::KeyDerivation(
                "content key is empty".to_string(),
            ));
        }
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentKey({} bytes)", self.0.len())
    }
}

/// Decrypt an unmasked key block into the content key
pub fn unwrap_content_key(key_block: &[u8]) -> Result<ContentKey> {
    if key_block.is_empty() {
        return Err(ConvertError::KeyDerivation("key block is empty".to_string()));
    }

    let decrypted = aes_ecb_decrypt(key_block, &CORE_KEY).ok_or_else(|| {
        ConvertError::KeyDerivation(format!(
            "key block of {} bytes does not decrypt with valid padding",
            key_block.len()
        ))
    })?;

    let key = decrypted.strip_prefix(KEY_PREFIX).ok_or_else(|| {
        ConvertError::KeyDerivation("decrypted key block is missing its prefix".to_string())
    })?;

    log::debug!("Unwrapped content key ({} bytes)", key.len());
    ContentKey::new(key.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::aes_ecb_encrypt;

    fn wrap(plain: &[u8]) -> Vec<u8> {
        aes_ecb_encrypt(plain, &CORE_KEY)
    }

    #[test]
    fn test_unwrap_valid_key() {
        let mut plain = KEY_PREFIX.to_vec();
        plain.extend_from_slice(b"123456E7fT49x7dof9OKCgg9cdvhEuezy3iZCL1nFvBFd1T4uSktAJKmwZXsijPbijliionVUXXg9plTbXEclAE9Lb");
        let key = unwrap_content_key(&wrap(&plain)).unwrap();
        assert_eq!(key.as_bytes(), &plain[KEY_PREFIX.len()..]);
    }

    #[test]
    fn test_unwrap_rejects_missing_prefix() {
        let result = unwrap_content_key(&wrap(b"somethingelse_entirely"));
        assert!(matches!(result, Err(ConvertError::KeyDerivation(_))));
    }

    #[test]
    fn test_unwrap_rejects_prefix_only() {
        let result = unwrap_content_key(&wrap(KEY_PREFIX));
        assert!(matches!(result, Err(ConvertError::KeyDerivation(_))));
    }

    #[test]
    fn test_unwrap_rejects_garbage() {
        let result = unwrap_content_key(&[0x42; 31]);
        assert!(matches!(result, Err(ConvertError::KeyDerivation(_))));

        let result = unwrap_content_key(&[]);
        assert!(matches!(result, Err(ConvertError::KeyDerivation(_))));
    }

    #[test]
    fn test_content_key_debug_hides_bytes() {
        let key = ContentKey::new(b"secret".to_vec()).unwrap();
        assert_eq!(format!("{:?}", key), "ContentKey(6 bytes)");
    }
}
