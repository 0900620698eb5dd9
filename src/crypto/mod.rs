//! Cipher primitives used by the container decoders
//!
//! Both the key block and the metadata block are AES-128-ECB with PKCS#7
//! padding; only the fixed key differs. The audio payload uses the
//! table-driven keystream in [`keystream`].

pub mod key;
pub mod keystream;

use aes::Aes128;
use cipher::block_padding::Pkcs7;
use cipher::{BlockDecryptMut, KeyInit};

pub const AES_BLOCK_SIZE: usize = 16;

/// AES-128-ECB decrypt and strip PKCS#7 padding
///
/// Returns `None` for partial blocks or invalid padding.
pub(crate) fn aes_ecb_decrypt(data: &[u8], key: &[u8; 16]) -> Option<Vec<u8>> {
    if data.is_empty() || data.len() % AES_BLOCK_SIZE != 0 {
        return None;
    }
    Aes128::new(key.into())
        .decrypt_padded_vec_mut::<Pkcs7>(data)
        .ok()
}

#[cfg(test)]
pub(crate) fn aes_ecb_encrypt(data: &[u8], key: &[u8; 16]) -> Vec<u8> {
    use cipher::BlockEncryptMut;

    Aes128::new(key.into()).encrypt_padded_vec_mut::<Pkcs7>(data)
}
