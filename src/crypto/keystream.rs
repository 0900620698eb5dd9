//! Payload keystream
//!
//! The content key is expanded into a 256 entry permutation with the usual
//! swap-based key schedule. Each payload byte is then XORed with a keystream
//! byte chosen by two indices into that table. The table is never mutated after
//! the schedule, so the keystream depends only on the byte position, but the
//! indices still have to advance in order.

use std::io::{self, Read};

use super::key::ContentKey;

/// Explicit keystream state: the permutation table plus both running indices
///
/// Cloning a state forks the keystream at the current position, which is how
/// callers resume decoding across chunk boundaries.
#[derive(Clone)]
pub struct KeystreamState {
    table: [u8; 256],
    index1: u8,
    index2: u8,
}

impl KeystreamState {
    /// Run the key schedule. Consumes the key so it cannot outlive the table.
    pub fn new(key: ContentKey) -> Self {
        let key = key.as_bytes();
        let mut table = [0u8; 256];
        for (i, slot) in table.iter_mut().enumerate() {
            *slot = i as u8;
        }

        let mut j: u8 = 0;
        for i in 0..256 {
            j = j
                .wrapping_add(table[i])
                .wrapping_add(key[i % key.len()]);
            table.swap(i, j as usize);
        }

        Self {
            table,
            index1: 0,
            index2: 0,
        }
    }

    /// Next keystream byte
    pub fn next_byte(&mut self) -> u8 {
        self.index1 = self.index1.wrapping_add(1);
        let i = self.index1 as usize;
        self.index2 = self.table[i].wrapping_add(self.index1);
        let j = self.index2 as usize;
        let k = self.table[i].wrapping_add(self.table[j]);
        self.table[k as usize]
    }

    /// XOR the keystream over `buf` in place, advancing the state
    pub fn apply(&mut self, buf: &mut [u8]) {
        for byte in buf.iter_mut() {
            *byte ^= self.next_byte();
        }
    }

    pub fn indices(&self) -> (u8, u8) {
        (self.index1, self.index2)
    }
}

/// Lazily decrypts a payload stream
///
/// Wrap a reader already limited to the payload (e.g. with [`Read::take`]);
/// every `read` decrypts exactly the bytes it returns, so the output length
/// always equals the input length.
pub struct StreamDecryptor<R> {
    inner: R,
    state: KeystreamState,
}

impl<R: Read> StreamDecryptor<R> {
    pub fn new(inner: R, state: KeystreamState) -> Self {
        Self { inner, state }
    }

    /// Hand back the keystream state to continue on another reader
    pub fn into_state(self) -> KeystreamState {
        self.state
    }
}

impl<R: Read> Read for StreamDecryptor<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.state.apply(&mut buf[..n]);
        Ok(n)
    }
}
