//! Transparent stream-cipher shim for external flash.
//!
//! Spec 4.A / 9: external-flash reads and writes pass through an XOR
//! keystream keyed by a 32-byte secret, offset-keyed so ciphertext at a
//! given address is stable across calls; nothing above this layer
//! observes ciphertext.

use crate::{Error, Flash};
use chacha20::cipher::{KeyIvInit, StreamCipher, StreamCipherSeek};
use chacha20::{ChaCha20, Key, Nonce};

/// Chunk size used to XOR write data in place without an allocator.
const CHUNK: usize = 64;

pub struct EncryptedFlash<F> {
    inner: F,
    key: [u8; 32],
}

impl<F: Flash> EncryptedFlash<F> {
    pub fn new(inner: F, key: [u8; 32]) -> Self {
        EncryptedFlash { inner, key }
    }

    pub fn into_inner(self) -> F {
        self.inner
    }

    fn cipher_at(&self, addr: u32) -> ChaCha20 {
        let nonce = Nonce::default();
        let mut cipher = ChaCha20::new(Key::from_slice(&self.key), &nonce);
        cipher.seek(u64::from(addr));
        cipher
    }
}

impl<F: Flash> Flash for EncryptedFlash<F> {
    fn sector_size(&self) -> u32 {
        self.inner.sector_size()
    }

    fn read(&mut self, addr: u32, buf: &mut [u8]) -> Result<(), Error> {
        self.inner.read(addr, buf)?;
        self.cipher_at(addr).apply_keystream(buf);
        Ok(())
    }

    fn erase(&mut self, addr: u32, len: u32) -> Result<(), Error> {
        self.inner.erase(addr, len)
    }

    fn write(&mut self, addr: u32, buf: &[u8]) -> Result<(), Error> {
        let mut scratch = [0u8; CHUNK];
        let mut offset = 0usize;
        while offset < buf.len() {
            let n = core::cmp::min(CHUNK, buf.len() - offset);
            scratch[..n].copy_from_slice(&buf[offset..offset + n]);
            self.cipher_at(addr + offset as u32).apply_keystream(&mut scratch[..n]);
            self.inner.write(addr + offset as u32, &scratch[..n])?;
            offset += n;
        }
        Ok(())
    }
}
