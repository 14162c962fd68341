//! In-memory flash double used by tests. Not part of the public boot
//! surface for a real target; enforces the same write-once and
//! erase-granularity constraints as real NOR flash so `boot-core`'s
//! integration tests can exercise the swap and trailer logic without
//! real hardware.

use crate::{Error, Flash};

/// `SIZE` bytes of simulated flash, erasing to `0xFF`.
pub struct RamFlash<const SIZE: usize> {
    bytes: [u8; SIZE],
    sector_size: u32,
}

impl<const SIZE: usize> RamFlash<SIZE> {
    pub fn new(sector_size: u32) -> Self {
        RamFlash {
            bytes: [0xFF; SIZE],
            sector_size,
        }
    }

    /// Direct, unchecked read of the raw backing bytes -- used by tests
    /// to assert on flash state a public `Flash::read` would also expose,
    /// without going through address-bounds plumbing.
    pub fn raw(&self) -> &[u8] {
        &self.bytes
    }
}

impl<const SIZE: usize> Flash for RamFlash<SIZE> {
    fn sector_size(&self) -> u32 {
        self.sector_size
    }

    fn read(&mut self, addr: u32, buf: &mut [u8]) -> Result<(), Error> {
        let start = addr as usize;
        let end = start.checked_add(buf.len()).ok_or(Error::Io)?;
        if end > SIZE {
            return Err(Error::Io);
        }
        buf.copy_from_slice(&self.bytes[start..end]);
        Ok(())
    }

    fn erase(&mut self, addr: u32, len: u32) -> Result<(), Error> {
        if !self.is_sector_aligned(addr, len) {
            return Err(Error::Unaligned);
        }
        let start = addr as usize;
        let end = start.checked_add(len as usize).ok_or(Error::Io)?;
        if end > SIZE {
            return Err(Error::Io);
        }
        self.bytes[start..end].fill(0xFF);
        Ok(())
    }

    fn write(&mut self, addr: u32, buf: &[u8]) -> Result<(), Error> {
        let start = addr as usize;
        let end = start.checked_add(buf.len()).ok_or(Error::Io)?;
        if end > SIZE {
            return Err(Error::Io);
        }
        // Write-once rule: a write may only clear bits that are set, never
        // set a bit that erase didn't already leave at 1.
        for (existing, incoming) in self.bytes[start..end].iter().zip(buf.iter()) {
            if existing & incoming != *incoming {
                return Err(Error::NotErased);
            }
        }
        self.bytes[start..end].copy_from_slice(buf);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn erase_then_write_round_trips() {
        let mut f = RamFlash::<1024>::new(256);
        f.erase(0, 256).unwrap();
        f.write(0, &[1, 2, 3, 4]).unwrap();
        let mut out = [0u8; 4];
        f.read(0, &mut out).unwrap();
        assert_eq!(out, [1, 2, 3, 4]);
    }

    #[test]
    fn rejects_setting_a_cleared_bit() {
        let mut f = RamFlash::<1024>::new(256);
        f.erase(0, 256).unwrap();
        f.write(0, &[0x0F]).unwrap();
        // 0x0F -> 0xFF would require setting cleared bits back to 1.
        assert_eq!(f.write(0, &[0xFF]), Err(Error::NotErased));
    }

    #[test]
    fn rejects_unaligned_erase() {
        let mut f = RamFlash::<1024>::new(256);
        assert_eq!(f.erase(1, 256), Err(Error::Unaligned));
    }
}
