//! Update Engine: the fail-safe per-sector swap and the RAM-load
//! strategy, selected by the `swap` / `ram-load` Cargo features the same
//! way `boot-signed-fw` / `boot-unsigned-fw` select code paths in
//! `jump_app.rs`.
//!
//! The swap loop is grounded directly on
//! `original_source/src/update_flash_hwswap.c`'s `wolfBoot_start`: walk
//! sectors high-to-low, and for each one apply whichever of the three
//! steps (`NEW -> SWAPPING -> BACKUP -> UPDATED`) the persisted flag says
//! is still outstanding, so a reset at any point resumes exactly where it
//! left off rather than restarting the whole partition.
//!
//! The partition's trailer itself lives in the highest sector of each
//! partition and is never treated as swappable data; the loop only
//! walks `0..sector_count - 1`.

use boot_flash::Flash;

use crate::config::BoardConfig;
use crate::error::BootError;
use crate::polarity::{SectorFlag, State};
use crate::trailer::Trailer;

/// Bytes moved per read/write call during a sector copy. Kept small so
/// no crate in the workspace needs an allocator.
const CHUNK: u32 = 128;

pub struct UpdateEngine<'f, F> {
    flash: &'f mut F,
    cfg: BoardConfig,
}

impl<'f, F: Flash> UpdateEngine<'f, F> {
    pub fn new(flash: &'f mut F, cfg: BoardConfig) -> Self {
        UpdateEngine { flash, cfg }
    }

    /// Reborrows the underlying flash. Used by the Boot Selector to read
    /// a trailer without going through an `UpdateEngine` method when it
    /// only needs the raw state, not a swap/confirm operation.
    pub(crate) fn flash_mut(&mut self) -> &mut F {
        self.flash
    }

    /// Exposes the BOOT partition's trailer directly, for callers (the
    /// Boot Selector, test scenarios, `fwtool`) that need to read or
    /// force a state transition without driving a whole update.
    pub fn boot_trailer(&mut self) -> Trailer<'_, F> {
        let base = self.cfg.boot.end() - self.cfg.trailer_len();
        Trailer::new(self.flash, base, self.cfg.sector_count() - 1)
    }

    pub fn update_trailer(&mut self) -> Trailer<'_, F> {
        let base = self.cfg.update.end() - self.cfg.trailer_len();
        Trailer::new(self.flash, base, self.cfg.sector_count() - 1)
    }

    /// Exposes the key vault's own trailer, tracking which of its two
    /// slots (manufacturing-time keys, or a staged rotation) is active.
    pub fn key_vault_trailer(&mut self) -> Trailer<'_, F> {
        let base = self.cfg.key_vault.end() - self.cfg.key_vault_trailer_len();
        Trailer::new(self.flash, base, crate::config::KEY_VAULT_SECTORS - 1)
    }

    /// `0` (manufacturing-time keys) unless a key update has completed
    /// and been confirmed, in which case `1` (the staged replacement).
    pub fn key_vault_active_sector(&mut self) -> Result<u32, BootError> {
        Ok(match self.key_vault_trailer().get_state()? {
            State::Success => 1,
            _ => 0,
        })
    }

    /// Applies a `KEY_UPDATE` image's payload: copies it into the key
    /// vault's slot 1 and drives the key-vault trailer straight through
    /// `NEW -> UPDATING -> TESTING -> SUCCESS` in one call. There is no
    /// running application to separately confirm a key rotation the way
    /// `confirm_update` confirms a firmware swap, so the rotation is
    /// self-confirming. Only one rotation is supported before the vault
    /// must be erased; a second call is rejected rather than silently
    /// overwriting an already-rotated slot.
    #[cfg(feature = "swap")]
    pub fn apply_key_update(&mut self, new_keystore_data: &[u8]) -> Result<(), BootError> {
        if self.key_vault_active_sector()? == 1 {
            return Err(BootError::KeyVaultAlreadyRotated);
        }
        if new_keystore_data.len() as u32 > self.cfg.sector_size {
            return Err(BootError::KeyVaultPayloadTooLarge);
        }
        if self.key_vault_trailer().get_state()? == State::New {
            self.key_vault_trailer().set_state(State::Updating)?;
        }
        let dest = self.cfg.key_vault.base + self.cfg.sector_size;
        self.flash.erase(dest, self.cfg.sector_size)?;
        let mut offset = 0u32;
        while (offset as usize) < new_keystore_data.len() {
            let n = core::cmp::min(CHUNK, new_keystore_data.len() as u32 - offset);
            self.flash.write(dest + offset, &new_keystore_data[offset as usize..(offset + n) as usize])?;
            offset += n;
        }
        self.key_vault_trailer().set_state(State::Testing)?;
        self.key_vault_trailer().set_state(State::Success)?;
        Ok(())
    }

    /// Marks the UPDATE partition as holding a candidate ready to be
    /// applied on the next boot.
    pub fn update_trigger(&mut self) -> Result<(), BootError> {
        self.update_trailer().set_state(State::Updating)?;
        Ok(())
    }

    /// Called by the running application once it trusts itself: advances
    /// the BOOT partition to `SUCCESS` so the Boot Selector stops
    /// treating it as an unconfirmed test boot.
    pub fn confirm_update(&mut self) -> Result<(), BootError> {
        self.boot_trailer().set_state(State::Success)?;
        Ok(())
    }

    /// Reads a candidate's declared version twice and only trusts it if
    /// both reads agree, guarding against a single glitched read
    /// flipping a rollback check.
    pub fn read_version_redundant(&mut self, partition_base: u32, version_field_offset: u32) -> Result<u32, BootError> {
        let mut a = [0u8; 4];
        let mut b = [0u8; 4];
        self.flash.read(partition_base + version_field_offset, &mut a)?;
        self.flash.read(partition_base + version_field_offset, &mut b)?;
        if a != b {
            return Err(BootError::VersionRollback);
        }
        Ok(u32::from_le_bytes(a))
    }

    /// Rejects a candidate whose version is not strictly greater than
    /// the currently installed one.
    pub fn check_not_a_downgrade(&self, current: u32, candidate: u32) -> Result<(), BootError> {
        if candidate <= current {
            return Err(BootError::VersionRollback);
        }
        Ok(())
    }

    fn copy_sector(&mut self, src: u32, dst: u32) -> Result<(), BootError> {
        self.flash.erase(dst, self.cfg.sector_size)?;
        let mut buf = [0u8; CHUNK as usize];
        let mut offset = 0u32;
        while offset < self.cfg.sector_size {
            let n = core::cmp::min(CHUNK, self.cfg.sector_size - offset);
            self.flash.read(src + offset, &mut buf[..n as usize])?;
            self.flash.write(dst + offset, &buf[..n as usize])?;
            offset += n;
        }
        Ok(())
    }

    /// Runs (or resumes) the fail-safe swap: BOOT and UPDATE trade
    /// places one sector at a time through the single-sector SWAP
    /// scratch area, persisting a flag after each of the three
    /// sub-steps so an interruption at any point is resumable.
    #[cfg(feature = "swap")]
    pub fn swap(&mut self) -> Result<(), BootError> {
        let swappable_sectors = self.cfg.sector_count() - 1;
        for i in (0..swappable_sectors).rev() {
            let boot_addr = self.cfg.boot.base + i * self.cfg.sector_size;
            let update_addr = self.cfg.update.base + i * self.cfg.sector_size;
            let swap_addr = self.cfg.swap.base;

            let mut flag = self.update_trailer().get_sector_flag(i)?;

            if flag == SectorFlag::New {
                self.copy_sector(boot_addr, swap_addr)?;
                self.update_trailer().set_sector_flag(i, SectorFlag::Swapping)?;
                flag = SectorFlag::Swapping;
            }
            if flag == SectorFlag::Swapping {
                self.copy_sector(update_addr, boot_addr)?;
                self.update_trailer().set_sector_flag(i, SectorFlag::Backup)?;
                flag = SectorFlag::Backup;
            }
            if flag == SectorFlag::Backup {
                self.copy_sector(swap_addr, update_addr)?;
                self.update_trailer().set_sector_flag(i, SectorFlag::Updated)?;
            }
        }
        self.boot_trailer().set_state(State::Testing)?;
        Ok(())
    }

    /// True once every swappable sector has reached `UPDATED`, i.e. the
    /// swap begun by `swap()` is complete and resuming it would be a
    /// no-op.
    #[cfg(feature = "swap")]
    pub fn swap_complete(&mut self) -> Result<bool, BootError> {
        let swappable_sectors = self.cfg.sector_count() - 1;
        for i in 0..swappable_sectors {
            if self.update_trailer().get_sector_flag(i)? != SectorFlag::Updated {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Loads the UPDATE partition's image directly into a RAM buffer for
    /// execution in place, without touching flash. The caller supplies
    /// `dest`; on any flash error the caller is expected to fall back to
    /// booting BOOT unchanged.
    #[cfg(feature = "ram-load")]
    pub fn ram_load(&mut self, dest: &mut [u8]) -> Result<(), BootError> {
        self.flash.read(self.cfg.update.base, dest)?;
        Ok(())
    }
}
