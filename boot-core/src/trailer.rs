//! Partition trailer: the magic, per-sector flag vector, overall state
//! byte, and fallback-pending byte stored at the tail of every
//! BOOT/UPDATE partition.
//!
//! Layout, lowest to highest address within the reserved trailer region:
//! `[magic: 4][flag[0], flag[1], ..., flag[n-1]][state: 1][fallback: 1]`.
//! The fallback byte sits at the very last address of the partition so a
//! target that only guarantees the last written sector survives a
//! brownout (as wolfBoot's own `PART_BOOT_ENDFLAGS` placement assumes)
//! still reads a trustworthy overall state. All three fields use
//! [`crate::polarity`]'s bit-clearing encoding, so a single in-place byte
//! stands in for a write-once circular buffer (see `DESIGN.md` for the
//! tradeoff).

use crate::polarity::{self, Polarity, SectorFlag, State};
use boot_flash::{Error as FlashError, Flash};

/// Trailer magic, distinct from the manifest magic so a corrupted
/// manifest cannot be mistaken for a valid trailer.
pub const MAGIC: [u8; 4] = *b"BTRL";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    Flash(FlashError),
    /// The trailer region's magic did not match; treated the same as
    /// `State::New` by callers.
    BadMagic,
    SectorOutOfRange,
    /// The requested state or sector-flag transition is not one of
    /// `polarity::state_transition_legal`/`flag_transition_legal`'s legal
    /// edges (and is not a same-state idempotent rewrite).
    IllegalTransition,
}

impl From<FlashError> for Error {
    fn from(e: FlashError) -> Self {
        Error::Flash(e)
    }
}

/// View over one partition's trailer region.
pub struct Trailer<'f, F> {
    flash: &'f mut F,
    /// Address of the trailer region's first byte (the magic).
    base: u32,
    sector_count: u32,
    polarity: Polarity,
}

impl<'f, F: Flash> Trailer<'f, F> {
    /// `base` is the trailer region's start address; the state byte
    /// lives at `base + 4 + sector_count`.
    pub fn new(flash: &'f mut F, base: u32, sector_count: u32) -> Self {
        Trailer {
            flash,
            base,
            sector_count,
            polarity: polarity::ACTIVE,
        }
    }

    fn flags_base(&self) -> u32 {
        self.base + 4
    }

    fn state_addr(&self) -> u32 {
        self.base + 4 + self.sector_count
    }

    /// Address of the fallback-pending byte, immediately after the state
    /// byte. Set when the Boot Selector observes BOOT still `TESTING`
    /// across a reset, so that if the candidate is still unconfirmed on
    /// a *later* reset the anti-rollback check may be bypassed to swap
    /// back to the prior image.
    fn fallback_addr(&self) -> u32 {
        self.state_addr() + 1
    }

    fn magic_ok(&mut self) -> Result<bool, Error> {
        let mut buf = [0u8; 4];
        self.flash.read(self.base, &mut buf)?;
        Ok(buf == MAGIC)
    }

    /// Returns `State::New` (a blank/erased trailer, or one whose magic
    /// does not match) if the region has never been written.
    pub fn get_state(&mut self) -> Result<State, Error> {
        if !self.magic_ok()? {
            return Ok(State::New);
        }
        let mut byte = [0u8; 1];
        self.flash.read(self.state_addr(), &mut byte)?;
        Ok(self.polarity.decode_state(byte[0]).unwrap_or(State::New))
    }

    /// Writes the trailer magic (if not already present) and advances
    /// the state byte. Rejects any transition that is not one of
    /// `polarity::state_transition_legal`'s legal edges, except a
    /// same-state rewrite (idempotent, since a caller recovering from a
    /// half-written trailer may need to rewrite the same state more than
    /// once).
    pub fn set_state(&mut self, state: State) -> Result<(), Error> {
        let current = self.get_state()?;
        if current != state && !polarity::state_transition_legal(current, state) {
            return Err(Error::IllegalTransition);
        }
        if !self.magic_ok()? {
            self.flash.write(self.base, &MAGIC)?;
        }
        let byte = [self.polarity.state_byte(state)];
        self.flash.write(self.state_addr(), &byte)?;
        Ok(())
    }

    /// True once `set_fallback_pending` has been called and the trailer
    /// has not been erased since. A blank/unwritten trailer is never
    /// pending.
    pub fn fallback_pending(&mut self) -> Result<bool, Error> {
        if !self.magic_ok()? {
            return Ok(false);
        }
        let mut byte = [0u8; 1];
        self.flash.read(self.fallback_addr(), &mut byte)?;
        Ok(byte[0] != self.polarity.state_byte(State::New))
    }

    /// Marks the trailer as having a fallback in progress. One-way until
    /// the next `erase_trailer_region`, matching every other field here.
    pub fn set_fallback_pending(&mut self) -> Result<(), Error> {
        if !self.magic_ok()? {
            self.flash.write(self.base, &MAGIC)?;
        }
        let byte = [self.polarity.state_byte(State::Success)];
        self.flash.write(self.fallback_addr(), &byte)?;
        Ok(())
    }

    pub fn get_sector_flag(&mut self, sector: u32) -> Result<SectorFlag, Error> {
        if sector >= self.sector_count {
            return Err(Error::SectorOutOfRange);
        }
        if !self.magic_ok()? {
            return Ok(SectorFlag::New);
        }
        let mut byte = [0u8; 1];
        self.flash.read(self.flags_base() + sector, &mut byte)?;
        Ok(self.polarity.decode_flag(byte[0]).unwrap_or(SectorFlag::New))
    }

    /// Rejects any transition that is not one of
    /// `polarity::flag_transition_legal`'s legal edges, except a
    /// same-flag rewrite (idempotent, for the same half-written-trailer
    /// recovery reason `set_state` allows it).
    pub fn set_sector_flag(&mut self, sector: u32, flag: SectorFlag) -> Result<(), Error> {
        if sector >= self.sector_count {
            return Err(Error::SectorOutOfRange);
        }
        let current = self.get_sector_flag(sector)?;
        if current != flag && !polarity::flag_transition_legal(current, flag) {
            return Err(Error::IllegalTransition);
        }
        if !self.magic_ok()? {
            self.flash.write(self.base, &MAGIC)?;
        }
        let byte = [self.polarity.flag_byte(flag)];
        self.flash.write(self.flags_base() + sector, &byte)?;
        Ok(())
    }

    /// Erases the whole trailer region (and whatever sector(s) it
    /// shares an erase unit with), returning the partition to `New`.
    /// Used when starting a fresh update cycle: `UPDATING -> NEW` is
    /// only reachable by erase.
    pub fn erase_trailer_region(&mut self, sector_size: u32) -> Result<(), Error> {
        let aligned_base = self.base - (self.base % sector_size);
        let span = self.fallback_addr() + 1 - aligned_base;
        let aligned_len = span + (sector_size - span % sector_size) % sector_size;
        self.flash.erase(aligned_base, aligned_len)?;
        Ok(())
    }
}
