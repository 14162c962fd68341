//! Per-target partition geometry.
//!
//! Grounded on `bootloader/src/consts.rs`'s per-target address constants
//! and wolfBoot's `target.h` pattern (one const struct per board instead
//! of scattered `#define`s), so a concrete MCU target only has to supply
//! one `BoardConfig` value.

/// Base address, size, and sector size for one flash partition.
#[derive(Debug, Clone, Copy)]
pub struct Partition {
    pub base: u32,
    pub size: u32,
}

impl Partition {
    pub const fn end(&self) -> u32 {
        self.base + self.size
    }
}

/// The key-vault partition always holds exactly this many sectors: slot
/// `0` (the manufacturing-time keys), slot `1` (staged by a key update),
/// and a trailer sector, the same arrangement BOOT/UPDATE use for their
/// own swappable sectors plus trailer.
pub const KEY_VAULT_SECTORS: u32 = 3;

/// Addresses and sizes for the partitions the Update Engine and Boot
/// Selector operate over. `sector_size` must match the erase granularity
/// reported by the `Flash` implementation bound at the call site.
#[derive(Debug, Clone, Copy)]
pub struct BoardConfig {
    pub boot: Partition,
    pub update: Partition,
    pub swap: Partition,
    /// Dedicated sector pair (plus trailer) holding the serialized
    /// keystore, swapped atomically when a signed `KEY_UPDATE` image is
    /// applied.
    pub key_vault: Partition,
    pub sector_size: u32,
    /// Bytes reserved for the manifest header at the start of every
    /// image.
    pub header_size: u32,
}

impl BoardConfig {
    /// Number of whole sectors in the BOOT/UPDATE partitions. Both
    /// partitions must be the same size.
    pub const fn sector_count(&self) -> u32 {
        self.boot.size / self.sector_size
    }

    /// Bytes reserved at the tail of each partition for its trailer
    /// (magic + one flag byte per sector + the state byte + the
    /// fallback-pending byte). See `trailer::Trailer` for the exact
    /// layout.
    pub const fn trailer_len(&self) -> u32 {
        4 + self.sector_count() + 1
    }

    /// Same trailer layout, sized for the key vault's fixed
    /// [`KEY_VAULT_SECTORS`] rather than the BOOT/UPDATE partitions' own
    /// sector count.
    pub const fn key_vault_trailer_len(&self) -> u32 {
        4 + KEY_VAULT_SECTORS + 1
    }
}
