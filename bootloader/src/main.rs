// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundationdevices.com>
// SPDX-License-Identifier: GPL-3.0-or-later

//! Bootloader entry point for Foundation Devices hardware.
//!
//! On every reset: protect its own flash region, read the BOOT/UPDATE
//! partition trailers, apply a pending update if one is staged and
//! valid, authenticate whichever image the decision table selects, and
//! jump. There is no interactive protocol here; firmware delivery onto
//! the UPDATE partition is an external concern this binary does not
//! implement.

#![no_std]
#![no_main]

mod consts;
mod jump_app;
mod verify;

use boot_core::{panic_loop, select_and_boot};
use boot_flash::Error as FlashError;
use boot_manifest::{KeySlot, KeyType, Keystore};
use cortex_m_rt::entry;
use defmt::info;
use defmt_rtt as _;
use embassy_nrf::bind_interrupts;
use embassy_nrf::nvmc::Nvmc;
use embassy_nrf::peripherals::RNG;
use embassy_nrf::rng::{self, Rng};
use embedded_storage::nor_flash::{NorFlash, ReadNorFlash};
use jump_app::CortexMTarget;
use panic_probe as _;
use verify::{HwGlitchDefense, TargetHasher, TargetVerifier};

bind_interrupts!(struct Irqs {
    RNG => rng::InterruptHandler<RNG>;
});

/// Adapts `embassy_nrf`'s blocking NVMC driver to the `Flash` trait the
/// rest of the workspace is built against, the same trait boundary the
/// teacher already crosses with `embedded_storage::nor_flash` for its
/// own application-flash writer.
struct NvmcFlash<'d> {
    nvmc: Nvmc<'d>,
}

impl<'d> boot_flash::Flash for NvmcFlash<'d> {
    fn sector_size(&self) -> u32 {
        consts::FLASH_PAGE
    }

    fn read(&mut self, addr: u32, buf: &mut [u8]) -> Result<(), FlashError> {
        self.nvmc.read(addr, buf).map_err(|_| FlashError::Io)
    }

    fn erase(&mut self, addr: u32, len: u32) -> Result<(), FlashError> {
        self.nvmc.erase(addr, addr + len).map_err(|_| FlashError::Io)
    }

    fn write(&mut self, addr: u32, buf: &[u8]) -> Result<(), FlashError> {
        self.nvmc.write(addr, buf).map_err(|_| FlashError::Io)
    }
}

/// Compiled-in keys this board trusts to sign an application image.
/// Slot 0 may authorize application images and key-update images
/// (`ImageType::Application` and `ImageType::KeyUpdate`'s mask bits).
static KEYSTORE_SLOTS: [KeySlot; 1] = [KeySlot {
    slot_id: 0,
    key_type: KeyType::Ed25519,
    permitted_image_mask: 0b1001,
    pubkey_hint: &[0u8; 32], // replaced at provisioning time
    pubkey: &[0u8; 32],      // replaced at provisioning time
}];

/// Locks the bootloader's own flash region (0x27000-0x30000) against
/// writes from anything running after hand-off, using Nordic's BPROT
/// peripheral.
#[cfg(feature = "flash-protect")]
fn flash_protect_bootloader() {
    unsafe { &*nrf52805_pac::BPROT::ptr() }.config1.write(|w| {
        w.region47().enabled(); //0x2F000-0x30000
        w.region46().enabled(); //0x2E000-0x2F000
        w.region45().enabled(); //0x2D000-0x2E000
        w.region44().enabled(); //0x2C000-0x2D000
        w.region43().enabled(); //0x2B000-0x2C000
        w.region42().enabled(); //0x2A000-0x2B000
        w.region41().enabled(); //0x29000-0x2A000
        w.region40().enabled(); //0x28000-0x29000
        w.region39().enabled(); //0x27000-0x28000
        w
    });
    #[cfg(feature = "no-dbg-access")]
    unsafe { &*nrf52805_pac::BPROT::ptr() }
        .disableindebug
        .write(|w| unsafe { w.bits(0x00) });
}

#[entry]
fn main() -> ! {
    #[cfg(feature = "flash-protect")]
    flash_protect_bootloader();

    let p = embassy_nrf::init(Default::default());
    let rng = Rng::new(p.RNG, Irqs);
    let mut flash = NvmcFlash { nvmc: Nvmc::new(p.NVMC) };

    let keystore = Keystore::new(&KEYSTORE_SLOTS);
    let mut manifest_scratch = [0u8; 512];

    let result = select_and_boot(
        &mut flash,
        consts::BOARD,
        TargetHasher::new(),
        TargetVerifier,
        HwGlitchDefense::new(rng),
        &keystore,
        &CortexMTarget,
        &mut manifest_scratch,
    );

    match result {
        Ok(never) => match never {},
        Err(e) => {
            info!("boot selector rejected every candidate: {:?}", defmt::Debug2Format(&e));
            panic_loop();
        }
    }
}
