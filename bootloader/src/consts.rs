// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundationdevices.com>
// SPDX-License-Identifier: GPL-3.0-or-later

//! Partition geometry for the nrf52805 target: BOOT/UPDATE/SWAP
//! addresses and sizes, and the bootloader's own UICR-advertised load
//! address.

use boot_core::{BoardConfig, Partition};

#[used]
#[link_section = ".uicr_bootloader_start_address"]
pub static BOOTLOADER_ADDR: i32 = 0x27000;

pub const BASE_BOOTLOADER_ADDR: u32 = 0x27000;
pub const FLASH_PAGE: u32 = 4096;

/// BOOT occupies the first half of the application region, UPDATE the
/// second half, and SWAP is the final page reserved for the swap
/// scratch area, all below the bootloader's own 36K at the top of
/// flash.
pub const BOARD: BoardConfig = BoardConfig {
    boot: Partition {
        base: 0x0001_0000,
        size: 0x0000_9000,
    },
    update: Partition {
        base: 0x0001_9000,
        size: 0x0000_9000,
    },
    swap: Partition {
        base: 0x0002_2000,
        size: FLASH_PAGE,
    },
    key_vault: Partition {
        base: 0x0002_3000,
        size: FLASH_PAGE * 3,
    },
    sector_size: FLASH_PAGE,
    header_size: 256,
};
