// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundationdevices.com>
// SPDX-License-Identifier: GPL-3.0-or-later

//! Hands off execution to a verified application image.
//!
//! Reload MSP from the target's vector table, then branch to its reset
//! vector with a link register that can never be returned through. The
//! SoftDevice/MBR forwarding a BLE application would need is specific to
//! a workload this board no longer runs and has been dropped.

use cortex_m::peripheral::NVIC;
use defmt::info;

/// Implements [`boot_core::BootTarget`] for a bare Cortex-M target: no
/// SoftDevice or other second-stage loader sits between this bootloader
/// and the application.
pub struct CortexMTarget;

impl boot_core::BootTarget for CortexMTarget {
    fn jump(&self, entry_addr: u32) -> ! {
        unsafe { jump_to_app(entry_addr) }
    }
}

/// # Safety
///
/// `entry_addr` must point at a valid Cortex-M vector table (MSP
/// followed by the reset vector) belonging to code the caller has
/// already authenticated. This function never returns.
unsafe fn jump_to_app(entry_addr: u32) -> ! {
    // Mask every interrupt this bootloader enabled so none fires with a
    // vector table the application hasn't installed yet.
    NVIC::mask(embassy_nrf::interrupt::Interrupt::RNG);

    let msp = *(entry_addr as *const u32);
    let rv = *((entry_addr + 4) as *const u32);
    info!("msp = {=u32:x}, rv = {=u32:x}", msp, rv);

    // * Clear SPSEL so MSP is the active stack pointer
    // * Synchronize the instruction barrier
    // * Reload the stack pointer and jump, with a poisoned link
    //   register so a buggy application reset handler cannot return
    //   here instead of looping or resetting.
    core::arch::asm!(
        "mrs {tmp}, CONTROL",
        "bics {tmp}, {spsel}",
        "msr CONTROL, {tmp}",
        "isb",
        "msr MSP, {msp}",
        "mov lr, {new_lr}",
        "bx {rv}",
        tmp = in(reg) 0,
        spsel = in(reg) 2,
        new_lr = in(reg) 0xFFFFFFFFu32,
        msp = in(reg) msp,
        rv = in(reg) rv,
        options(noreturn),
    );
}
