// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundation.xyz>
// SPDX-License-Identifier: GPL-3.0-or-later

//! Partition/trailer model, update engine, and boot-selector state
//! machine: the parts of the bootloader that are independent of any one
//! microcontroller (component C, E, F of the shared data model).
//!
//! `boot-flash` supplies storage, `boot-manifest` supplies the image
//! format and keystore, `boot-sign` supplies signature dispatch; this
//! crate is where they meet.

#![no_std]

pub mod boot;
pub mod config;
pub mod error;
pub mod polarity;
pub mod trailer;
pub mod update;
pub mod verify;

pub use boot::{panic_loop, select_and_boot, BootTarget};
pub use config::{BoardConfig, Partition};
pub use error::BootError;
pub use polarity::{SectorFlag, State};
pub use update::UpdateEngine;
pub use verify::{Hasher, Verifier};
