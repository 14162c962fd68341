// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundation.xyz>
// SPDX-License-Identifier: GPL-3.0-or-later

//! Firmware manifest: TLV header format, field accessors, and the
//! compiled-in keystore it is authenticated against.
//!
//! This crate owns the *data model* (component B and the Keystore of the
//! shared data model); it performs no hashing or signature verification
//! itself -- that is `boot-sign`'s job, driven by the views this crate
//! exposes.

#![no_std]

pub mod keystore;
pub mod manifest;
pub mod tag;

pub use keystore::{KeySlot, KeyType, Keystore};
pub use manifest::{Error, ManifestView, FIXED_PREFIX, MAGIC};
pub use tag::{HashAlg, ImageType};
