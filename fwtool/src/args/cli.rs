// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundationdevices.com>
// SPDX-License-Identifier: GPL-3.0-or-later

//! Command line arguments.

use std::path::PathBuf;

#[derive(clap::Parser)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(clap::Subcommand)]
pub enum Command {
    /// Dump the manifest fields of a firmware image to stdout.
    Dump {
        /// The firmware image file: manifest header followed by payload.
        #[clap(short, long)]
        input: PathBuf,
        /// Size in bytes of the manifest header region at the front of the file.
        #[clap(long, default_value_t = 256)]
        header_size: usize,
    },
    /// Recompute an image's hash and check its signature against a public key.
    Verify {
        /// The firmware image file.
        #[clap(short, long)]
        input: PathBuf,
        /// Size in bytes of the manifest header region at the front of the file.
        #[clap(long, default_value_t = 256)]
        header_size: usize,
        /// Public key to check the signature against, hex-encoded.
        #[clap(long)]
        pubkey: String,
        /// Signature algorithm the public key belongs to.
        #[clap(long, value_enum, default_value = "ed25519")]
        sig_alg: SigAlgArg,
    },
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum SigAlgArg {
    Ed25519,
    EcdsaP256,
}
