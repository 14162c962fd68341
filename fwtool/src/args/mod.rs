// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundationdevices.com>
// SPDX-License-Identifier: GPL-3.0-or-later

use std::path::PathBuf;

mod cli;

pub use cli::SigAlgArg;

/// Program arguments, parsed and validated from the raw CLI.
#[derive(Debug, Clone)]
pub enum Args {
    Dump {
        input: PathBuf,
        header_size: usize,
    },
    Verify {
        input: PathBuf,
        header_size: usize,
        pubkey: Vec<u8>,
        sig_alg: SigAlgArg,
    },
}

pub fn args<I, T>(args: I) -> Result<Args, Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    use clap::Parser;
    let cli = cli::Args::try_parse_from(args).map_err(Error::Cli)?;
    match cli.command {
        cli::Command::Dump { input, header_size } => Ok(Args::Dump { input, header_size }),
        cli::Command::Verify {
            input,
            header_size,
            pubkey,
            sig_alg,
        } => {
            let pubkey = hex::decode(&pubkey).map_err(|_| Error::InvalidPubkeyHex)?;
            Ok(Args::Verify {
                input,
                header_size,
                pubkey,
                sig_alg,
            })
        }
    }
}

#[derive(Debug)]
pub enum Error {
    Cli(clap::Error),
    InvalidPubkeyHex,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Cli(e) => write!(f, "{}", e.render().ansi()),
            Error::InvalidPubkeyHex => write!(f, "user specified invalid public key hex"),
        }
    }
}

impl std::error::Error for Error {}
