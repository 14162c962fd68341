// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundationdevices.com>
// SPDX-License-Identifier: GPL-3.0-or-later

//! Read-only firmware manifest inspector.
//!
//! One-pass-then-print structure with a `main`/`main_args`/`run` split
//! that keeps argument parsing and I/O testable without touching the
//! real process. This tool never signs a file -- key material and a
//! signing workflow are out of scope for a host-side inspector.

use {
    boot_manifest::{tag::HashAlg, ManifestView},
    boot_sign::{hardened_verify, NoGlitchDefense, SigAlg, VerificationResult, Verify},
    colored::Colorize,
    std::{
        ffi::OsString,
        io::Write,
    },
};

mod args;

#[cfg(test)]
mod tests;

fn main() -> std::process::ExitCode {
    env_logger::init();
    main_args(
        std::env::args_os(),
        &mut std::io::stdout(),
        &mut std::io::stderr(),
    )
    .into()
}

fn main_args<I, T>(args: I, stdout: impl Write, mut stderr: impl Write) -> ExitCode
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    match run(args, stdout) {
        Ok(()) => ExitCode(0),
        Err(Error::Args(e @ args::Error::Cli(_))) => {
            writeln!(stderr, "{e}").expect("write error to stderr");
            ExitCode(1)
        }
        Err(e) => {
            writeln!(stderr, "{} {e}", "error:".bold().red()).expect("write error to stderr");
            ExitCode(1)
        }
    }
}

fn run<I, T>(args: I, mut stdout: impl Write) -> Result<(), Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    match args::args(args)? {
        args::Args::Dump { input, header_size } => {
            let data = std::fs::read(&input).map_err(Error::ReadInputFile)?;
            dump(&data, header_size, &mut stdout)?;
        }
        args::Args::Verify {
            input,
            header_size,
            pubkey,
            sig_alg,
        } => {
            let data = std::fs::read(&input).map_err(Error::ReadInputFile)?;
            verify(&data, header_size, &pubkey, sig_alg)?;
            writeln!(&mut stdout, "{}", "signature valid".green().bold()).map_err(Error::Stdout)?;
        }
    }
    Ok(())
}

fn dump(data: &[u8], header_size: usize, stdout: &mut impl Write) -> Result<(), Error> {
    let view = match ManifestView::open(data, header_size) {
        Ok(view) => view,
        Err(boot_manifest::Error::BadMagic | boot_manifest::Error::Truncated) => {
            writeln!(stdout, "{}", "no manifest found".bold()).map_err(Error::Stdout)?;
            return Ok(());
        }
        Err(e) => return Err(Error::Manifest(e)),
    };

    let alg_name = match view.hash_alg() {
        HashAlg::Sha256 => "sha256",
        HashAlg::Sha384 => "sha384",
        HashAlg::Sha3_384 => "sha3-384",
    };
    writeln!(stdout, "{:10} {alg_name}", "hash alg".bold()).map_err(Error::Stdout)?;
    if let Some(version) = view.get_version() {
        writeln!(stdout, "{:10} {version}", "version".bold()).map_err(Error::Stdout)?;
    }
    if let Some(timestamp) = view.get_timestamp() {
        writeln!(stdout, "{:10} {timestamp}", "timestamp".bold()).map_err(Error::Stdout)?;
    }
    if let Some(img_type) = view.get_type() {
        writeln!(stdout, "{:10} {img_type}", "img type".bold()).map_err(Error::Stdout)?;
    }
    let human_size = humansize::format_size(view.payload().len(), humansize::BINARY);
    writeln!(
        stdout,
        "{:10} {human_size} ({})",
        "size".bold(),
        view.payload().len(),
    )
    .map_err(Error::Stdout)?;
    writeln!(stdout, "{:10} {}", "sha".bold(), hex::encode(view.get_sha())).map_err(Error::Stdout)?;
    writeln!(
        stdout,
        "{:10} {}",
        "pubkey".bold(),
        hex::encode(view.get_pubkey_hint()),
    )
    .map_err(Error::Stdout)?;
    print_split_hex(stdout, "signature", view.get_signature())?;
    if let Some(secondary) = view.get_secondary_signature() {
        print_split_hex(stdout, "secondary", secondary)?;
    }
    Ok(())
}

/// Prints a long hex blob (a signature) split over two lines.
fn print_split_hex(stdout: &mut impl Write, label: &str, bytes: &[u8]) -> Result<(), Error> {
    let hex = hex::encode(bytes);
    let mid = hex.len() / 2;
    writeln!(stdout, "{:10} {}", label.bold(), &hex[..mid]).map_err(Error::Stdout)?;
    writeln!(stdout, "{} {}", " ".repeat(10), &hex[mid..]).map_err(Error::Stdout)?;
    Ok(())
}

/// Recomputes the manifest's declared hash over the hashed header prefix
/// plus payload, then checks the primary signature against `pubkey`.
/// Takes a single CLI-supplied key instead of a keystore lookup -- this
/// tool checks one candidate key at a time rather than simulating boot
/// policy.
fn verify(data: &[u8], header_size: usize, pubkey: &[u8], sig_alg: args::SigAlgArg) -> Result<(), Error> {
    let view = ManifestView::open(data, header_size)?;

    let mut digest = [0u8; 48];
    let digest_len = match view.hash_alg() {
        HashAlg::Sha256 => {
            use sha2::{Digest, Sha256};
            let mut hasher = Sha256::new();
            hasher.update(view.hashed_header_prefix());
            hasher.update(view.payload());
            digest[..32].copy_from_slice(&hasher.finalize());
            32
        }
        HashAlg::Sha384 => {
            use sha2::{Digest, Sha384};
            let mut hasher = Sha384::new();
            hasher.update(view.hashed_header_prefix());
            hasher.update(view.payload());
            digest[..48].copy_from_slice(&hasher.finalize());
            48
        }
        HashAlg::Sha3_384 => {
            use sha3::{Digest, Sha3_384};
            let mut hasher = Sha3_384::new();
            hasher.update(view.hashed_header_prefix());
            hasher.update(view.payload());
            digest[..48].copy_from_slice(&hasher.finalize());
            48
        }
    };
    if &digest[..digest_len] != view.get_sha() {
        return Err(Error::HashMismatch);
    }

    let alg = match sig_alg {
        args::SigAlgArg::Ed25519 => SigAlg::Ed25519,
        args::SigAlgArg::EcdsaP256 => SigAlg::EcdsaP256,
    };
    let result = hardened_verify(
        &HostVerifier,
        &mut NoGlitchDefense,
        alg,
        &digest[..digest_len],
        view.get_signature(),
        pubkey,
    );
    match result {
        VerificationResult::Valid => Ok(()),
        VerificationResult::Invalid => Err(Error::SignatureInvalid),
    }
}

/// Binds `boot-sign`'s dispatch trait to host-side pure-Rust
/// implementations of each supported signature algorithm.
struct HostVerifier;

impl Verify for HostVerifier {
    fn verify(&self, alg: SigAlg, hash: &[u8], signature: &[u8], pubkey: &[u8]) -> VerificationResult {
        let valid = match alg {
            SigAlg::Ed25519 => verify_ed25519(hash, signature, pubkey),
            SigAlg::EcdsaP256 => verify_ecdsa_p256(hash, signature, pubkey),
            _ => false,
        };
        if valid {
            VerificationResult::Valid
        } else {
            VerificationResult::Invalid
        }
    }
}

fn verify_ed25519(hash: &[u8], signature: &[u8], pubkey: &[u8]) -> bool {
    use ed25519_dalek::{Signature, VerifyingKey};
    let Ok(pubkey): Result<[u8; 32], _> = pubkey.try_into() else {
        return false;
    };
    let Ok(signature): Result<[u8; 64], _> = signature.try_into() else {
        return false;
    };
    let Ok(key) = VerifyingKey::from_bytes(&pubkey) else {
        return false;
    };
    key.verify_strict(hash, &Signature::from_bytes(&signature)).is_ok()
}

fn verify_ecdsa_p256(hash: &[u8], signature: &[u8], pubkey: &[u8]) -> bool {
    use p256::ecdsa::signature::hazmat::PrehashVerifier;
    use p256::ecdsa::{Signature, VerifyingKey};
    let Ok(key) = VerifyingKey::from_sec1_bytes(pubkey) else {
        return false;
    };
    let Ok(signature) = Signature::from_slice(signature) else {
        return false;
    };
    key.verify_prehash(hash, &signature).is_ok()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ExitCode(u8);

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        code.0.into()
    }
}

#[derive(Debug)]
enum Error {
    Args(args::Error),
    HashMismatch,
    Manifest(boot_manifest::Error),
    ReadInputFile(std::io::Error),
    SignatureInvalid,
    Stdout(std::io::Error),
}

impl From<args::Error> for Error {
    fn from(e: args::Error) -> Self {
        Error::Args(e)
    }
}

impl From<boot_manifest::Error> for Error {
    fn from(e: boot_manifest::Error) -> Self {
        Error::Manifest(e)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::Args(e) => write!(f, "{e}"),
            Error::HashMismatch => write!(f, "recomputed hash does not match the manifest's SHA field"),
            Error::Manifest(e) => write!(f, "{e}"),
            Error::ReadInputFile(e) => write!(f, "failed to read input file: {e}"),
            Error::SignatureInvalid => write!(f, "signature does not verify against the given public key"),
            Error::Stdout(e) => write!(f, "failed to write to stdout: {e}"),
        }
    }
}

impl std::error::Error for Error {}
