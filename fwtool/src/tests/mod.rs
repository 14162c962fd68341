// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundationdevices.com>
// SPDX-License-Identifier: GPL-3.0-or-later

use {
    crate::ExitCode,
    boot_manifest::tag,
    ed25519_dalek::{Signer, SigningKey},
    sha2::{Digest, Sha256},
    std::io::Write,
};

const HEADER_SIZE: usize = 256;

/// Builds a minimal, well-formed manifest (VERSION/SHA256/PUBKEY_HINT/SIGNATURE)
/// in front of `payload`, signed by `key`.
fn signed_manifest(key: &SigningKey, version: u32, payload: &[u8]) -> Vec<u8> {
    let mut header = vec![0u8; HEADER_SIZE];
    header[0..4].copy_from_slice(&boot_manifest::MAGIC.to_le_bytes());
    header[4..8].copy_from_slice(&(payload.len() as u32).to_le_bytes());

    let pubkey_hint = {
        let mut hasher = Sha256::new();
        hasher.update(key.verifying_key().as_bytes());
        hasher.finalize()
    };

    let mut offset = 8usize;
    push_tlv(&mut header, &mut offset, tag::VERSION, &version.to_le_bytes());

    let sha_offset = offset;
    push_tlv(&mut header, &mut offset, tag::SHA256, &[0u8; 32]);
    push_tlv(&mut header, &mut offset, tag::PUBKEY_HINT, &pubkey_hint);
    let signature_offset = offset;
    push_tlv(&mut header, &mut offset, tag::SIGNATURE, &[0u8; 64]);
    header[offset..offset + 2].copy_from_slice(&tag::END.to_le_bytes());
    header[offset + 2..offset + 4].copy_from_slice(&0u16.to_le_bytes());

    // Hash covers everything before the SIGNATURE record, plus the payload.
    let digest: [u8; 32] = {
        let mut hasher = Sha256::new();
        hasher.update(&header[..signature_offset]);
        hasher.update(payload);
        hasher.finalize().into()
    };
    header[sha_offset + 4..sha_offset + 4 + 32].copy_from_slice(&digest);

    let signature = key.sign(&digest);
    header[signature_offset + 4..signature_offset + 4 + 64].copy_from_slice(&signature.to_bytes());

    let mut image = header;
    image.extend_from_slice(payload);
    image
}

fn push_tlv(buf: &mut [u8], offset: &mut usize, tag: u16, value: &[u8]) {
    buf[*offset..*offset + 2].copy_from_slice(&tag.to_le_bytes());
    buf[*offset + 2..*offset + 4].copy_from_slice(&(value.len() as u16).to_le_bytes());
    buf[*offset + 4..*offset + 4 + value.len()].copy_from_slice(value);
    *offset += 4 + value.len();
}

fn test_key() -> SigningKey {
    SigningKey::from_bytes(&[0x42; 32])
}

#[test]
fn dump_reports_no_manifest_for_unrelated_file() {
    let file = create_file(b"not a firmware image");
    let output = test(["dump", "-i", file.path().to_str().unwrap()]);
    assert_eq!(output.exit_code, ExitCode(0));
    assert!(output.stdout.contains("no manifest found"));
    assert!(output.stderr.is_empty());
}

#[test]
fn dump_prints_manifest_fields() {
    let key = test_key();
    let image = signed_manifest(&key, 7, b"payload bytes");
    let file = create_file(&image);
    let output = test(["dump", "-i", file.path().to_str().unwrap()]);
    assert_eq!(output.exit_code, ExitCode(0));
    assert!(output.stdout.contains("sha256"));
    assert!(output.stdout.contains('7'));
    assert!(output.stdout.contains("13 B (13)"));
    assert!(output.stderr.is_empty());
}

#[test]
fn verify_accepts_valid_signature() {
    let key = test_key();
    let image = signed_manifest(&key, 1, b"payload bytes");
    let file = create_file(&image);
    let pubkey_hex = hex::encode(key.verifying_key().as_bytes());
    let output = test([
        "verify",
        "-i",
        file.path().to_str().unwrap(),
        "--pubkey",
        &pubkey_hex,
    ]);
    assert_eq!(output.exit_code, ExitCode(0));
    assert!(output.stdout.contains("signature valid"));
    assert!(output.stderr.is_empty());
}

#[test]
fn verify_rejects_tampered_payload() {
    let key = test_key();
    let mut image = signed_manifest(&key, 1, b"payload bytes");
    *image.last_mut().unwrap() ^= 0xFF;
    let file = create_file(&image);
    let pubkey_hex = hex::encode(key.verifying_key().as_bytes());
    let output = test([
        "verify",
        "-i",
        file.path().to_str().unwrap(),
        "--pubkey",
        &pubkey_hex,
    ]);
    assert_eq!(output.exit_code, ExitCode(1));
    assert!(output.stdout.is_empty());
    assert!(output.stderr.contains("recomputed hash does not match"));
}

#[test]
fn verify_rejects_wrong_pubkey() {
    let key = test_key();
    let other = SigningKey::from_bytes(&[0x99; 32]);
    let image = signed_manifest(&key, 1, b"payload bytes");
    let file = create_file(&image);
    let pubkey_hex = hex::encode(other.verifying_key().as_bytes());
    let output = test([
        "verify",
        "-i",
        file.path().to_str().unwrap(),
        "--pubkey",
        &pubkey_hex,
    ]);
    assert_eq!(output.exit_code, ExitCode(1));
    assert!(output.stdout.is_empty());
    assert!(output.stderr.contains("does not verify"));
}

fn test<const N: usize>(args: [&str; N]) -> Output {
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let exit_code = crate::main_args(std::iter::once("fwtool").chain(args), &mut stdout, &mut stderr);
    Output {
        exit_code,
        stdout: String::from_utf8(stdout).unwrap(),
        stderr: String::from_utf8(stderr).unwrap(),
    }
}

#[derive(Debug)]
struct Output {
    exit_code: ExitCode,
    stdout: String,
    stderr: String,
}

fn create_file(data: &[u8]) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(data).unwrap();
    file
}
