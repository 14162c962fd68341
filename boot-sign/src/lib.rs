// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundation.xyz>
// SPDX-License-Identifier: GPL-3.0-or-later

//! Signature algorithm selection and the fault-injection-hardened verify
//! wrapper.
//!
//! Primitive cryptography (SHA-2/3, Ed25519, ECDSA, RSA-PKCS#1, ML-DSA,
//! LMS, XMSS) is an external collaborator: this crate selects and
//! dispatches, it does not implement any of it. The single `Verify`
//! trait mirrors `cosign2::Secp256k1Verify` (one verification entry
//! point per algorithm family, bound by the caller), generalized to a
//! tagged `SigAlg` covering every supported algorithm instead of one
//! hard-coded curve. The control-flow-integrity idiom of an
//! `EccVerifier::verify_ecdsa` is lifted out into a reusable
//! `hardened_verify` that wraps *any* `Verify` impl.

#![no_std]

/// Image-signing algorithm family, bound at build time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SigAlg {
    Ed25519,
    EcdsaP256,
    EcdsaP384,
    Rsa2048,
    Rsa3072,
    Rsa4096,
    Lms,
    Xmss,
    MlDsa,
}

/// Verification result. Values differ by many bits so a fault flipping a
/// handful of them cannot turn `Invalid` into `Valid` (mirrors
/// `cosign2::VerificationResult`'s `0xcafebabe` / `0xdeadbeef` choice).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum VerificationResult {
    Valid = 0xcafe_babe,
    Invalid = 0xdead_beef,
}

/// One verification entry point, bound at build time to a concrete
/// algorithm implementation (e.g. a micro-ecc FFI binding, as
/// `EccVerifier` does, or a pure-Rust crate). A build normally binds
/// exactly one "primary" instance and, for hybrid signing, one
/// "secondary" instance of a different algorithm.
pub trait Verify {
    fn verify(&self, alg: SigAlg, hash: &[u8], signature: &[u8], pubkey: &[u8]) -> VerificationResult;
}

/// Hook for a random delay inserted around every signature check to make
/// timing/glitch attacks harder to land. The core has no RNG or timer of
/// its own; callers provide one.
pub trait GlitchDefense {
    fn random_delay(&mut self);
}

/// No-op defense, for hosts/tests where glitch resistance is irrelevant.
pub struct NoGlitchDefense;

impl GlitchDefense for NoGlitchDefense {
    fn random_delay(&mut self) {}
}

const CF1: u32 = 3;
const CF2: u32 = 5;
const CF3: u32 = 7;
const CF_TOTAL: u32 = CF1 + CF2 + CF3;

/// Verifies a signature with the same redundant cross-check discipline as
/// `bootloader/src/verify.rs::EccVerifier::verify_ecdsa`: a random delay
/// before and after the check, a control-flow-integrity counter that must
/// reach an exact total, and a bitwise-complement re-read of the result
/// through a volatile pointer before trusting it. A single skipped branch
/// or bit-flipped comparison is not enough to turn this `Valid`.
pub fn hardened_verify(
    verifier: &impl Verify,
    defense: &mut impl GlitchDefense,
    alg: SigAlg,
    hash: &[u8],
    signature: &[u8],
    pubkey: &[u8],
) -> VerificationResult {
    let mut cfi = 0u32;

    defense.random_delay();
    let result = verifier.verify(alg, hash, signature, pubkey);
    defense.random_delay();

    if result == VerificationResult::Valid {
        cfi += CF1;
        let result_bits = result as u32;
        let complement = !result_bits;
        let complement_ptr = &complement as *const u32;
        // Force a genuine memory round-trip rather than letting the
        // optimizer fold this back to a constant.
        let reread_complement = unsafe { complement_ptr.read_volatile() };
        if reread_complement == !result_bits {
            cfi += CF2;
            let result_ptr = &result_bits as *const u32;
            let reread_result = unsafe { result_ptr.read_volatile() };
            if reread_result == VerificationResult::Valid as u32 {
                cfi += CF3;
                let cfi_ptr = &cfi as *const u32;
                if unsafe { cfi_ptr.read_volatile() } == CF_TOTAL {
                    return VerificationResult::Valid;
                }
            }
        }
    }
    VerificationResult::Invalid
}
