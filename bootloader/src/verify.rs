// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundationdevices.com>
// SPDX-License-Identifier: GPL-3.0-or-later

//! Binds `boot-core`'s `Hasher`/`boot-sign`'s `Verify`/`GlitchDefense`
//! traits to concrete primitives for this target: SHA-256 via `sha2`,
//! and (feature-selected) Ed25519 or ECDSA/P-256 signature checking.
//!
//! This crate is the only place in the workspace that reaches for an
//! actual cryptographic implementation; `boot-sign` only selects and
//! dispatches.

use boot_core::Hasher;
use boot_manifest::tag::HashAlg;
use boot_sign::{SigAlg, Verify, VerificationResult};
use embassy_nrf::peripherals::RNG;
use embassy_nrf::rng::Rng;
use sha2::{Digest, Sha256};

pub struct TargetHasher {
    alg: HashAlg,
    sha256: Sha256,
}

impl TargetHasher {
    pub fn new() -> Self {
        TargetHasher {
            alg: HashAlg::Sha256,
            sha256: Sha256::new(),
        }
    }
}

impl Hasher for TargetHasher {
    fn reset(&mut self, alg: HashAlg) {
        self.alg = alg;
        self.sha256 = Sha256::new();
    }

    fn update(&mut self, data: &[u8]) {
        match self.alg {
            HashAlg::Sha256 => Digest::update(&mut self.sha256, data),
            // Non-SHA-256 manifests are out of scope for this target's
            // keystore; such a manifest fails the hash comparison since
            // the digest it produces here will never match.
            HashAlg::Sha384 | HashAlg::Sha3_384 => {}
        }
    }

    fn finalize(&mut self, out: &mut [u8]) -> usize {
        match self.alg {
            HashAlg::Sha256 => {
                let digest = core::mem::replace(&mut self.sha256, Sha256::new()).finalize();
                out[..32].copy_from_slice(&digest);
                32
            }
            HashAlg::Sha384 | HashAlg::Sha3_384 => 0,
        }
    }
}

#[cfg(feature = "sig-ed25519")]
pub struct TargetVerifier;

#[cfg(feature = "sig-ed25519")]
impl Verify for TargetVerifier {
    fn verify(&self, alg: SigAlg, hash: &[u8], signature: &[u8], pubkey: &[u8]) -> VerificationResult {
        use ed25519_dalek::{Signature, VerifyingKey};

        if alg != SigAlg::Ed25519 {
            return VerificationResult::Invalid;
        }
        let Ok(pubkey): Result<[u8; 32], _> = pubkey.try_into() else {
            return VerificationResult::Invalid;
        };
        let Ok(signature): Result<[u8; 64], _> = signature.try_into() else {
            return VerificationResult::Invalid;
        };
        let Ok(key) = VerifyingKey::from_bytes(&pubkey) else {
            return VerificationResult::Invalid;
        };
        let signature = Signature::from_bytes(&signature);
        match key.verify_strict(hash, &signature) {
            Ok(()) => VerificationResult::Valid,
            Err(_) => VerificationResult::Invalid,
        }
    }
}

#[cfg(feature = "sig-ecdsa-p256")]
pub struct TargetVerifier;

#[cfg(feature = "sig-ecdsa-p256")]
impl Verify for TargetVerifier {
    fn verify(&self, alg: SigAlg, hash: &[u8], signature: &[u8], pubkey: &[u8]) -> VerificationResult {
        use p256::ecdsa::signature::hazmat::PrehashVerifier;
        use p256::ecdsa::{Signature, VerifyingKey};

        if alg != SigAlg::EcdsaP256 {
            return VerificationResult::Invalid;
        }
        let Ok(key) = VerifyingKey::from_sec1_bytes(pubkey) else {
            return VerificationResult::Invalid;
        };
        let Ok(signature) = Signature::from_slice(signature) else {
            return VerificationResult::Invalid;
        };
        match key.verify_prehash(hash, &signature) {
            Ok(()) => VerificationResult::Valid,
            Err(_) => VerificationResult::Invalid,
        }
    }
}

/// Random pre/post delay around every signature check, using the
/// nrf52805's hardware RNG to make timing/glitch attacks harder to land.
pub struct HwGlitchDefense<'d> {
    rng: Rng<'d, RNG>,
}

impl<'d> HwGlitchDefense<'d> {
    pub fn new(rng: Rng<'d, RNG>) -> Self {
        HwGlitchDefense { rng }
    }
}

impl<'d> boot_sign::GlitchDefense for HwGlitchDefense<'d> {
    fn random_delay(&mut self) {
        let mut bytes = [0u8; 1];
        self.rng.blocking_fill_bytes(&mut bytes);
        // 0-200 iterations of a short busy loop; no timer peripheral is
        // needed for an approximate delay against glitching.
        let iterations = u32::from(bytes[0] % 200);
        cortex_m::asm::delay(iterations * 1000);
        bytes[0] = 0;
    }
}
