//! Wires the manifest model (`boot-manifest`) to the signature dispatch
//! layer (`boot-sign`): computes the image hash, resolves the signing
//! key from the keystore, and drives `hardened_verify`.
//!
//! Grounded on `cosign2::Header::hash` + `Secp256k1Verify::verify`'s two
//! call sites (hash the header, then verify), generalized with a
//! keystore lookup and an optional secondary signature for hybrid
//! signing.

use boot_manifest::tag::HashAlg;
use boot_manifest::{KeySlot, KeyType, Keystore, ManifestView};
use boot_sign::{hardened_verify, GlitchDefense, SigAlg, Verify, VerificationResult};

use crate::error::BootError;

/// Streaming hash context, bound by the caller the same way `boot-sign`'s
/// `Verify` is: the core selects and drives it, an external crate (e.g.
/// `sha2`) implements the primitive.
pub trait Hasher {
    fn reset(&mut self, alg: HashAlg);
    fn update(&mut self, data: &[u8]);
    /// Writes the digest into `out[..alg.size()]` and returns that
    /// length.
    fn finalize(&mut self, out: &mut [u8]) -> usize;
}

fn key_type_to_sig_alg(kt: KeyType) -> SigAlg {
    match kt {
        KeyType::Ed25519 => SigAlg::Ed25519,
        KeyType::EcdsaP256 => SigAlg::EcdsaP256,
        KeyType::EcdsaP384 => SigAlg::EcdsaP384,
        KeyType::Rsa2048 => SigAlg::Rsa2048,
        KeyType::Rsa3072 => SigAlg::Rsa3072,
        KeyType::Rsa4096 => SigAlg::Rsa4096,
        KeyType::Lms => SigAlg::Lms,
        KeyType::Xmss => SigAlg::Xmss,
        KeyType::MlDsa => SigAlg::MlDsa,
    }
}

/// Combines the compiled-in keystore with bound hash/signature
/// implementations to authenticate one candidate image at a time.
pub struct Verifier<'k, H, V, G> {
    keystore: &'k Keystore,
    hasher: H,
    verifier: V,
    defense: G,
}

impl<'k, H: Hasher, V: Verify, G: GlitchDefense> Verifier<'k, H, V, G> {
    pub fn new(keystore: &'k Keystore, hasher: H, verifier: V, defense: G) -> Self {
        Verifier {
            keystore,
            hasher,
            verifier,
            defense,
        }
    }

    /// Authenticates `manifest`: recomputes the image hash over the
    /// hashed header prefix and payload, checks it against the
    /// manifest's SHA field, resolves the signing key by
    /// `PUBKEY_HINT`, confirms that key is permitted to authorize this
    /// image's `IMG_TYPE`, and runs the hardened signature check. A
    /// present `SECONDARY_SIGNATURE` (hybrid signing) must also verify
    /// against the same key's slot, if the keystore entry names a
    /// secondary key type -- in the single-key case it is skipped, since
    /// hybrid signing is opt-in per slot.
    pub fn verify_image(&mut self, manifest: &ManifestView<'_>, image_type_bit: u32) -> Result<(), BootError> {
        let slot = self.resolve_slot(manifest, image_type_bit)?;
        self.check_hash(manifest)?;
        self.check_signature(manifest, slot, manifest.get_signature())?;
        if let Some(secondary) = manifest.get_secondary_signature() {
            self.check_signature(manifest, slot, secondary)?;
        }
        Ok(())
    }

    fn resolve_slot(&self, manifest: &ManifestView<'_>, image_type_bit: u32) -> Result<&'k KeySlot, BootError> {
        let slot = self
            .keystore
            .find_by_hint(manifest.get_pubkey_hint())
            .ok_or(BootError::UnknownSigningKey)?;
        if slot.permitted_image_mask & image_type_bit == 0 {
            return Err(BootError::KeyNotPermittedForImageType);
        }
        Ok(slot)
    }

    fn check_hash(&mut self, manifest: &ManifestView<'_>) -> Result<(), BootError> {
        let alg = manifest.hash_alg();
        self.hasher.reset(alg);
        self.hasher.update(manifest.hashed_header_prefix());
        self.hasher.update(manifest.payload());
        let mut digest = [0u8; 64];
        let len = self.hasher.finalize(&mut digest);
        if &digest[..len] != manifest.get_sha() {
            return Err(BootError::HashMismatch);
        }
        Ok(())
    }

    fn check_signature(&mut self, manifest: &ManifestView<'_>, slot: &KeySlot, signature: &[u8]) -> Result<(), BootError> {
        let alg = key_type_to_sig_alg(slot.key_type);
        let hash_len = manifest.hash_alg().size();
        let mut digest = [0u8; 64];
        self.hasher.reset(manifest.hash_alg());
        self.hasher.update(manifest.hashed_header_prefix());
        self.hasher.update(manifest.payload());
        self.hasher.finalize(&mut digest);

        let result = hardened_verify(
            &self.verifier,
            &mut self.defense,
            alg,
            &digest[..hash_len],
            signature,
            slot.pubkey,
        );
        match result {
            VerificationResult::Valid => Ok(()),
            VerificationResult::Invalid => Err(result.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use boot_manifest::KeySlot;
    use boot_sign::NoGlitchDefense;

    struct StubHasher {
        alg: HashAlg,
        acc: [u8; 256],
        len: usize,
    }

    impl StubHasher {
        fn new() -> Self {
            StubHasher {
                alg: HashAlg::Sha256,
                acc: [0; 256],
                len: 0,
            }
        }
    }

    impl Hasher for StubHasher {
        fn reset(&mut self, alg: HashAlg) {
            self.alg = alg;
            self.len = 0;
        }

        fn update(&mut self, data: &[u8]) {
            for &b in data {
                if self.len < self.acc.len() {
                    self.acc[self.len] ^= b;
                    self.len += 1;
                } else {
                    self.acc[self.len % self.acc.len()] ^= b;
                    self.len += 1;
                }
            }
        }

        fn finalize(&mut self, out: &mut [u8]) -> usize {
            let size = self.alg.size();
            out[..size].copy_from_slice(&self.acc[..size]);
            size
        }
    }

    struct AcceptAll;
    impl Verify for AcceptAll {
        fn verify(&self, _alg: SigAlg, _hash: &[u8], _sig: &[u8], _pubkey: &[u8]) -> VerificationResult {
            VerificationResult::Valid
        }
    }

    static SLOTS: [KeySlot; 1] = [KeySlot {
        slot_id: 0,
        key_type: KeyType::Ed25519,
        permitted_image_mask: 0xFFFF_FFFF,
        pubkey_hint: &[0xBB; 32],
        pubkey: &[2; 32],
    }];

    fn build_manifest(bytes: &mut [u8; 512], payload: &[u8]) -> usize {
        use boot_manifest::tag;
        const HEADER_SIZE: usize = 256;
        bytes[0..4].copy_from_slice(&boot_manifest::MAGIC.to_le_bytes());
        bytes[4..8].copy_from_slice(&(payload.len() as u32).to_le_bytes());
        let mut offset = 8usize;
        macro_rules! push {
            ($tag:expr, $val:expr) => {{
                let v: &[u8] = $val;
                bytes[offset..offset + 2].copy_from_slice(&($tag as u16).to_le_bytes());
                bytes[offset + 2..offset + 4].copy_from_slice(&(v.len() as u16).to_le_bytes());
                bytes[offset + 4..offset + 4 + v.len()].copy_from_slice(v);
                offset += 4 + v.len();
            }};
        }
        // Hash is computed over the prefix + payload with the stub
        // hasher's XOR accumulator, filled in after the skeleton is
        // written below.
        push!(tag::SHA256, &[0u8; 32]);
        push!(tag::PUBKEY_HINT, &[0xBBu8; 32]);
        push!(tag::SIGNATURE, &[0xCCu8; 64]);
        bytes[offset..offset + 2].copy_from_slice(&tag::END.to_le_bytes());
        bytes[offset + 2..offset + 4].copy_from_slice(&0u16.to_le_bytes());
        for b in &mut bytes[offset + 4..HEADER_SIZE] {
            *b = 0xFF;
        }
        bytes[HEADER_SIZE..HEADER_SIZE + payload.len()].copy_from_slice(payload);
        HEADER_SIZE + payload.len()
    }

    #[test]
    fn verify_image_accepts_matching_hash_and_signature() {
        let mut raw = [0u8; 512];
        let payload = [1, 2, 3, 4];
        let total = build_manifest(&mut raw, &payload);

        // Recompute the correct hash with the same stub algorithm and
        // patch it into the SHA field before parsing.
        let mut hasher = StubHasher::new();
        {
            let view = ManifestView::open(&raw[..total], 256).unwrap();
            hasher.reset(view.hash_alg());
            hasher.update(view.hashed_header_prefix());
            hasher.update(view.payload());
        }
        let mut digest = [0u8; 64];
        let len = hasher.finalize(&mut digest);
        let sha_offset = 8 + 4;
        raw[sha_offset..sha_offset + len].copy_from_slice(&digest[..len]);

        let view = ManifestView::open(&raw[..total], 256).unwrap();
        let keystore = Keystore::new(&SLOTS);
        let mut verifier = Verifier::new(&keystore, StubHasher::new(), AcceptAll, NoGlitchDefense);
        assert!(verifier.verify_image(&view, 1).is_ok());
    }

    #[test]
    fn verify_image_rejects_unknown_key() {
        let mut raw = [0u8; 512];
        let payload = [1, 2, 3, 4];
        let total = build_manifest(&mut raw, &payload);
        let pubkey_hint_offset = 8 + 4 + 32 + 4; // past SHA256's tag+len+value, past PUBKEY_HINT's tag+len
        raw[pubkey_hint_offset..pubkey_hint_offset + 32].fill(0x11); // mismatched hint
        let view = ManifestView::open(&raw[..total], 256).unwrap();
        let keystore = Keystore::new(&SLOTS);
        let mut verifier = Verifier::new(&keystore, StubHasher::new(), AcceptAll, NoGlitchDefense);
        assert_eq!(verifier.verify_image(&view, 1), Err(BootError::UnknownSigningKey));
    }
}
