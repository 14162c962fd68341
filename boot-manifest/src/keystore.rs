//! Compiled-in, read-only keystore: an ordered table of trusted public
//! keys, each scoped to the image types it is permitted to authorize.
//!
//! Grounded on wolfBoot's `struct keystore_slot { slot_id, key_type,
//! part_id_mask, pubkey_size, pubkey[] }` (`tools/unit-tests/unit-keystore.c`),
//! generalized from a single hard-coded ECC256 array entry to the full
//! `key_type` dispatch the spec names.

/// Key algorithm a slot's public key is for. Kept opaque here (a plain
/// tag) so `boot-manifest` has no dependency on the signature-dispatch
/// crate; `boot-sign::SigAlg` maps onto this 1:1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyType {
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

/// One compiled-in keystore entry.
#[derive(Debug, Clone, Copy)]
pub struct KeySlot {
    pub slot_id: u8,
    pub key_type: KeyType,
    /// Bitmap: bit `t` set means this key may authorize `ImageType` `t`.
    pub permitted_image_mask: u32,
    /// Hash of this key, as would appear in a manifest's PUBKEY_HINT.
    pub pubkey_hint: &'static [u8],
    pub pubkey: &'static [u8],
}

/// The compiled-in, ordered keystore.
#[derive(Debug, Clone, Copy)]
pub struct Keystore {
    slots: &'static [KeySlot],
}

impl Keystore {
    pub const fn new(slots: &'static [KeySlot]) -> Self {
        Keystore { slots }
    }

    pub fn slots(&self) -> &'static [KeySlot] {
        self.slots
    }

    /// Finds the slot whose key hashes to `pubkey_hint`.
    pub fn find_by_hint(&self, pubkey_hint: &[u8]) -> Option<&'static KeySlot> {
        self.slots.iter().find(|slot| slot.pubkey_hint == pubkey_hint)
    }
}
