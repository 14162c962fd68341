//! Top-level error taxonomy, composed from each collaborating crate's
//! own error type rather than flattened into one enum, since `boot-core`
//! is the first place in the workspace that depends on all three.

use boot_flash::Error as FlashError;
use boot_manifest::Error as ManifestError;
use boot_sign::VerificationResult;

use crate::trailer::Error as TrailerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootError {
    Flash(FlashError),
    Trailer(TrailerError),
    Manifest(ManifestError),
    /// `hardened_verify` returned `VerificationResult::Invalid`.
    SignatureInvalid,
    /// The computed image hash did not match the manifest's SHA field.
    HashMismatch,
    /// `PUBKEY_HINT` did not resolve to any compiled-in keystore slot.
    UnknownSigningKey,
    /// The resolved keystore slot's `permitted_image_mask` does not
    /// cover this manifest's `IMG_TYPE`.
    KeyNotPermittedForImageType,
    /// A candidate's manifest version was not strictly greater than the
    /// currently installed version (anti-rollback).
    VersionRollback,
    /// No partition held anything the Boot Selector could boot.
    NoValidCandidate,
    /// `apply_key_update` was called a second time; the key vault only
    /// has room for one staged rotation before it must be erased.
    KeyVaultAlreadyRotated,
    /// The supplied keystore blob does not fit in one key-vault sector.
    KeyVaultPayloadTooLarge,
}

impl From<FlashError> for BootError {
    fn from(e: FlashError) -> Self {
        BootError::Flash(e)
    }
}

impl From<TrailerError> for BootError {
    fn from(e: TrailerError) -> Self {
        match e {
            TrailerError::Flash(f) => BootError::Flash(f),
            other => BootError::Trailer(other),
        }
    }
}

impl From<ManifestError> for BootError {
    fn from(e: ManifestError) -> Self {
        BootError::Manifest(e)
    }
}

impl From<VerificationResult> for BootError {
    fn from(r: VerificationResult) -> Self {
        debug_assert_eq!(r, VerificationResult::Invalid);
        BootError::SignatureInvalid
    }
}
