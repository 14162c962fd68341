//! Boot Selector: the decision table that picks which partition to
//! verify and hand off to on every reset.
//!
//! Grounded on `update_flash_hwswap.c`'s `wolfBoot_start` loop (check
//! the update partition's state, swap if appropriate, then verify and
//! jump to BOOT; panic if nothing verifies), generalized so a version
//! check gates the swap -- a corrupted or rolled-back candidate is never
//! applied -- and an interrupted swap resumes instead of restarting.

use boot_flash::Flash;
use boot_manifest::ManifestView;
use boot_sign::{GlitchDefense, Verify};

use crate::config::{BoardConfig, Partition};
use crate::error::BootError;
use crate::polarity::State;
use crate::update::UpdateEngine;
use crate::verify::{Hasher, Verifier};

/// One-way hand-off to a verified image, bound per architecture. Mirrors
/// `bootloader/src/jump_app.rs::jump_to_app`'s MSP-reload-then-branch
/// asm sequence, generalized behind a trait so other architectures can
/// supply their own.
pub trait BootTarget {
    /// Transfers control to the image at `entry_addr`. Never returns.
    fn jump(&self, entry_addr: u32) -> !;
}

/// Spins forever issuing a distinct opaque operation each iteration
/// rather than a bare `loop {}`, so a fault that skips one iteration's
/// body still lands back in the loop instead of falling through to
/// whatever code follows it in flash.
pub fn panic_loop() -> ! {
    loop {
        core::hint::black_box(());
    }
}

/// Reads and validates the manifest occupying a partition's header
/// region into caller-supplied scratch space, since no crate in this
/// workspace allocates.
fn read_manifest<'b, F: Flash>(
    flash: &mut F,
    base: u32,
    header_size: usize,
    image_len: u32,
    buf: &'b mut [u8],
) -> Result<ManifestView<'b>, BootError> {
    let total = header_size + image_len as usize;
    flash.read(base, &mut buf[..total])?;
    Ok(ManifestView::open(&buf[..total], header_size)?)
}

/// Verifies the Application image held in `partition` and returns the
/// address execution should resume at. Used for both the primary BOOT
/// attempt and the UPDATE fallback attempt, since both candidates are
/// authenticated identically.
#[allow(clippy::too_many_arguments)]
fn try_boot_partition<F, H, V, G>(
    engine: &mut UpdateEngine<'_, F>,
    cfg: BoardConfig,
    partition: Partition,
    v: &mut Verifier<'_, H, V, G>,
    manifest_scratch: &mut [u8],
) -> Result<u32, BootError>
where
    F: Flash,
    H: Hasher,
    V: Verify,
    G: GlitchDefense,
{
    let image_len = partition.size - cfg.header_size - cfg.trailer_len();
    let flash_ref = engine.flash_mut();
    let view = read_manifest(flash_ref, partition.base, cfg.header_size as usize, image_len, manifest_scratch)?;
    v.verify_image(&view, boot_manifest::tag::ImageType::Application.mask_bit())?;
    Ok(partition.base + cfg.header_size)
}

/// Runs the boot decision table and hands off to the selected partition.
/// Only returns on failure, once every option is exhausted; the caller
/// is expected to invoke [`panic_loop`] on `Err`.
#[allow(clippy::too_many_arguments)]
pub fn select_and_boot<F, H, V, G, T>(
    flash: &mut F,
    cfg: BoardConfig,
    hasher: H,
    verifier: V,
    defense: G,
    keystore: &boot_manifest::Keystore,
    target: &T,
    manifest_scratch: &mut [u8],
) -> Result<core::convert::Infallible, BootError>
where
    F: Flash,
    H: Hasher,
    V: Verify,
    G: GlitchDefense,
    T: BootTarget,
{
    let mut engine = UpdateEngine::new(flash, cfg);
    let mut v = Verifier::new(keystore, hasher, verifier, defense);

    // BOOT left in `TESTING` across a reset means the last candidate
    // handed off to was never confirmed by the running application.
    // Flag it so that, if this same candidate is still unconfirmed on a
    // *later* reset, the anti-rollback check below may be bypassed to
    // swap back to the prior image rather than getting stuck retrying a
    // candidate that never boots cleanly.
    let boot_state = engine.boot_trailer().get_state()?;
    if boot_state == State::Testing {
        engine.boot_trailer().set_fallback_pending()?;
    }

    let update_state = engine.update_trailer().get_state()?;

    #[cfg(feature = "swap")]
    if update_state == State::Updating {
        let already_swapping = !engine.swap_complete().unwrap_or(true);
        if already_swapping {
            engine.swap()?;
        } else {
            let image_len = cfg.update.size - cfg.header_size - cfg.trailer_len();
            let header_size = cfg.header_size as usize;

            let is_key_update = {
                let flash_ref = engine.flash_mut();
                read_manifest(flash_ref, cfg.update.base, header_size, image_len, manifest_scratch)
                    .ok()
                    .and_then(|view| view.get_type())
                    == Some(boot_manifest::tag::ImageType::KeyUpdate as u16)
            };

            if is_key_update {
                let flash_ref = engine.flash_mut();
                let view = read_manifest(flash_ref, cfg.update.base, header_size, image_len, manifest_scratch)?;
                v.verify_image(&view, boot_manifest::tag::ImageType::KeyUpdate.mask_bit())?;
                let payload_len = view.payload().len();
                drop(view);
                engine.apply_key_update(&manifest_scratch[header_size..header_size + payload_len])?;
                engine.update_trailer().erase_trailer_region(cfg.sector_size)?;
            } else {
                // `read_version_redundant` reads the raw VERSION field
                // before the candidate has been parsed or authenticated
                // at all, so the rollback check can reject a bad
                // candidate before spending a verification pass on it.
                // This target places VERSION as the manifest's first TLV
                // record, whose value starts right after the 8-byte
                // fixed prefix and its own 4-byte tag+length header.
                const VERSION_VALUE_OFFSET: u32 = 12;
                let current = engine.read_version_redundant(cfg.boot.base, VERSION_VALUE_OFFSET).unwrap_or(0);
                let candidate = engine.read_version_redundant(cfg.update.base, VERSION_VALUE_OFFSET).unwrap_or(0);
                let fallback_pending = engine.boot_trailer().fallback_pending().unwrap_or(false);
                if fallback_pending || engine.check_not_a_downgrade(current, candidate).is_ok() {
                    engine.swap()?;
                }
            }
        }
    }
    #[cfg(not(feature = "swap"))]
    let _ = update_state;

    let entry_addr = match try_boot_partition(&mut engine, cfg, cfg.boot, &mut v, manifest_scratch) {
        Ok(addr) => addr,
        Err(_boot_failure) => try_boot_partition(&mut engine, cfg, cfg.update, &mut v, manifest_scratch)?,
    };
    target.jump(entry_addr)
}
