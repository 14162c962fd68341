//! Manifest wire format: a fixed magic and payload length, followed by a
//! TLV field list, prepended to every firmware payload.
//!
//! Mirrors the header-parsing discipline of `cosign2::Header::parse` (one
//! pass over the bytes, required fields checked before anything is
//! trusted) generalized from a fixed-offset struct to a TLV list.

use crate::tag::{self, HashAlg};

/// Manifest magic number, `"WOLF"` little-endian.
pub const MAGIC: u32 = 0x574F_4C46;

/// Bytes occupied by the magic and payload-length fields before the TLV
/// list starts.
pub const FIXED_PREFIX: usize = 8;

/// Overhead of a single TLV record's tag+length header.
const TLV_HEADER: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Buffer shorter than `FIXED_PREFIX`.
    Truncated,
    /// Magic number did not match.
    BadMagic,
    /// `payload_length` does not fit in the remaining buffer.
    PayloadOverrun,
    /// A TLV record's length field runs past `header_size`.
    TlvOverrun,
    /// The same tag appeared twice.
    DuplicateTag { tag: u16 },
    /// SHA, PUBKEY_HINT or SIGNATURE was missing.
    MissingRequiredTag,
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Truncated => write!(f, "manifest buffer shorter than the fixed prefix"),
            Self::BadMagic => write!(f, "manifest magic mismatch"),
            Self::PayloadOverrun => write!(f, "payload_length does not fit the partition"),
            Self::TlvOverrun => write!(f, "TLV record runs past header_size"),
            Self::DuplicateTag { tag } => write!(f, "duplicate TLV tag 0x{tag:04x}"),
            Self::MissingRequiredTag => write!(f, "manifest missing SHA, PUBKEY_HINT or SIGNATURE"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Field {
    offset: u16,
    len: u16,
}

impl Field {
    fn slice<'a>(&self, header: &'a [u8]) -> &'a [u8] {
        &header[self.offset as usize..self.offset as usize + self.len as usize]
    }
}

/// A parsed, validated view over a manifest + payload byte range.
///
/// Borrows the backing bytes; never copies the payload.
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestView<'a> {
    header: &'a [u8],
    payload: &'a [u8],
    version: Option<Field>,
    timestamp: Option<Field>,
    hash_alg: Option<HashAlg>,
    sha: Option<Field>,
    img_type: Option<Field>,
    pubkey_hint: Option<Field>,
    signature: Option<Field>,
    /// Offset where the SIGNATURE TLV record *starts* (tag byte, not
    /// value) -- the hashed prefix ends here.
    signature_record_start: Option<u16>,
    secondary_signature: Option<Field>,
    delta_base: Option<Field>,
    delta_size: Option<Field>,
    delta_inverse_base: Option<Field>,
    delta_inverse_size: Option<Field>,
    policy: Option<Field>,
    custom: Option<Field>,
}

impl<'a> ManifestView<'a> {
    /// Parses and structurally validates a manifest occupying
    /// `data[..header_size]`, with `payload_length` (read from the
    /// manifest itself) immediately following.
    ///
    /// Never panics: every byte string of length >= `header_size`
    /// produces either `Ok` or an `Error`, never a panic (spec property
    /// "manifest parser totality").
    pub fn open(data: &'a [u8], header_size: usize) -> Result<Self, Error> {
        if data.len() < FIXED_PREFIX || data.len() < header_size {
            return Err(Error::Truncated);
        }
        let magic = u32::from_le_bytes(data[0..4].try_into().unwrap());
        if magic != MAGIC {
            return Err(Error::BadMagic);
        }
        let payload_length = u32::from_le_bytes(data[4..8].try_into().unwrap()) as usize;
        if data.len() < header_size + payload_length {
            return Err(Error::PayloadOverrun);
        }

        let header = &data[..header_size];
        let mut view = ManifestView {
            header,
            payload: &data[header_size..header_size + payload_length],
            version: None,
            timestamp: None,
            hash_alg: None,
            sha: None,
            img_type: None,
            pubkey_hint: None,
            signature: None,
            signature_record_start: None,
            secondary_signature: None,
            delta_base: None,
            delta_size: None,
            delta_inverse_base: None,
            delta_inverse_size: None,
            policy: None,
            custom: None,
        };

        let mut offset = FIXED_PREFIX;
        loop {
            if offset >= header_size {
                break;
            }
            if offset + TLV_HEADER > header_size {
                return Err(Error::TlvOverrun);
            }
            let tag = u16::from_le_bytes(header[offset..offset + 2].try_into().unwrap());
            let len = u16::from_le_bytes(header[offset + 2..offset + 4].try_into().unwrap());
            if tag == tag::END {
                break;
            }
            let value_start = offset + TLV_HEADER;
            let value_end = value_start + len as usize;
            if value_end > header_size {
                return Err(Error::TlvOverrun);
            }
            let field = Field {
                offset: value_start as u16,
                len,
            };

            macro_rules! set_once {
                ($slot:expr) => {{
                    if $slot.is_some() {
                        return Err(Error::DuplicateTag { tag });
                    }
                    $slot = Some(field);
                }};
            }

            if let Some(alg) = HashAlg::from_tag(tag) {
                if view.sha.is_some() {
                    return Err(Error::DuplicateTag { tag });
                }
                view.hash_alg = Some(alg);
                view.sha = Some(field);
            } else {
                match tag {
                    tag::VERSION => set_once!(view.version),
                    tag::TIMESTAMP => set_once!(view.timestamp),
                    tag::IMG_TYPE => set_once!(view.img_type),
                    tag::PUBKEY_HINT => set_once!(view.pubkey_hint),
                    tag::SIGNATURE => {
                        if view.signature.is_some() {
                            return Err(Error::DuplicateTag { tag });
                        }
                        view.signature_record_start = Some(offset as u16);
                        view.signature = Some(field);
                    }
                    tag::SECONDARY_SIGNATURE => set_once!(view.secondary_signature),
                    tag::DELTA_BASE => set_once!(view.delta_base),
                    tag::DELTA_SIZE => set_once!(view.delta_size),
                    tag::DELTA_INVERSE_BASE => set_once!(view.delta_inverse_base),
                    tag::DELTA_INVERSE_SIZE => set_once!(view.delta_inverse_size),
                    tag::POLICY => set_once!(view.policy),
                    tag::CUSTOM => set_once!(view.custom),
                    // Unknown tags are skipped, per spec.
                    _ => {}
                }
            }

            offset = value_end;
        }

        if view.sha.is_none() || view.pubkey_hint.is_none() || view.signature.is_none() {
            return Err(Error::MissingRequiredTag);
        }

        Ok(view)
    }

    pub fn get_version(&self) -> Option<u32> {
        self.version
            .map(|f| u32::from_le_bytes(f.slice(self.header).try_into().unwrap()))
    }

    pub fn get_timestamp(&self) -> Option<u64> {
        self.timestamp
            .map(|f| u64::from_le_bytes(f.slice(self.header).try_into().unwrap()))
    }

    pub fn get_type(&self) -> Option<u16> {
        self.img_type
            .map(|f| u16::from_le_bytes(f.slice(self.header).try_into().unwrap()))
    }

    pub fn hash_alg(&self) -> HashAlg {
        self.hash_alg.expect("validated: SHA field is required")
    }

    pub fn get_sha(&self) -> &[u8] {
        self.sha.expect("validated: SHA field is required").slice(self.header)
    }

    pub fn get_signature(&self) -> &[u8] {
        self.signature
            .expect("validated: SIGNATURE field is required")
            .slice(self.header)
    }

    pub fn get_secondary_signature(&self) -> Option<&[u8]> {
        self.secondary_signature.map(|f| f.slice(self.header))
    }

    pub fn get_pubkey_hint(&self) -> &[u8] {
        self.pubkey_hint
            .expect("validated: PUBKEY_HINT field is required")
            .slice(self.header)
    }

    /// Looks up an optional tag not otherwise exposed by a named accessor
    /// (`POLICY`, `CUSTOM`, the `DELTA_*` descriptors).
    pub fn find_field(&self, tag: u16) -> Option<&[u8]> {
        let field = match tag {
            tag::DELTA_BASE => self.delta_base,
            tag::DELTA_SIZE => self.delta_size,
            tag::DELTA_INVERSE_BASE => self.delta_inverse_base,
            tag::DELTA_INVERSE_SIZE => self.delta_inverse_size,
            tag::POLICY => self.policy,
            tag::CUSTOM => self.custom,
            _ => None,
        }?;
        Some(field.slice(self.header))
    }

    /// Header bytes that are covered by the signature: everything up to
    /// (not including) the SIGNATURE TLV record.
    pub fn hashed_header_prefix(&self) -> &[u8] {
        let end = self
            .signature_record_start
            .expect("validated: SIGNATURE field is required") as usize;
        &self.header[..end]
    }

    pub fn payload(&self) -> &[u8] {
        self.payload
    }
}
