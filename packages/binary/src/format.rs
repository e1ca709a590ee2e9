//! Constants and the fixed-size header of the `.kirb` container.

use serde::{Deserialize, Serialize};
use std::fmt;

pub const MAGIC: [u8; 4] = *b"KIRB";
pub const VERSION_MAJOR: u8 = 1;
/// Newest minor this crate reads and writes.
pub const VERSION_MINOR: u8 = 2;

/// Minor that added line height, letter spacing, filters and shadows.
pub const MINOR_TYPOGRAPHY_EFFECTS: u8 = 1;
/// Minor that added the layout aspect ratio.
pub const MINOR_ASPECT_RATIO: u8 = 2;

pub const HEADER_SIZE: usize = 12;
pub const TRAILER_SIZE: usize = 4;
/// Smallest file that can hold a header and a checksum.
pub const MIN_FILE_SIZE: usize = HEADER_SIZE + TRAILER_SIZE;

pub const ENDIAN_MARKER: u32 = 0x1234_5678;
pub(crate) const MARKER_OFFSET: usize = 8;

pub const FLAG_MANIFEST: u8 = 0b0000_0001;
pub const KNOWN_FLAGS: u8 = FLAG_MANIFEST;

/// Smallest encoded component: id, type, three flags, child count, two absent strings.
pub(crate) const MIN_COMPONENT_SIZE: usize = 4 + 1 + 3 + 4 + 4 + 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ByteOrder {
    #[default]
    Little,
    Big,
}

impl ByteOrder {
    pub fn marker_bytes(self) -> [u8; 4] {
        match self {
            ByteOrder::Little => ENDIAN_MARKER.to_le_bytes(),
            ByteOrder::Big => ENDIAN_MARKER.to_be_bytes(),
        }
    }

    pub fn from_marker(raw: [u8; 4]) -> Option<Self> {
        if raw == ENDIAN_MARKER.to_le_bytes() {
            Some(ByteOrder::Little)
        } else if raw == ENDIAN_MARKER.to_be_bytes() {
            Some(ByteOrder::Big)
        } else {
            None
        }
    }

    pub fn u32_from(self, raw: [u8; 4]) -> u32 {
        match self {
            ByteOrder::Little => u32::from_le_bytes(raw),
            ByteOrder::Big => u32::from_be_bytes(raw),
        }
    }
}

impl fmt::Display for ByteOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ByteOrder::Little => "little-endian",
            ByteOrder::Big => "big-endian",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Header {
    pub major: u8,
    pub minor: u8,
    pub flags: u8,
    pub reserved: u8,
    pub byte_order: ByteOrder,
}

impl Header {
    pub fn new(minor: u8, byte_order: ByteOrder, has_manifest: bool) -> Self {
        Self {
            major: VERSION_MAJOR,
            minor,
            flags: if has_manifest { FLAG_MANIFEST } else { 0 },
            reserved: 0,
            byte_order,
        }
    }

    pub fn has_manifest(&self) -> bool {
        self.flags & FLAG_MANIFEST != 0
    }

    pub fn unknown_flags(&self) -> u8 {
        self.flags & !KNOWN_FLAGS
    }

    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut out = [0u8; HEADER_SIZE];
        out[..4].copy_from_slice(&MAGIC);
        out[4] = self.major;
        out[5] = self.minor;
        out[6] = self.flags;
        out[7] = self.reserved;
        out[MARKER_OFFSET..].copy_from_slice(&self.byte_order.marker_bytes());
        out
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "KIRB v{}.{} ({}, flags {:#04x})",
            self.major, self.minor, self.byte_order, self.flags
        )
    }
}

/// CRC-32 (IEEE) over `bytes`.
pub fn checksum(bytes: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(bytes);
    hasher.finalize()
}

/// Split a file into its checksummed body and the stored checksum, read in `order`.
pub(crate) fn split_trailer(bytes: &[u8], order: ByteOrder) -> (&[u8], u32) {
    let (body, trailer) = bytes.split_at(bytes.len() - TRAILER_SIZE);
    let mut raw = [0u8; TRAILER_SIZE];
    raw.copy_from_slice(trailer);
    (body, order.u32_from(raw))
}
