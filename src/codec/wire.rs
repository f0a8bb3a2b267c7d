//! Byte layout for structure bits
//!
//! ```text
//! offset  size  field
//! 0       4     magic "NTSB"
//! 4       1     format version
//! 5       3     reserved (zero)
//! 8       8     bit length, u64 little-endian
//! 16      ..    bits packed LSB-first, ceil(len / 8) bytes
//! ```
//!
//! Payload bytes are never part of this layout; callers ship payloads in
//! whatever format they like, in the same order as the encoding's array.

use super::StructureBits;
use crate::{Result, TreeError};
use bitvec::prelude::*;

/// Leading bytes of every structure buffer
pub const MAGIC: [u8; 4] = *b"NTSB";

/// Format version written and accepted by this build
pub const FORMAT_VERSION: u8 = 1;

/// Bytes before the packed bits
pub const HEADER_LEN: usize = 16;

/// Serialize structure bits with header
pub fn write_structure(bits: &BitSlice<u8, Lsb0>) -> Vec<u8> {
    let mut packed: StructureBits = bits.iter().by_vals().collect();
    packed.set_uninitialized(false);

    let mut out = Vec::with_capacity(HEADER_LEN + packed.as_raw_slice().len());
    out.extend_from_slice(&MAGIC);
    out.push(FORMAT_VERSION);
    out.extend_from_slice(&[0; 3]);
    out.extend_from_slice(&(bits.len() as u64).to_le_bytes());
    out.extend_from_slice(packed.as_raw_slice());
    out
}

/// Parse a buffer produced by [`write_structure`]
///
/// Only the header is checked here; bracket balance is checked on decode.
pub fn read_structure(bytes: &[u8]) -> Result<StructureBits> {
    if bytes.len() < HEADER_LEN {
        return Err(TreeError::TruncatedWire {
            needed: HEADER_LEN,
            got: bytes.len(),
        });
    }
    if bytes[..4] != MAGIC {
        return Err(TreeError::BadMagic);
    }
    if bytes[4] != FORMAT_VERSION {
        return Err(TreeError::UnsupportedVersion {
            found: bytes[4],
            supported: FORMAT_VERSION,
        });
    }

    let mut len_bytes = [0u8; 8];
    len_bytes.copy_from_slice(&bytes[8..HEADER_LEN]);
    let bit_len = u64::from_le_bytes(len_bytes);

    let needed = usize::try_from(bit_len)
        .ok()
        .and_then(|bits| bits.checked_add(7))
        .and_then(|bits| (bits / 8).checked_add(HEADER_LEN))
        .unwrap_or(usize::MAX);
    if bytes.len() < needed {
        return Err(TreeError::TruncatedWire {
            needed,
            got: bytes.len(),
        });
    }

    let mut bits = StructureBits::from_slice(&bytes[HEADER_LEN..needed]);
    bits.truncate(bit_len as usize);
    Ok(bits)
}
