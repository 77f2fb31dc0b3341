//! The packed 16-bit tag encoding.
//!
//! Every record in a group's stream opens with one little-endian u16 packing
//! three fields: name length in bits `[15:8]`, index count in bits `[7:6]`,
//! and a value-size code in bits `[5:0]`. Codes 0–61 are the literal byte
//! length of a scalar value; 62 and 63 are escapes announcing that a
//! [`BlockInfo`] header and an opaque block follow instead. A raw tag of
//! zero terminates the group.
//!
//! The decode is a pure mask/shift function into an explicit value struct —
//! never an overlapping in-memory bitfield layout, which would drag in
//! platform bit-ordering.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Write};

/// Terminates a group's stream. Not an error.
pub const TAG_NULL: u16 = 0;
/// On-disk size of one packed tag.
pub const TAG_SIZE: u64 = 2;

const NAMELEN_SHIFT: u16 = 8;
const NAMELEN_MASK: u16 = 0xff;
const NINDEX_SHIFT: u16 = 6;
const NINDEX_MASK: u16 = 0x3;
const VALSIZE_MASK: u16 = 0x3f;

/// Value-size escape: a compressed block follows. The block is still skipped
/// opaquely; compression never matters to this tool.
pub const VALSIZE_BLOCK_COMPRESSED: u8 = 0x3e;
/// Value-size escape: an uncompressed block follows.
pub const VALSIZE_BLOCK: u8 = 0x3f;

/// A record carries at most this many u32 indices.
pub const MAX_INDICES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagHeader {
    pub name_len: u8,
    pub index_count: u8,
    /// Literal scalar length (0–61) or one of the block escapes (62/63).
    pub value_size: u8,
}

impl TagHeader {
    /// Unpack a raw tag. Total over all 16-bit values; the three masks cover
    /// the word exactly and never overlap.
    pub fn decode(raw: u16) -> Self {
        Self {
            name_len: ((raw >> NAMELEN_SHIFT) & NAMELEN_MASK) as u8,
            index_count: ((raw >> NINDEX_SHIFT) & NINDEX_MASK) as u8,
            value_size: (raw & VALSIZE_MASK) as u8,
        }
    }

    /// Inverse of [`TagHeader::decode`].
    pub fn encode(&self) -> u16 {
        ((self.name_len as u16 & NAMELEN_MASK) << NAMELEN_SHIFT)
            | ((self.index_count as u16 & NINDEX_MASK) << NINDEX_SHIFT)
            | (self.value_size as u16 & VALSIZE_MASK)
    }

    pub fn is_block(&self) -> bool {
        self.value_size == VALSIZE_BLOCK || self.value_size == VALSIZE_BLOCK_COMPRESSED
    }
}

/// On-disk size of a block header: two u64 fields plus the u16 pad.
pub const BLOCK_INFO_SIZE: u64 = 18;

/// The fixed header that follows a tag whose value-size code is a block
/// escape. The pad does not fit the natural alignment of the two u64s, so
/// it is read as a separate field rather than as part of one packed struct —
/// that is how the format stores it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockInfo {
    /// Bytes of block payload on disk.
    pub size: u64,
    /// Bytes the payload expands to in guest memory. Diagnostic only.
    pub mem_size: u64,
    /// Trailing padding bytes after the payload.
    pub pad: u16,
}

impl BlockInfo {
    /// Total opaque bytes to skip after this header. Saturates on a corrupt
    /// size so the skip lands at a position whose next read fails cleanly.
    pub fn skip_len(&self) -> u64 {
        self.size.saturating_add(self.pad as u64)
    }

    pub fn read<R: Read>(mut reader: R) -> io::Result<Self> {
        let size = reader.read_u64::<LittleEndian>()?;
        let mem_size = reader.read_u64::<LittleEndian>()?;
        let pad = reader.read_u16::<LittleEndian>()?;
        Ok(Self {
            size,
            mem_size,
            pad,
        })
    }

    pub fn write<W: Write>(&self, mut writer: W) -> io::Result<()> {
        writer.write_u64::<LittleEndian>(self.size)?;
        writer.write_u64::<LittleEndian>(self.mem_size)?;
        writer.write_u16::<LittleEndian>(self.pad)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn decode_known_value() {
        // name "pendingNMI" (10), one index, one value byte
        let tag = TagHeader::decode(0x0a41);
        assert_eq!(tag.name_len, 10);
        assert_eq!(tag.index_count, 1);
        assert_eq!(tag.value_size, 1);
        assert!(!tag.is_block());
    }

    #[test]
    fn block_escapes_are_recognized() {
        for code in [VALSIZE_BLOCK, VALSIZE_BLOCK_COMPRESSED] {
            let tag = TagHeader {
                name_len: 6,
                index_count: 0,
                value_size: code,
            };
            assert!(tag.is_block());
            assert!(TagHeader::decode(tag.encode()).is_block());
        }
        assert!(!TagHeader {
            name_len: 6,
            index_count: 0,
            value_size: 61,
        }
        .is_block());
    }

    #[test]
    fn null_tag_decodes_to_all_zero() {
        let tag = TagHeader::decode(TAG_NULL);
        assert_eq!(tag.name_len, 0);
        assert_eq!(tag.index_count, 0);
        assert_eq!(tag.value_size, 0);
    }

    proptest! {
        // The three fields cover the word exactly, so decode is a bijection.
        #[test]
        fn decode_is_lossless(raw in any::<u16>()) {
            prop_assert_eq!(TagHeader::decode(raw).encode(), raw);
        }

        #[test]
        fn encode_roundtrips_valid_fields(
            name_len in 0u8..=255,
            index_count in 0u8..=3,
            value_size in 0u8..=63,
        ) {
            let tag = TagHeader { name_len, index_count, value_size };
            prop_assert_eq!(TagHeader::decode(tag.encode()), tag);
        }

        // Splicing the fields of two raw tags must never bleed across
        // field boundaries.
        #[test]
        fn fields_never_interact(a in any::<u16>(), b in any::<u16>()) {
            let spliced = TagHeader::decode((a & 0xff00) | (b & 0x00ff));
            prop_assert_eq!(spliced.name_len, TagHeader::decode(a).name_len);
            prop_assert_eq!(spliced.index_count, TagHeader::decode(b).index_count);
            prop_assert_eq!(spliced.value_size, TagHeader::decode(b).value_size);
        }
    }
}
