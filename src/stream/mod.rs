//! Forward-only walker over one group's tag stream.
//!
//! # Walk
//! [`TagStream::new`] seeks to the group's declared offset, then
//! [`TagStream::next_record`] decodes tag → name → indices → payload until
//! the zero terminator. The terminator is the sole authority on where the
//! group ends; `group.size` is never consulted and there is no iteration
//! cap, matching the format's self-terminating design.
//!
//! # Payloads
//! Block payloads (value-size code 62/63) are skipped as one opaque unit of
//! `size + pad` bytes the moment the record is decoded — their contents are
//! never interpreted, compressed or not. Scalar payloads are *not* read:
//! the yielded record carries their length and start offset, and the stream
//! skips them on the next `next_record()` unless the consumer claimed the
//! bytes with [`TagStream::read_value`] first.
//!
//! # Patching
//! [`TagStream::overwrite_last_byte`] is the one backward motion in the
//! whole pipeline: a scoped seek-back-one-byte-and-write that leaves the
//! cursor exactly where the walk expects it, so the loop continues
//! unaffected.
//!
//! # Failure
//! Any short read is immediately fatal with the step-specific truncation
//! error. A misaligned stream cannot be resynchronized, so none of this is
//! ever retried.

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{Read, Seek, SeekFrom, Write};

use crate::error::VmssError;
use crate::group::GroupDescriptor;
use crate::tag::{BlockInfo, TagHeader, MAX_INDICES, TAG_NULL};

/// One decoded entry, valid for one iteration of the walk.
#[derive(Debug, Clone)]
pub struct TagRecord {
    pub tag: TagHeader,
    pub name: String,
    /// Always three slots; slots beyond `tag.index_count` stay zero.
    /// `indices[0]` is the CPU index for per-CPU fields.
    pub indices: [u32; MAX_INDICES],
    pub payload: TagPayload,
}

#[derive(Debug, Clone)]
pub enum TagPayload {
    /// Scalar value of `len` bytes starting at `offset`, not yet read.
    Scalar { len: u8, offset: u64 },
    /// Opaque block, already skipped.
    Block(BlockInfo),
}

pub struct TagStream<R> {
    reader: R,
    /// Absolute cursor position, tracked by arithmetic: every read and skip
    /// advances it by the exact byte count the format prescribes.
    pos: u64,
    /// Unclaimed scalar bytes from the last yielded record.
    pending: u64,
    done: bool,
}

impl<R: Read + Seek> TagStream<R> {
    pub fn new(mut reader: R, group: &GroupDescriptor) -> Result<Self, VmssError> {
        reader
            .seek(SeekFrom::Start(group.offset))
            .map_err(|source| VmssError::SeekFailure {
                offset: group.offset,
                source,
            })?;
        Ok(Self {
            reader,
            pos: group.offset,
            pending: 0,
            done: false,
        })
    }

    /// Absolute position of the cursor.
    pub fn position(&self) -> u64 {
        self.pos
    }

    /// Give the underlying reader back.
    pub fn into_inner(self) -> R {
        self.reader
    }

    /// Decode the next record, or `None` once the terminator is reached.
    /// A scalar value left unclaimed by the previous record is skipped
    /// first.
    pub fn next_record(&mut self) -> Result<Option<TagRecord>, VmssError> {
        if self.done {
            return Ok(None);
        }
        if self.pending > 0 {
            let skip = self.pending;
            self.pending = 0;
            self.seek_to(self.pos + skip)?;
        }

        let at = self.pos;
        let raw = self
            .reader
            .read_u16::<LittleEndian>()
            .map_err(|source| VmssError::TruncatedTag { offset: at, source })?;
        self.pos += 2;

        if raw == TAG_NULL {
            self.done = true;
            return Ok(None);
        }
        let tag = TagHeader::decode(raw);

        // Name bytes carry no terminator on disk.
        let at = self.pos;
        let mut name_buf = vec![0u8; tag.name_len as usize];
        self.reader
            .read_exact(&mut name_buf)
            .map_err(|source| VmssError::TruncatedName { offset: at, source })?;
        self.pos += tag.name_len as u64;
        let name = String::from_utf8_lossy(&name_buf).into_owned();

        let at = self.pos;
        let mut indices = [0u32; MAX_INDICES];
        for slot in indices.iter_mut().take(tag.index_count as usize) {
            *slot = self
                .reader
                .read_u32::<LittleEndian>()
                .map_err(|source| VmssError::TruncatedIndices { offset: at, source })?;
        }
        self.pos += tag.index_count as u64 * 4;

        let payload = if tag.is_block() {
            let at = self.pos;
            let info = BlockInfo::read(&mut self.reader).map_err(|source| {
                VmssError::TruncatedBlockHeader { offset: at, source }
            })?;
            self.pos += crate::tag::BLOCK_INFO_SIZE;
            self.seek_to(self.pos.saturating_add(info.skip_len()))?;
            TagPayload::Block(info)
        } else {
            self.pending = tag.value_size as u64;
            TagPayload::Scalar {
                len: tag.value_size,
                offset: self.pos,
            }
        };

        Ok(Some(TagRecord {
            tag,
            name,
            indices,
            payload,
        }))
    }

    /// Claim and read the scalar value of the most recently yielded record.
    pub fn read_value(&mut self) -> Result<Vec<u8>, VmssError> {
        let at = self.pos;
        let mut buf = vec![0u8; self.pending as usize];
        self.reader
            .read_exact(&mut buf)
            .map_err(|source| VmssError::TruncatedValue { offset: at, source })?;
        self.pos += self.pending;
        self.pending = 0;
        Ok(buf)
    }

    fn seek_to(&mut self, offset: u64) -> Result<(), VmssError> {
        self.reader
            .seek(SeekFrom::Start(offset))
            .map_err(|source| VmssError::SeekFailure { offset, source })?;
        self.pos = offset;
        Ok(())
    }
}

impl<R: Read + Write + Seek> TagStream<R> {
    /// Overwrite the byte just read: seek back exactly one, write the
    /// replacement, leave the cursor where the walk expects it. Never
    /// interleaved with other reads.
    pub fn overwrite_last_byte(&mut self, value: u8) -> Result<(), VmssError> {
        let target = self.pos - 1;
        self.reader
            .seek(SeekFrom::Start(target))
            .map_err(|source| VmssError::SeekFailure {
                offset: target,
                source,
            })?;
        self.reader
            .write_all(&[value])
            .map_err(|source| VmssError::WriteFailure {
                offset: target,
                source,
            })?;
        Ok(())
    }
}
