use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Write};

use crate::error::VmssError;

/// 32-bit era snapshot: recognized only to be explicitly rejected.
pub const MAGIC_LEGACY: u32 = 0xbed0_bed0;
/// Snapshot restored from a previous suspend.
pub const MAGIC_RESTORED: u32 = 0xbed1_bed1;
/// Current-generation snapshot.
pub const MAGIC: u32 = 0xbed2_bed2;
/// Partial snapshot.
pub const MAGIC_PARTIAL: u32 = 0xbed3_bed3;

/// On-disk size: three u32 fields, no padding.
pub const HEADER_SIZE: u64 = 12;

#[derive(Debug, Clone, Copy)]
pub struct ContainerHeader {
    pub id: u32,
    pub version: u32,
    pub group_count: u32,
}

impl ContainerHeader {
    /// Read and validate the fixed header at the current position.
    ///
    /// The version is accepted as-is and only surfaced for diagnostics; the
    /// magic is the sole gate.
    pub fn read<R: Read>(mut reader: R) -> Result<Self, VmssError> {
        let id = reader
            .read_u32::<LittleEndian>()
            .map_err(VmssError::TruncatedHeader)?;
        let version = reader
            .read_u32::<LittleEndian>()
            .map_err(VmssError::TruncatedHeader)?;
        let group_count = reader
            .read_u32::<LittleEndian>()
            .map_err(VmssError::TruncatedHeader)?;

        match id {
            MAGIC_LEGACY => Err(VmssError::UnsupportedLegacyFormat),
            MAGIC | MAGIC_RESTORED | MAGIC_PARTIAL => Ok(Self {
                id,
                version,
                group_count,
            }),
            other => Err(VmssError::UnrecognizedFormat { magic: other }),
        }
    }

    pub fn write<W: Write>(&self, mut writer: W) -> io::Result<()> {
        writer.write_u32::<LittleEndian>(self.id)?;
        writer.write_u32::<LittleEndian>(self.version)?;
        writer.write_u32::<LittleEndian>(self.group_count)?;
        Ok(())
    }
}
