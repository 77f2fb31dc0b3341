use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::borrow::Cow;
use std::io::{self, Read, Write};

use crate::error::VmssError;

pub const GROUP_NAME_LEN: usize = 64;
/// On-disk size: 64-byte name plus two u64 fields.
pub const GROUP_DESC_SIZE: u64 = 80;
/// Upper bound on the descriptor table. The count comes straight from the
/// file, so it is capped before allocation instead of trusted; real
/// snapshots hold a few dozen groups.
pub const MAX_GROUPS: u32 = 4096;
/// The group holding per-CPU state, the only one this tool interprets.
pub const CPU_GROUP: &str = "cpu";

/// One entry of the group table, read-only after load.
#[derive(Debug, Clone)]
pub struct GroupDescriptor {
    pub name: [u8; GROUP_NAME_LEN],
    pub offset: u64,
    pub size: u64,
}

impl GroupDescriptor {
    pub fn new(name: &str, offset: u64, size: u64) -> Self {
        debug_assert!(name.len() < GROUP_NAME_LEN);
        let mut padded = [0u8; GROUP_NAME_LEN];
        let len = name.len().min(GROUP_NAME_LEN - 1);
        padded[..len].copy_from_slice(&name.as_bytes()[..len]);
        Self {
            name: padded,
            offset,
            size,
        }
    }

    pub fn read<R: Read>(mut reader: R) -> io::Result<Self> {
        let mut name = [0u8; GROUP_NAME_LEN];
        reader.read_exact(&mut name)?;
        let offset = reader.read_u64::<LittleEndian>()?;
        let size = reader.read_u64::<LittleEndian>()?;
        Ok(Self { name, offset, size })
    }

    pub fn write<W: Write>(&self, mut writer: W) -> io::Result<()> {
        writer.write_all(&self.name)?;
        writer.write_u64::<LittleEndian>(self.offset)?;
        writer.write_u64::<LittleEndian>(self.size)?;
        Ok(())
    }

    /// The name up to its first NUL.
    pub fn name_str(&self) -> Cow<'_, str> {
        let end = self
            .name
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(GROUP_NAME_LEN);
        String::from_utf8_lossy(&self.name[..end])
    }
}

/// Read exactly `count` descriptors immediately following the header.
/// Order is preserved; names are not required to be unique.
pub fn read_group_table<R: Read>(
    mut reader: R,
    count: u32,
) -> Result<Vec<GroupDescriptor>, VmssError> {
    if count > MAX_GROUPS {
        return Err(VmssError::ImplausibleGroupCount {
            count,
            limit: MAX_GROUPS,
        });
    }
    let mut groups = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let group = GroupDescriptor::read(&mut reader)
            .map_err(|source| VmssError::TruncatedGroupTable { count, source })?;
        groups.push(group);
    }
    Ok(groups)
}
